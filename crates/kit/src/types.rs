use {
    bytes::Bytes,
    serde::{Deserialize, Serialize},
    vigil_common::{JobType, Language},
    vigil_generation::{LongFormPost, SocialPost},
};

/// One assembled content kit: text, metadata, and references to its blobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketingHistoryItem {
    pub id: String,
    /// Creation instant, epoch milliseconds.
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub language: Language,
    pub theme: String,
    #[serde(default)]
    pub subthemes: Vec<String>,
    pub prayer_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_post: Option<SocialPost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_post: Option<LongFormPost>,
    pub audio_blob_key: String,
    pub image_blob_key: String,
    #[serde(default)]
    pub is_downloaded: bool,
}

impl MarketingHistoryItem {
    #[must_use]
    pub fn title(&self) -> &str {
        self.social_post
            .as_ref()
            .map(|p| p.title.as_str())
            .or_else(|| self.long_post.as_ref().map(|p| p.title.as_str()))
            .unwrap_or_default()
    }
}

/// Input to [`crate::KitAssembler::assemble_kit`].
#[derive(Debug, Clone)]
pub struct KitRequest {
    pub language: Language,
    pub job_type: JobType,
    pub theme: String,
    pub subthemes: Vec<String>,
    /// Image to attach verbatim instead of generating one.
    pub shared_image: Option<Bytes>,
}

/// `{millis:013}-{lang}-{type}-{8 hex}`. Sorts lexically by creation time.
#[must_use]
pub fn history_id(timestamp_ms: u64, language: Language, job_type: JobType) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{timestamp_ms:013}-{language}-{job_type}-{}", &suffix[..8])
}

#[must_use]
pub fn audio_blob_key(id: &str) -> String {
    format!("history_audio_{id}")
}

#[must_use]
pub fn image_blob_key(id: &str) -> String {
    format!("history_image_{id}")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_sort_by_time() {
        let early = history_id(999, Language::Pt, JobType::Short);
        let late = history_id(1_700_000_000_000, Language::En, JobType::Long);
        assert!(early < late);
        assert!(early.starts_with("0000000000999-pt-short-"));
        assert_eq!(late.len(), "1700000000000-en-long-".len() + 8);
        assert_ne!(
            history_id(1, Language::Es, JobType::Short),
            history_id(1, Language::Es, JobType::Short)
        );
    }

    #[test]
    fn serializes_type_field() {
        let item = MarketingHistoryItem {
            id: "x".into(),
            timestamp: 1,
            job_type: JobType::Short,
            language: Language::Es,
            theme: "paz".into(),
            subthemes: vec![],
            prayer_text: "Amén.".into(),
            social_post: None,
            long_post: None,
            audio_blob_key: audio_blob_key("x"),
            image_blob_key: image_blob_key("x"),
            is_downloaded: false,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "short");
        assert_eq!(json["audioBlobKey"], "history_audio_x");
        assert!(json.get("longPost").is_none());
    }
}
