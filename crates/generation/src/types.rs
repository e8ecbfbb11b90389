use {
    serde::{Deserialize, Serialize},
    vigil_common::{JobType, Language},
    vigil_config::SpeakerVoice,
};

/// Researched subject for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub theme: String,
    /// Chapter subthemes for long-form content; empty for short.
    pub subthemes: Vec<String>,
}

/// Metadata for short-form social platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPost {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// Metadata for a long-form video upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongFormPost {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Chapter list, one title per line.
    #[serde(default)]
    pub timestamps: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Post metadata, shaped by job type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostMetadata {
    Social(SocialPost),
    LongForm(LongFormPost),
}

impl PostMetadata {
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Social(p) => &p.title,
            Self::LongForm(p) => &p.title,
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Social(p) => &p.description,
            Self::LongForm(p) => &p.description,
        }
    }

    /// Split into the two mutually exclusive record fields.
    #[must_use]
    pub fn into_parts(self) -> (Option<SocialPost>, Option<LongFormPost>) {
        match self {
            Self::Social(p) => (Some(p), None),
            Self::LongForm(p) => (None, Some(p)),
        }
    }
}

/// Inputs for [`crate::GenerationGateway::generate_metadata`].
#[derive(Debug, Clone, Copy)]
pub struct MetadataRequest<'a> {
    /// Finished prayer text. Required for short posts, unused for long.
    pub prayer_text: Option<&'a str>,
    pub language: Language,
    pub job_type: JobType,
    pub theme: &'a str,
    pub subthemes: &'a [String],
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
            Self::Square => "1:1",
        }
    }

    /// Thumbnail orientation for a job type.
    #[must_use]
    pub fn for_job(job_type: JobType) -> Self {
        match job_type {
            JobType::Short => Self::Portrait,
            JobType::Long => Self::Landscape,
        }
    }
}

/// Speaker-to-voice casting for one synthesis run.
///
/// Lines prefixed with `"Name:"` use that speaker's voice; everything else
/// falls back to the first speaker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceAssignment {
    pub speakers: Vec<SpeakerVoice>,
}

impl VoiceAssignment {
    #[must_use]
    pub fn new(speakers: Vec<SpeakerVoice>) -> Self {
        Self { speakers }
    }

    /// A single unnamed voice used for every line.
    #[must_use]
    pub fn single(voice: impl Into<String>) -> Self {
        Self {
            speakers: vec![SpeakerVoice {
                name: String::new(),
                voice: voice.into(),
            }],
        }
    }

    #[must_use]
    pub fn fallback_voice(&self) -> Option<&str> {
        self.speakers.first().map(|s| s.voice.as_str())
    }

    /// Voice for a speaker label, ignoring any trailing colon in the cast name.
    #[must_use]
    pub fn voice_for(&self, speaker: &str) -> Option<&str> {
        if speaker.is_empty() {
            return None;
        }
        self.speakers
            .iter()
            .find(|s| s.name.replace(':', "") == speaker)
            .map(|s| s.voice.as_str())
    }
}

/// What a visual prompt is derived from.
#[derive(Debug, Clone, Copy)]
pub enum VisualPromptSource<'a> {
    /// Raw prayer text. The resulting prompt carries no rendered text.
    Prayer { text: &'a str },
    /// A finished post; the title is rendered into the image.
    Post {
        title: &'a str,
        description: &'a str,
        script: &'a str,
        language: Language,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn cast() -> VoiceAssignment {
        VoiceAssignment::new(vec![
            SpeakerVoice {
                name: "Roberta Erickson:".into(),
                voice: "Aoede".into(),
            },
            SpeakerVoice {
                name: "Milton Dilts".into(),
                voice: "Enceladus".into(),
            },
        ])
    }

    #[test]
    fn voice_lookup_strips_colon_from_cast() {
        let cast = cast();
        assert_eq!(cast.voice_for("Roberta Erickson"), Some("Aoede"));
        assert_eq!(cast.voice_for("Milton Dilts"), Some("Enceladus"));
        assert_eq!(cast.voice_for("Narrator"), None);
        assert_eq!(cast.fallback_voice(), Some("Aoede"));
    }

    #[test]
    fn single_voice_never_matches_a_label() {
        let single = VoiceAssignment::single("Kore");
        assert_eq!(single.voice_for(""), None);
        assert_eq!(single.fallback_voice(), Some("Kore"));
    }

    #[test]
    fn aspect_ratio_by_job() {
        assert_eq!(AspectRatio::for_job(JobType::Short).as_str(), "9:16");
        assert_eq!(AspectRatio::for_job(JobType::Long).as_str(), "16:9");
        assert_eq!(
            serde_json::to_string(&AspectRatio::Square).unwrap(),
            "\"1:1\""
        );
    }

    #[test]
    fn metadata_splits_by_kind() {
        let meta = PostMetadata::Social(SocialPost {
            title: "t".into(),
            description: "d".into(),
            hashtags: vec![],
        });
        assert_eq!(meta.title(), "t");
        let (social, long) = meta.into_parts();
        assert!(social.is_some());
        assert!(long.is_none());
    }
}
