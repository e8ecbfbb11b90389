/// Config schema types (gemini, agent, voices, schedule, storage).
use std::{collections::BTreeMap, path::PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    vigil_common::{JobType, Language},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub gemini: GeminiConfig,
    pub agent: AgentConfig,
    pub voices: VoicesConfig,
    pub schedule: ScheduleTableConfig,
    pub storage: StorageConfig,
}

/// Generative Language API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key. Prefer the `GEMINI_API_KEY` / `API_KEY` environment variables.
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
    /// Model for research, scripts, metadata, and visual prompts.
    pub text_model: String,
    pub speech_model: String,
    pub image_model: String,
    pub video_model: String,
    /// Delay between video operation polls.
    pub video_poll_interval_secs: u64,
    /// Optional cap on video polls. `None` polls until the operation finishes.
    pub video_max_polls: Option<u32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".into(),
            text_model: "gemini-2.5-pro".into(),
            speech_model: "gemini-2.5-flash-preview-tts".into(),
            image_model: "imagen-4.0-generate-001".into(),
            video_model: "veo-3.1-fast-generate-preview".into(),
            video_poll_interval_secs: 5,
            video_max_polls: None,
        }
    }
}

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

impl GeminiConfig {
    /// Resolve the API key from the environment, then from the config file.
    pub fn resolve_api_key(&self) -> anyhow::Result<Secret<String>> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    pub(crate) fn resolve_api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Secret<String>> {
        API_KEY_ENV_VARS
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
            .map(Secret::new)
            .or_else(|| {
                self.api_key
                    .as_ref()
                    .filter(|k| {
                        let k = k.expose_secret();
                        !k.trim().is_empty() && !k.starts_with("${")
                    })
                    .cloned()
            })
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "API key not set: export {} or set gemini.api_key",
                    API_KEY_ENV_VARS.join(" or ")
                )
            })
    }
}

/// Agent behaviour: languages, timing, and status locale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Language whose long-form slots trigger the shared batch and whose
    /// research drives it.
    pub primary_language: Language,
    /// Languages produced by the long batch, in assembly order.
    pub languages: Vec<Language>,
    pub long_duration_minutes: u32,
    /// Grace period before the first slot check after startup.
    pub startup_delay_secs: u64,
    pub slot_check_interval_secs: u64,
    pub status_refresh_interval_secs: u64,
    /// Locale for rendered status text.
    pub locale: Language,
    /// IANA timezone for wall-clock slots. `None` uses the system local time.
    pub timezone: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            primary_language: Language::Pt,
            languages: Language::ALL.to_vec(),
            long_duration_minutes: 10,
            startup_delay_secs: 10,
            slot_check_interval_secs: 30,
            status_refresh_interval_secs: 60,
            locale: Language::En,
            timezone: None,
        }
    }
}

/// A named speaker mapped to a prebuilt voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerVoice {
    pub name: String,
    pub voice: String,
}

/// Voice casting for speech synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoicesConfig {
    /// Two-speaker dialogue cast for long-form scripts. The first entry is the
    /// fallback for lines without a recognised speaker prefix.
    pub long_speakers: Vec<SpeakerVoice>,
    /// Voice for short-form scripts. `None` lets the model pick its default.
    pub short_voice: Option<String>,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            long_speakers: vec![
                SpeakerVoice {
                    name: "Roberta Erickson".into(),
                    voice: "Aoede".into(),
                },
                SpeakerVoice {
                    name: "Milton Dilts".into(),
                    voice: "Enceladus".into(),
                },
            ],
            short_voice: None,
        }
    }
}

/// Daily candidate fire hours for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSchedule {
    /// Candidate hours for the long track, earliest first.
    pub long_hours: Vec<u8>,
    /// Candidate hours for the short track, earliest first.
    pub short_hours: Vec<u8>,
    /// Minute of the hour every slot of this language fires at.
    pub minute_offset: u8,
}

impl LanguageSchedule {
    #[must_use]
    pub fn hours(&self, job_type: JobType) -> &[u8] {
        match job_type {
            JobType::Long => &self.long_hours,
            JobType::Short => &self.short_hours,
        }
    }
}

/// Per-language candidate hour table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleTableConfig(pub BTreeMap<Language, LanguageSchedule>);

impl Default for ScheduleTableConfig {
    fn default() -> Self {
        let entry = |long: [u8; 3], minute_offset| LanguageSchedule {
            long_hours: long.to_vec(),
            short_hours: vec![9, 12, 18],
            minute_offset,
        };
        Self(BTreeMap::from([
            (Language::Pt, entry([6, 12, 18], 0)),
            (Language::En, entry([7, 13, 19], 20)),
            (Language::Es, entry([8, 14, 20], 40)),
        ]))
    }
}

impl ScheduleTableConfig {
    /// Check hour/minute ranges and earliest-first ordering.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (lang, entry) in &self.0 {
            if entry.minute_offset > 59 {
                anyhow::bail!("schedule.{lang}: minute_offset {} > 59", entry.minute_offset);
            }
            for job_type in JobType::ALL {
                let hours = entry.hours(job_type);
                if let Some(h) = hours.iter().find(|h| **h > 23) {
                    anyhow::bail!("schedule.{lang}.{job_type}_hours: hour {h} > 23");
                }
                if hours.windows(2).any(|w| w[0] >= w[1]) {
                    anyhow::bail!(
                        "schedule.{lang}.{job_type}_hours must be strictly ascending: {hours:?}"
                    );
                }
            }
        }
        Ok(())
    }
}

/// Where state, history, and blobs live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory.
    pub data_dir: Option<PathBuf>,
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
