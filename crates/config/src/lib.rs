//! Configuration loading, validation, and env substitution.
//!
//! Config files: `vigil.toml`, `vigil.yaml`, or `vigil.json`
//! Searched in `./` then `~/.config/vigil/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, data_dir, discover_and_load, load_config},
    schema::{
        AgentConfig, GeminiConfig, LanguageSchedule, ScheduleTableConfig, SpeakerVoice,
        StorageConfig, VigilConfig, VoicesConfig,
    },
};
