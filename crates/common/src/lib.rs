//! Shared vocabulary, error helpers, and localization used across all vigil crates.

pub mod error;
pub mod i18n;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    i18n::Localizer,
    types::{JobType, Language},
};
