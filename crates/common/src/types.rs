//! Core vocabulary: content languages and job types.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Content language. Every kit is produced for exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Pt,
    En,
    Es,
}

impl Language {
    pub const ALL: [Language; 3] = [Self::Pt, Self::En, Self::Es];

    /// Lowercase code used in ledger keys, tags, and ids (`pt`).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Pt => "pt",
            Self::En => "en",
            Self::Es => "es",
        }
    }

    /// Uppercase label shown in status text (`PT`).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pt => "PT",
            Self::En => "EN",
            Self::Es => "ES",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pt" => Ok(Self::Pt),
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            other => Err(Error::unknown_language(other)),
        }
    }
}

/// Kind of job, and by extension the scheduler track it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Ten-minute two-speaker guided prayer with long-form video metadata.
    Long,
    /// Short single-voice prayer with social-post metadata.
    Short,
}

impl JobType {
    pub const ALL: [JobType; 2] = [Self::Long, Self::Short];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }

    /// In-flight tag for a job of this type in `language` (`"pt-long"`).
    #[must_use]
    pub fn tag(self, language: Language) -> String {
        format!("{}-{}", language.code(), self.as_str())
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            other => Err(Error::unknown_job_type(other)),
        }
    }
}
