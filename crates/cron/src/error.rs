use {
    thiserror::Error,
    vigil_common::{FromMessage, JobType},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("cadence for the {track} track must be between 1 and {max}, got {cadence}")]
    InvalidCadence { track: JobType, cadence: u8, max: u8 },

    #[error("unknown timezone: {timezone}")]
    UnknownTimezone { timezone: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_cadence(track: JobType, cadence: u8, max: u8) -> Self {
        Self::InvalidCadence {
            track,
            cadence,
            max,
        }
    }

    #[must_use]
    pub fn unknown_timezone(timezone: impl Into<String>) -> Self {
        Self::UnknownTimezone {
            timezone: timezone.into(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

vigil_common::impl_context!();
