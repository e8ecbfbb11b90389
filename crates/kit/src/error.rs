use vigil_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Script or post metadata could not be produced.
    #[error("failed to generate text assets: {source}")]
    Asset {
        #[source]
        source: vigil_generation::Error,
    },

    /// Audio or image could not be produced.
    #[error("failed to generate media assets: {source}")]
    Media {
        #[source]
        source: vigil_generation::Error,
    },

    #[error(transparent)]
    Gateway(#[from] vigil_generation::Error),

    #[error("history item not found: {id}")]
    NotFound { id: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn asset(source: vigil_generation::Error) -> Self {
        Self::Asset { source }
    }

    #[must_use]
    pub fn media(source: vigil_generation::Error) -> Self {
        Self::Media { source }
    }

    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
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
