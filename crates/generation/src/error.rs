/// Failures of individual generation calls. Each variant names the stage that
/// failed so callers can decide whether to abort one kit or a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("topic research failed: {message}")]
    Research { message: String },

    #[error("text generation failed: {message}")]
    Generation { message: String },

    #[error("speech synthesis failed: {message}")]
    Speech { message: String },

    #[error("image generation failed: {message}")]
    Image { message: String },

    #[error("video generation failed: {message}")]
    Video { message: String },

    #[error("API error HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid gateway configuration: {message}")]
    Config { message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn research(message: impl ToString) -> Self {
        Self::Research {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn generation(message: impl ToString) -> Self {
        Self::Generation {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn speech(message: impl ToString) -> Self {
        Self::Speech {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn image(message: impl ToString) -> Self {
        Self::Image {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn video(message: impl ToString) -> Self {
        Self::Video {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn config(message: impl ToString) -> Self {
        Self::Config {
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
