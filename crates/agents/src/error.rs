use vigil_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Topic research failed before any kit was started.
    #[error("topic research failed: {source}")]
    Research {
        #[source]
        source: vigil_generation::Error,
    },

    /// The long batch's shared script, visual prompt, or image failed.
    #[error("shared batch asset failed: {source}")]
    SharedAsset {
        #[source]
        source: vigil_generation::Error,
    },

    #[error(transparent)]
    Kit(#[from] vigil_kit::Error),

    #[error(transparent)]
    Store(#[from] vigil_cron::Error),

    #[error("unknown platform: {name}")]
    UnknownPlatform { name: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn research(source: vigil_generation::Error) -> Self {
        Self::Research { source }
    }

    #[must_use]
    pub fn shared_asset(source: vigil_generation::Error) -> Self {
        Self::SharedAsset { source }
    }

    #[must_use]
    pub fn unknown_platform(name: impl Into<String>) -> Self {
        Self::UnknownPlatform { name: name.into() }
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
