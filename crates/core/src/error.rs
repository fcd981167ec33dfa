/// Result alias that carries the custom [`SlotDeckError`] type.
pub type Result<T> = std::result::Result<T, SlotDeckError>;

/// Common error type for the core crate.
///
/// Only the edges of the crate (scene loaders, settings parsing, FFT work)
/// produce these. The per-frame orchestration API reports rejections as plain
/// `bool`/`Option` values instead.
#[derive(Debug, thiserror::Error)]
pub enum SlotDeckError {
    /// Free-form message, mostly produced by scene factories.
    #[error("{0}")]
    Message(String),
    /// A caller handed in data the operation cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// No loader is registered under the requested scene name.
    #[error("unknown scene `{0}`")]
    UnknownScene(String),
    /// A registered loader or factory failed to produce the scene.
    #[error("failed to load scene `{name}`: {reason}")]
    SceneLoad { name: String, reason: String },
    /// A settings snapshot failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Settings payload could not be parsed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl SlotDeckError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn scene_load(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::SceneLoad {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<&str> for SlotDeckError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SlotDeckError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
