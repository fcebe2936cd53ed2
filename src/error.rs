/// Top-level error type shared across the editor.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Photo fetch or decode failed. Terminal for the editor session.
    #[error("Failed to load photo: {message}")]
    Load { message: String },

    #[error("Failed to encode image: {message}")]
    Encode { message: String },

    #[error("Failed to upload image: {message}")]
    Upload { message: String },

    /// Preview compositor failure (GPU init, readback).
    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Result type alias using EditorError.
pub type EditorResult<T> = Result<T, EditorError>;

impl EditorError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the editor can stay open after this error.
    ///
    /// Load failures end the session; everything else is reported as a
    /// transient notification and the user may retry.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Load { .. })
    }

    /// Collapse any failure that happened while opening a photo into a
    /// load failure, keeping the original message.
    pub fn into_load(self) -> Self {
        match self {
            Self::Load { .. } => self,
            other => Self::load(other.to_string()),
        }
    }

    /// Same as [`into_load`](Self::into_load) for the save path.
    pub fn into_upload(self) -> Self {
        match self {
            Self::Upload { .. } | Self::Encode { .. } => self,
            other => Self::upload(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_failures_are_terminal() {
        assert!(!EditorError::load("decode failed").is_recoverable());
        assert!(EditorError::upload("502").is_recoverable());
        assert!(EditorError::encode("bad buffer").is_recoverable());
    }

    #[test]
    fn io_error_becomes_load_failure() {
        let err: EditorError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        let err = err.into_load();
        assert!(matches!(err, EditorError::Load { .. }));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn encode_failure_survives_upload_mapping() {
        let err = EditorError::encode("zero-sized").into_upload();
        assert!(matches!(err, EditorError::Encode { .. }));
    }
}
