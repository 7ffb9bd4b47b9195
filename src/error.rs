//! Muninn error types

/// Muninn error types.
///
/// Errors are `Clone`: a single failed fetch is shared by every observer of
/// the entry that issued it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MuninnError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("resource not found: {0}")]
    NotFound(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The task driving a fetch panicked or was cancelled by the runtime.
    #[error("fetch aborted: {0}")]
    Aborted(String),
}

impl MuninnError {
    /// Whether this error came from the transport collaborator (as opposed
    /// to local configuration or runtime failures).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            MuninnError::Http(_)
                | MuninnError::Api { .. }
                | MuninnError::NotFound(_)
                | MuninnError::Json(_)
        )
    }

    /// HTTP status code, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            MuninnError::Api { status, .. } => Some(*status),
            MuninnError::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MuninnError {
    fn from(err: serde_json::Error) -> Self {
        MuninnError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for MuninnError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MuninnError::Json(err.to_string())
        } else {
            MuninnError::Http(err.to_string())
        }
    }
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
