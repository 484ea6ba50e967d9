//! Error taxonomy shared by every crate in the workspace.
//!
//! Nothing here is fatal: callers degrade to "no-op + notice". Transport
//! failures (`Network`, `RemoteRejection`) are collapsed into a boolean by
//! the persistence gateway, so `is_transport` exists to make that explicit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// Malformed annotation JSON or out-of-range region coordinates.
    #[error("validation error: {0}")]
    Validation(String),

    /// Manifest without a recognizable version marker or type tag.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Fetch rejected before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// Persistence endpoint answered with a non-2xx status.
    #[error("remote rejected request with status {status}: {body}")]
    RemoteRejection { status: u16, body: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ViewerError {
    /// `true` for the NetworkError / RemoteRejection class.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RemoteRejection { .. })
    }

    /// Short, user-facing text for an alert notice.
    pub fn notice(&self) -> String {
        match self {
            Self::Validation(msg) | Self::InvalidManifest(msg) => msg.clone(),
            Self::Network(_) => "Could not reach the server".to_string(),
            Self::RemoteRejection { status, .. } => format!("Server refused the change ({status})"),
            Self::Json(e) => format!("Malformed JSON: {e}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_class_covers_network_and_rejection() {
        assert!(ViewerError::Network("offline".into()).is_transport());
        assert!(
            ViewerError::RemoteRejection {
                status: 500,
                body: "<error/>".into()
            }
            .is_transport()
        );
        assert!(!ViewerError::Validation("bad".into()).is_transport());
    }

    #[test]
    fn json_errors_convert_with_question_mark() {
        fn parse(s: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(s)?)
        }
        let err = parse("{").unwrap_err();
        assert!(matches!(err, ViewerError::Json(_)));
    }
}
