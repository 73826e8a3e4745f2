//! Common types for the apigen pipeline
//!
//! This crate contains the normalized service model graph handed to emitters,
//! the error taxonomy shared by the loader and the transformation pipeline,
//! and request-URI template parsing.

mod model;
mod uri;

pub use model::*;
pub use uri::{RequestUri, UriLabel};

use thiserror::Error;

/// Errors that can occur while loading or transforming a service model
#[derive(Error, Debug)]
pub enum TransformError {
    /// A member, list element, map key/value or operation names a shape
    /// that is not in the shape table
    #[error("Shape '{shape}' references unknown shape '{target}'")]
    UnresolvedShapeReference { shape: String, target: String },

    /// A request/result rename collided with an existing shape and the
    /// collision table has no entry for it
    #[error("Unhandled name conflict on '{name}' while binding operation '{operation}'")]
    UnhandledNameConflict { name: String, operation: String },

    /// No protocol policy registered for the protocol/service pair
    #[error("Unsupported protocol '{protocol}' for service '{service}'")]
    UnsupportedProtocol { protocol: String, service: String },

    #[error("Malformed HTTP binding '{uri}': {reason}")]
    MalformedHttpBinding { uri: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for loader and pipeline operations
pub type Result<T> = std::result::Result<T, TransformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_offending_literal() {
        let err = TransformError::MalformedHttpBinding {
            uri: "/a?b?c".to_string(),
            reason: "more than one query separator".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed HTTP binding '/a?b?c': more than one query separator"
        );

        let err = TransformError::UnresolvedShapeReference {
            shape: "Outer".to_string(),
            target: "Missing".to_string(),
        };
        assert!(err.to_string().contains("'Missing'"));
    }
}
