//! Error types for the PolyAgent client.

use thiserror::Error;

/// A shared error type for the PolyAgent client core.
///
/// Variants map onto the error taxonomy of a chat turn: storage and
/// serialization problems are non-fatal and logged, while routing, transport
/// and decode failures end the turn in the `Failed` state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolyError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Durable storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested agent has no route
    #[error("Unknown agent: '{0}'")]
    UnknownAgent(String),

    /// HTTP-level failure talking to an agent endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    /// The agent answered with something we could not interpret
    #[error("Decode error: {0}")]
    Decode(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PolyError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a Decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error came from resolving an agent route
    pub fn is_routing(&self) -> bool {
        matches!(self, Self::UnknownAgent(_))
    }

    /// Check if this error ends a turn in the `Failed` state.
    ///
    /// Routing, transport and decode errors all surface as the same visible
    /// error message in the transcript.
    pub fn is_turn_failure(&self) -> bool {
        matches!(
            self,
            Self::UnknownAgent(_) | Self::Transport(_) | Self::Decode(_)
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PolyError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for PolyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PolyError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PolyError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<crate::stream::StreamError> for PolyError {
    fn from(err: crate::stream::StreamError) -> Self {
        match err {
            crate::stream::StreamError::MissingBody => Self::Transport(err.to_string()),
            crate::stream::StreamError::Read(message) => Self::Transport(message),
        }
    }
}

/// Conversion from anyhow::Error (used at the bootstrap edge)
impl From<anyhow::Error> for PolyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, PolyError>`.
pub type Result<T> = std::result::Result<T, PolyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_failure_classification() {
        assert!(PolyError::UnknownAgent("bogus".into()).is_turn_failure());
        assert!(PolyError::transport("503").is_turn_failure());
        assert!(PolyError::decode("missing success").is_turn_failure());
        assert!(!PolyError::storage("disk full").is_turn_failure());
        assert!(PolyError::UnknownAgent("bogus".into()).is_routing());
    }

    #[test]
    fn test_json_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let poly: PolyError = err.into();
        assert!(matches!(poly, PolyError::Serialization { ref format, .. } if format == "JSON"));
    }
}
