//! Unified error types for Dactyl

use thiserror::Error;

/// Unified error type for all Dactyl operations
#[derive(Error, Debug)]
pub enum DactylError {
    // Configuration errors - reported before any gateway call
    #[error("Configuration error: {0}")]
    Config(String),

    // Gateway errors - fatal to the current run, never retried by the loop
    #[error("Gateway failure in round {round}: {message}")]
    Gateway { round: usize, message: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl DactylError {
    /// Build a gateway error carrying the round it occurred in
    pub fn gateway(round: usize, message: impl Into<String>) -> Self {
        Self::Gateway {
            round,
            message: message.into(),
        }
    }
}

/// Result type alias using DactylError
pub type Result<T> = std::result::Result<T, DactylError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_names_round() {
        let err = DactylError::gateway(2, "connection reset");
        let msg = err.to_string();
        assert!(msg.contains("round 2"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_io_error_converts() {
        fn read_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/dactyl")?)
        }
        assert!(matches!(read_missing(), Err(DactylError::Io(_))));
    }
}
