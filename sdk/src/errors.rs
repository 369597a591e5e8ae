//! Error types and handling
//!
//! This module provides the error types used throughout the Scout engine.
//! All errors implement the `ScoutErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Per-item research failures (a connector returning "not found", a scoring
//! call producing garbage) are *not* modelled here: those are typed values
//! that flow through the pipeline. `EngineError` covers the conditions that
//! stop a command outright, plus the plumbing errors that get folded into
//! those typed values at a stage boundary.
//!
//! # Security
//!
//! Error messages never include credential values. Hints are static strings.

use thiserror::Error;

/// Trait for Scout error extensions
pub trait ScoutErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and never contains secrets.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors require the operator to change configuration first.
    fn is_recoverable(&self) -> bool;

    /// Returns whether the error must abort a batch before any lead is touched
    fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: invalid config, missing credentials, no usable model backend
/// - **Storage**: context store failures
/// - **Model**: no usable generative backend
/// - **Input**: malformed lead files
/// - **Run control**: a batch stopped before it finished
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ScoutErrorExt};
///
/// let error = EngineError::InvalidInput("Lead 'x' has no name".to_string());
/// assert!(error.is_recoverable());
/// println!("Hint: {}", error.user_hint());
///
/// let fatal = EngineError::MissingCredential("OPENAI_API_KEY".to_string());
/// assert!(fatal.is_fatal());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // Model backend errors
    #[error("All LLM providers exhausted")]
    AllProvidersExhausted,

    // Input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Run control
    #[error("Run cancelled")]
    Cancelled,

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl ScoutErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::MissingCredential(_) => {
                "Set the credential as an environment variable or store it in the system keychain"
            }

            Self::Database(_) => "Context store operation failed. Check the data directory",

            Self::AllProvidersExhausted => "No LLM providers available. Check configuration",

            Self::InvalidInput(_) => "Check the leads file format",
            Self::Serialization(_) => "Failed to encode or decode JSON data",

            Self::Cancelled => "The run was cancelled before it finished",

            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Startup-level failures: nothing can run until config changes
            Self::Config(_) | Self::MissingCredential(_) | Self::AllProvidersExhausted => false,

            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(EngineError::Config("bad".into()).is_fatal());
        assert!(EngineError::MissingCredential("OPENAI_API_KEY".into()).is_fatal());
        assert!(EngineError::AllProvidersExhausted.is_fatal());

        assert!(!EngineError::Cancelled.is_fatal());
        assert!(!EngineError::Database("locked".into()).is_fatal());
        assert!(!EngineError::InvalidInput("x".into()).is_fatal());
    }

    #[test]
    fn test_missing_credential_message_names_key_only() {
        let err = EngineError::MissingCredential("RAPIDAPI_KEY".into());
        assert_eq!(err.to_string(), "Missing credential: RAPIDAPI_KEY");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: EngineError = parse_err.into();
        assert!(matches!(err, EngineError::Serialization(_)));
    }
}
