//! Error types for dismob
//!
//! One crate-wide [`Error`] enum covers everything a command or module
//! operation can fail with. [`Error::user_message`] turns it into the text
//! shown to whoever invoked the failing command.

use std::fmt;

use thiserror::Error;

use crate::{kwargs::ParseError, modules::ModuleError, platform::PlatformError};

/// Main error type for dismob
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Module lifecycle error
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Malformed keyword arguments
    #[error(transparent)]
    Kwargs(#[from] ParseError),

    /// Chat platform error
    #[error("Platform error: {0}")]
    Platform(PlatformError),

    /// No command with this name
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// Two commands claim the same name or alias
    #[error("Command name conflict: {0}")]
    CommandConflict(String),

    /// Invoking user lacks a permission
    #[error("Missing permissions: {0}")]
    MissingPermissions(String),

    /// The bot itself lacks a permission
    #[error("Bot missing permissions: {0}")]
    BotMissingPermissions(String),

    /// A command check rejected the invocation
    #[error("Check failed: {0}")]
    CheckFailed(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Timeout error
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Initialization error
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Other error with context
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Optional error source
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a new error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with a message and source
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Platform(e) => e.is_retryable(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }

    /// Check if the invoking user caused this error
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Kwargs(_)
                | Self::InvalidInput(_)
                | Self::CommandNotFound(_)
                | Self::MissingPermissions(_)
                | Self::CheckFailed(_)
        )
    }

    /// Get the error code used in logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "E001",
            Self::Validation(_) => "E002",
            Self::Module(_) => "E003",
            Self::Kwargs(_) => "E004",
            Self::Platform(_) => "E005",
            Self::CommandNotFound(_) => "E006",
            Self::CommandConflict(_) => "E007",
            Self::MissingPermissions(_) => "E008",
            Self::BotMissingPermissions(_) => "E009",
            Self::CheckFailed(_) => "E010",
            Self::InvalidInput(_) => "E011",
            Self::Io(_) => "E012",
            Self::Serialization(_) => "E013",
            Self::Timeout(_) => "E014",
            Self::Initialization(_) => "E015",
            Self::Internal(_) => "E016",
            Self::Other { .. } => "E999",
        }
    }

    /// Text shown to the user whose command failed
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingPermissions(_) => {
                "You do not have the required permissions to use this command.".to_string()
            }
            Self::BotMissingPermissions(_) => {
                "The bot does not have the required permissions to execute this command."
                    .to_string()
            }
            Self::CheckFailed(_) => "A check failed in the command.".to_string(),
            Self::CommandNotFound(_) => "This command does not exist.".to_string(),
            Self::Kwargs(e) => e.to_string(),
            Self::InvalidInput(message) => message.clone(),
            other => format!(
                "An unexpected error occurred while executing the command.\n```\n{other}\n```"
            ),
        }
    }
}

impl From<PlatformError> for Error {
    /// `Forbidden` means the bot itself lacks a permission
    fn from(error: PlatformError) -> Self {
        match error {
            PlatformError::Forbidden => Self::BotMissingPermissions(error.to_string()),
            other => Self::Platform(other),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for converting errors with context
pub trait ErrorContext<T> {
    /// Add context to an error
    ///
    /// # Errors
    ///
    /// Returns the wrapped error when `self` is an error.
    fn context(self, msg: impl fmt::Display) -> Result<T>;

    /// Add context with a closure
    ///
    /// # Errors
    ///
    /// Returns the wrapped error when `self` is an error.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl fmt::Display) -> Result<T> {
        self.map_err(|e| Error::with_source(msg.to_string(), e))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Error::with_source(f(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::time::Duration;

    #[test]
    fn test_error_creation() {
        let error = Error::new("test error");
        assert_eq!(error.to_string(), "test error");
        assert_eq!(error.error_code(), "E999");
    }

    #[test]
    fn test_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::with_source("wrapper error", source);
        assert_eq!(error.to_string(), "wrapper error");
        assert!(StdError::source(&error).is_some());
    }

    #[test]
    fn test_retryable_errors() {
        let limited = PlatformError::RateLimited {
            retry_after: Duration::from_secs(1),
        };
        assert!(Error::Platform(limited).is_retryable());
        assert!(Error::Timeout(Duration::from_secs(30)).is_retryable());

        assert!(!Error::Platform(PlatformError::Forbidden).is_retryable());
        assert!(!Error::InvalidInput("bad input".into()).is_retryable());
    }

    #[test]
    fn test_forbidden_is_a_bot_permission_error() {
        let error = Error::from(PlatformError::Forbidden);
        assert!(matches!(error, Error::BotMissingPermissions(_)));
        assert_eq!(error.error_code(), "E009");

        let error = Error::from(PlatformError::NotFound);
        assert!(matches!(error, Error::Platform(PlatformError::NotFound)));
    }

    #[test]
    fn test_user_errors() {
        assert!(Error::CommandNotFound("nope".into()).is_user_error());
        assert!(Error::CheckFailed("owner".into()).is_user_error());
        assert!(!Error::Internal("boom".into()).is_user_error());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            Error::MissingPermissions("administrator".into()).user_message(),
            "You do not have the required permissions to use this command."
        );
        assert_eq!(
            Error::BotMissingPermissions("send_messages".into()).user_message(),
            "The bot does not have the required permissions to execute this command."
        );
        assert_eq!(
            Error::CheckFailed("guild owner".into()).user_message(),
            "A check failed in the command."
        );
        assert_eq!(
            Error::CommandNotFound("x".into()).user_message(),
            "This command does not exist."
        );
        assert_eq!(
            Error::Internal("boom".into()).user_message(),
            "An unexpected error occurred while executing the command.\n```\nInternal error: boom\n```"
        );
    }

    #[test]
    fn test_kwargs_error_is_shown_verbatim() {
        let parse_error = crate::kwargs::parse("=1").unwrap_err();
        let error = Error::from(parse_error.clone());
        assert_eq!(error.user_message(), parse_error.message());
        assert_eq!(error.error_code(), "E004");
    }

    #[test]
    fn test_error_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        let error = result.context("Failed to read file").unwrap_err();
        assert_eq!(error.to_string(), "Failed to read file");
    }
}
