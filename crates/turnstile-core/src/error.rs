//! Unified error types for the turnstile core library.
//!
//! [`TurnstileError`] covers every failure mode of the validation engine and
//! its collaborators. Domain outcomes such as an unknown ticket or a blocked
//! reentry are *not* errors: they are returned as [`crate::ResultCode`]
//! values. Only storage failures and malformed input end up here.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Storage failures are explicit**: reads and writes carry distinct kinds
//!   together with the underlying cause string
//! - **HTTP-ready**: Error types include HTTP status codes and error codes
//!
//! # Example
//!
//! ```rust
//! use turnstile_core::error::{Result, TurnstileError};
//!
//! fn parse(raw: &str) -> Result<turnstile_core::Direction> {
//!     raw.parse()
//! }
//!
//! assert!(matches!(parse("sideways"), Err(TurnstileError::InvalidDirection(_))));
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{GroupId, TerminalId};

/// The unified error type for all turnstile operations.
#[derive(Debug, Error)]
pub enum TurnstileError {
    // =========================================================================
    // STORAGE ERRORS
    // =========================================================================
    /// The backing store could not answer a query.
    #[error("Can't select from storage: {0}")]
    CannotRead(String),

    /// The backing store rejected an insert, upsert or removal.
    #[error("Can't insert in storage: {0}")]
    CannotWrite(String),

    // =========================================================================
    // REQUEST ERRORS
    // =========================================================================
    /// The scan direction was neither `entry` nor `exit`.
    #[error("Invalid direction: '{0}'. Expected 'entry' or 'exit'.")]
    InvalidDirection(String),

    /// The barcode is empty or contains characters a scanner never emits.
    #[error("Invalid barcode: '{0}'")]
    InvalidBarcode(String),

    /// No terminal is registered under the given id.
    #[error("Terminal not found: {0}")]
    TerminalNotFound(TerminalId),

    /// No group is registered under the given id.
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    // =========================================================================
    // ADMINISTRATION ERRORS
    // =========================================================================
    /// A terminal with this name already exists.
    #[error("Can't add, terminal '{0}' already exists")]
    TerminalExists(String),

    /// A group with this name already exists.
    #[error("Can't add, group '{0}' already exists")]
    GroupExists(String),

    /// The barcode is already registered as a master key.
    #[error("Can't add, master key '{0}' already exists")]
    MasterKeyExists(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// A low-level I/O error occurred outside the storage layer.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for turnstile operations.
pub type Result<T> = std::result::Result<T, TurnstileError>;

/// Short alias used throughout the crate.
pub type Error = TurnstileError;

impl TurnstileError {
    /// Returns `true` if the backing store failed.
    #[inline]
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(self, Self::CannotRead(_) | Self::CannotWrite(_))
    }

    /// Returns `true` if the caller may retry the same request unchanged.
    ///
    /// The engine never retries by itself; a storage failure is reported once.
    #[inline]
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.is_storage_error()
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if the request collided with an existing record.
    #[inline]
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::TerminalExists(_) | Self::GroupExists(_) | Self::MasterKeyExists(_)
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidDirection(_) | Self::InvalidBarcode(_) => 400,
            Self::TerminalNotFound(_) | Self::GroupNotFound(_) | Self::ConfigNotFound(_) => 404,
            Self::TerminalExists(_) | Self::GroupExists(_) | Self::MasterKeyExists(_) => 409,
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,
            Self::IoError(_) => 500,
            Self::CannotRead(_) | Self::CannotWrite(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::CannotRead(_) => "CANNOT_READ",
            Self::CannotWrite(_) => "CANNOT_WRITE",
            Self::InvalidDirection(_) => "INVALID_DIRECTION",
            Self::InvalidBarcode(_) => "INVALID_BARCODE",
            Self::TerminalNotFound(_) => "TERMINAL_NOT_FOUND",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::TerminalExists(_) => "TERMINAL_EXISTS",
            Self::GroupExists(_) => "GROUP_EXISTS",
            Self::MasterKeyExists(_) => "MASTER_KEY_EXISTS",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for TurnstileError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::ReadError { path, source } => Self::ConfigParseError(format!(
                "Failed to read {}: {source}",
                path.display()
            )),
            ConfigError::WriteError { path, source } => Self::IoError(std::io::Error::new(
                source.kind(),
                format!("Failed to write {}: {source}", path.display()),
            )),
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
