//! Error types for findmycar.
//!
//! This module defines the crate-wide error type. Leaf modules keep their own
//! narrow error enums (`PhotoError`, `LocateError`, `TimerError`, `RouteError`)
//! which convert into [`Error`] at the controller boundary.

use std::path::PathBuf;
use thiserror::Error;

use crate::navigation::RouteError;
use crate::photo::PhotoError;
use crate::timer::TimerError;

/// The main error type for findmycar operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Parking Session Errors ===
    /// Navigation was requested before any parked location was saved.
    #[error("no parked location saved yet")]
    NoSessionSaved,

    /// Neither a fresh fix nor a last known position is available as route origin.
    #[error("need your current location for directions")]
    OriginUnavailable,

    /// The requested parking time limit is outside the accepted range.
    #[error("invalid parking duration: {minutes} minutes (expected {min}-{max})")]
    InvalidDuration {
        /// The rejected value in minutes.
        minutes: u32,
        /// Smallest accepted value.
        min: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// The countdown timer rejected an operation.
    #[error("timer error: {0}")]
    Timer(#[from] TimerError),

    /// The photo could not be decoded or re-encoded.
    #[error("photo error: {0}")]
    Photo(#[from] PhotoError),

    /// The routing collaborator failed.
    #[error("routing error: {0}")]
    Route(#[from] RouteError),

    /// A coordinate pair could not be parsed or is out of range.
    #[error("invalid coordinates '{input}': {reason}")]
    InvalidCoordinates {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    // === Platform Errors ===
    /// Platform-specific operation failed.
    #[error("platform error: {0}")]
    Platform(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for findmycar operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new platform error.
    #[must_use]
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform(message.into())
    }

    /// Create an invalid coordinates error.
    #[must_use]
    pub fn invalid_coordinates(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCoordinates {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is a rejected user input rather than an
    /// environment or storage failure.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDuration { .. }
                | Self::InvalidCoordinates { .. }
                | Self::Photo(PhotoError::Decode(_) | PhotoError::Empty)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::NoSessionSaved.to_string(),
            "no parked location saved yet"
        );

        let err = Error::platform("test error");
        assert_eq!(err.to_string(), "platform error: test error");
    }

    #[test]
    fn test_invalid_duration_display() {
        let err = Error::InvalidDuration {
            minutes: 500,
            min: 1,
            max: 480,
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("1-480"));
    }

    #[test]
    fn test_is_input_error() {
        let err = Error::InvalidDuration {
            minutes: 0,
            min: 1,
            max: 480,
        };
        assert!(err.is_input_error());
        assert!(Error::invalid_coordinates("x", "bad").is_input_error());
        assert!(Error::Photo(PhotoError::Empty).is_input_error());
        assert!(!Error::NoSessionSaved.is_input_error());
        assert!(!Error::OriginUnavailable.is_input_error());
    }

    #[test]
    fn test_from_timer_error() {
        let err: Error = TimerError::InvalidDuration.into();
        assert!(matches!(err, Error::Timer(TimerError::InvalidDuration)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid quality".to_string(),
        };
        assert!(err.to_string().contains("invalid quality"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
