//! Error types for race gate operations.
//!
//! Protocol-level conditions (pulse timeouts, malformed frames, ambiguous
//! gaps) are *not* errors: the decoder reports them as "no detection" and
//! resynchronizes on the next frame. `GateError` covers the control plane
//! and resource layer: invalid input from callers, persisted-profile
//! corruption, storage faults, and lifecycle misuse. Nothing here is ever
//! raised on the detection path during an active race.
//!
//! ## Helper Constructors
//!
//! ```rust
//! use lightgate::GateError;
//! use std::path::PathBuf;
//!
//! let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
//! let storage = GateError::storage_error(PathBuf::from("/data/profiles.bin"), io_err);
//! assert!(storage.is_retryable());
//!
//! let name = GateError::invalid_name("display name must not be empty");
//! assert!(!name.is_retryable());
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for gate operations.
pub type Result<T, E = GateError> = std::result::Result<T, E>;

/// Main error type for race gate operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GateError {
    #[error("Profile storage error: {path}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed profile data in {context}: {details}")]
    ProfileFormat { context: String, details: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Racer id {value} is out of range (expected 0-7)")]
    InvalidRacer { value: u8 },

    #[error("Invalid racer name: {reason}")]
    InvalidName { reason: String },

    #[error("Cannot {operation} while a race is in progress")]
    RaceInProgress { operation: String },

    #[error("Gate is shut down: {context}")]
    Disconnected { context: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl GateError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            GateError::Storage { .. } => true,
            GateError::Timeout { .. } => true,
            GateError::RaceInProgress { .. } => true,
            GateError::ProfileFormat { .. } => false,
            GateError::Parse { .. } => false,
            GateError::InvalidRacer { .. } => false,
            GateError::InvalidName { .. } => false,
            GateError::Disconnected { .. } => false,
        }
    }

    /// Helper constructor for storage errors with path context.
    pub fn storage_error(path: PathBuf, source: std::io::Error) -> Self {
        GateError::Storage { path, source }
    }

    /// Helper constructor for malformed persisted profile data.
    pub fn profile_format(context: impl Into<String>, details: impl Into<String>) -> Self {
        GateError::ProfileFormat { context: context.into(), details: details.into() }
    }

    /// Helper constructor for control-plane parse failures.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        GateError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for invalid racer names.
    pub fn invalid_name(reason: impl Into<String>) -> Self {
        GateError::InvalidName { reason: reason.into() }
    }

    /// Helper constructor for operations rejected during an active race.
    pub fn race_in_progress(operation: impl Into<String>) -> Self {
        GateError::RaceInProgress { operation: operation.into() }
    }

    /// Helper constructor for operations on a shut-down gate.
    pub fn disconnected(context: impl Into<String>) -> Self {
        GateError::Disconnected { context: context.into() }
    }
}

impl From<std::io::Error> for GateError {
    fn from(err: std::io::Error) -> Self {
        GateError::Storage { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_format_correctly_with_arbitrary_context(
                reason in "[^\\r\\n]*",
                context in "[a-zA-Z0-9 _-]+",
                details in "[a-zA-Z0-9 _-]+",
                value in 8u8..,
                duration_ms in 1u64..60000u64
            ) {
                // Property: every variant renders a non-empty message that
                // contains its own context.
                let name_err = GateError::invalid_name(reason.clone());
                prop_assert!(name_err.to_string().contains(&reason));

                let format_err = GateError::profile_format(context.clone(), details.clone());
                let format_msg = format_err.to_string();
                prop_assert!(format_msg.contains(&context));
                prop_assert!(format_msg.contains(&details));

                let racer_err = GateError::InvalidRacer { value };
                prop_assert!(racer_err.to_string().contains(&value.to_string()));

                let timeout_err =
                    GateError::Timeout { duration: Duration::from_millis(duration_ms) };
                prop_assert!(!timeout_err.to_string().is_empty());
            }

            #[test]
            fn io_conversion_preserves_source_message(reason in "[a-zA-Z0-9 ]+") {
                let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, reason.clone());
                let converted: GateError = io_err.into();
                match converted {
                    GateError::Storage { source, .. } => {
                        prop_assert_eq!(source.to_string(), reason);
                    }
                    _ => prop_assert!(false, "Expected Storage error from io::Error conversion"),
                }
            }
        }
    }

    #[test]
    fn error_constructors_validation() {
        let storage = GateError::storage_error(
            PathBuf::from("/test"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "test"),
        );
        assert!(matches!(storage, GateError::Storage { .. }));

        let format = GateError::profile_format("slot 3", "name length 40 exceeds 30");
        assert!(matches!(format, GateError::ProfileFormat { .. }));

        let busy = GateError::race_in_progress("switch mode");
        assert!(matches!(busy, GateError::RaceInProgress { .. }));
        assert_eq!(busy.to_string(), "Cannot switch mode while a race is in progress");
    }

    #[test]
    fn error_traits_validation() {
        // Compile-time check: GateError must be Send + Sync + 'static so it
        // can cross the driver task boundary.
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<GateError>();

        let error = GateError::invalid_name("empty");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retryable_classification() {
        assert!(
            GateError::storage_error(
                PathBuf::from("/p"),
                std::io::Error::other("busy"),
            )
            .is_retryable()
        );
        assert!(GateError::race_in_progress("set mode").is_retryable());
        assert!(!GateError::profile_format("header", "bad magic").is_retryable());
        assert!(!GateError::InvalidRacer { value: 9 }.is_retryable());
        assert!(!GateError::disconnected("driver task ended").is_retryable());
    }
}
