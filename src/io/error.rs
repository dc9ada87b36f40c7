// src/io/error.rs
//
// Error taxonomy for the bridge.
//
// Transient classes (EndpointNotFound, ConnectionFault) are retried by the
// supervisor, MalformedRecord drops a single line, and only InvalidOperation
// and Config are ever returned to a caller of the synchronous API.

use std::fmt;
use thiserror::Error;

/// Precondition violations on direct calls
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidOperation {
    /// `subscribe` before any endpoint was discovered
    NotDiscovered,
    /// Any lifecycle call after `close()`
    Closed,
}

impl fmt::Display for InvalidOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidOperation::NotDiscovered => write!(f, "serial port has not been discovered"),
            InvalidOperation::Closed => write!(f, "driver has been closed"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IoError {
    /// No enumerated port matches the requested name (yet)
    #[error("Cannot find port {name}. Available ports: {visible}")]
    EndpointNotFound { name: String, visible: String },

    /// I/O failure while opening or reading the port
    #[error("Connection fault on {port}: {message}")]
    ConnectionFault { port: String, message: String },

    /// A line that violates the fixed-width layout
    #[error("Malformed record ({field}): {reason}")]
    MalformedRecord { field: &'static str, reason: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(InvalidOperation),

    /// Bad driver option or settings file
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IoError {
    pub fn fault(port: impl Into<String>, message: impl fmt::Display) -> Self {
        IoError::ConnectionFault {
            port: port.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        IoError::MalformedRecord {
            field,
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        IoError::Config(message.into())
    }

    /// Whether the supervisor recovers from this error on its own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IoError::EndpointNotFound { .. } | IoError::ConnectionFault { .. }
        )
    }
}

impl From<InvalidOperation> for IoError {
    fn from(op: InvalidOperation) -> Self {
        IoError::InvalidOperation(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IoError::malformed("spo2", "expected label 'SPO2='");
        assert_eq!(err.to_string(), "Malformed record (spo2): expected label 'SPO2='");

        let err = IoError::fault("/dev/ttyUSB0", "end of stream");
        assert_eq!(err.to_string(), "Connection fault on /dev/ttyUSB0: end of stream");

        let err: IoError = InvalidOperation::NotDiscovered.into();
        assert_eq!(
            err.to_string(),
            "Invalid operation: serial port has not been discovered"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(IoError::fault("COM3", "x").is_transient());
        assert!(IoError::EndpointNotFound {
            name: "COM3".into(),
            visible: String::new()
        }
        .is_transient());
        assert!(!IoError::malformed("bpm", "x").is_transient());
        assert!(!IoError::from(InvalidOperation::Closed).is_transient());
        assert!(!IoError::config("x").is_transient());
    }
}
