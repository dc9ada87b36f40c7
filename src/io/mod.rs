// src/io/mod.rs
//
// Device I/O for the bridge: connection state, the record sink boundary,
// and the serial / Rad-8 driver modules.

// Core modules
pub mod codec; // Record codec trait and implementations
mod error;
pub mod retry;

// Device drivers
pub mod rad8;
pub mod serial;

pub use codec::RecordCodec;
pub use error::{InvalidOperation, IoError};
pub use rad8::{Rad8Codec, TelemetryRecord};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Shared Types
// ============================================================================

/// Get current time in microseconds since UNIX epoch
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Lifecycle of the serial connection.
///
/// `Discovering -> Idle -> Opening -> Listening -> (fault) -> Opening -> ...`
/// `Closing -> Closed` is reachable from every other state, and `Closed` is final.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Looking for the serial port
    Discovering,
    /// Port found, not listening
    Idle,
    /// In the open/retry loop
    Opening,
    /// Port open, listener thread delivering records
    Listening,
    Closing,
    Closed,
}

impl ConnectionState {
    /// True once `close()` has started
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closing | ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Discovering => "discovering",
            ConnectionState::Idle => "idle",
            ConnectionState::Opening => "opening",
            ConnectionState::Listening => "listening",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Receiver of decoded records.
///
/// Called on the listener thread, one record at a time, in arrival order.
/// A slow sink delays the next serial read.
pub trait EmissionSink: Send + Sync {
    fn on_record(&self, record: TelemetryRecord);
}

impl<F> EmissionSink for F
where
    F: Fn(TelemetryRecord) + Send + Sync,
{
    fn on_record(&self, record: TelemetryRecord) {
        self(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ConnectionState::Closing.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(!ConnectionState::Listening.is_terminal());
        assert!(!ConnectionState::Discovering.is_terminal());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ConnectionState::Listening).unwrap(),
            "\"listening\""
        );
        assert_eq!(ConnectionState::Opening.to_string(), "opening");
    }

    #[test]
    fn test_now_us_is_monotonic_enough() {
        let a = now_us();
        let b = now_us();
        assert!(a > 0);
        assert!(b >= a);
    }
}
