// src/io/codec.rs
//
// Record codec trait and re-exports of device-specific implementations.
//
// A codec turns one already-framed, trimmed text line into a typed record.
// Line framing lives in serial/lines.rs; retry policy lives in the supervisor.

use crate::io::error::IoError;

// ============================================================================
// Record Codec Trait
// ============================================================================

/// Trait for line-oriented record codecs.
pub trait RecordCodec {
    /// The decoded record type
    type Record;

    /// Decode a single line.
    ///
    /// Returns `Err(IoError::MalformedRecord)` naming the offending field if the
    /// line does not match the device layout. Never returns partial records.
    fn decode(line: &str) -> Result<Self::Record, IoError>;
}

// ============================================================================
// Re-exports from driver modules
// ============================================================================

pub use super::rad8::codec::Rad8Codec;
