// src/io/rad8/mod.rs
//
// Masimo Rad-8 pulse oximeter ASCII output.
//
// The monitor pushes one fixed-width status line per second over 9600-8-N-1.
// There is no request/response mode.

pub mod codec;
pub mod layout;
mod record;

pub use codec::Rad8Codec;
pub use layout::{Field, LINE_WIDTH, RECORD_WIDTH};
pub use record::TelemetryRecord;
