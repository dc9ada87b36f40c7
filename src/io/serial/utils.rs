// src/io/serial/utils.rs
//
// Serial line parameters and conversions to the serialport crate's types.

use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity as SpParity, StopBits};
use std::fmt;

// ============================================================================
// Types
// ============================================================================

/// Parity setting for serial port configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Line parameters used when opening the port
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineParams {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
}

impl LineParams {
    /// Rad-8 serial output: 9600 baud, 8 data bits, no parity, 1 stop bit
    pub const RAD8: LineParams = LineParams {
        baud_rate: 9600,
        data_bits: 8,
        stop_bits: 1,
        parity: Parity::None,
    };
}

impl Default for LineParams {
    fn default() -> Self {
        Self::RAD8
    }
}

impl fmt::Display for LineParams {
    /// `9600-8-N-1`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.baud_rate,
            self.data_bits,
            match self.parity {
                Parity::None => 'N',
                Parity::Odd => 'O',
                Parity::Even => 'E',
            },
            self.stop_bits
        )
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert our Parity enum to serialport crate's Parity type
pub fn to_serialport_parity(p: &Parity) -> SpParity {
    match p {
        Parity::None => SpParity::None,
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
    }
}

/// Convert data bits count to serialport crate's DataBits type
pub fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

/// Convert stop bits count to serialport crate's StopBits type
pub fn to_serialport_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

/// The monitor has no handshake lines wired
pub fn flow_control() -> FlowControl {
    FlowControl::None
}

// ============================================================================
// Tests
// ============================================================================
