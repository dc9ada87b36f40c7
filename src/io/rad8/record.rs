// src/io/rad8/record.rs
//
// Decoded Rad-8 status line.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One measurement line as reported by the monitor.
///
/// Numeric fields are `None` when the device printed its "no data" placeholder
/// for that column. Tenths fields carry the value multiplied by 10
/// (`PI=03.3%` is stored as 33).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub load_date: String,
    pub load_time: String,
    pub serial_number: String,
    /// Oxygen saturation, percent
    pub spo2: Option<u8>,
    /// Pulse rate, beats per minute
    pub pulse_rate: Option<u16>,
    /// Perfusion index, tenths of a percent
    pub perfusion_index: Option<u16>,
    /// Carboxyhemoglobin, tenths of a percent
    pub spco: Option<u16>,
    /// Methemoglobin, tenths of a percent
    pub spmet: Option<u16>,
    pub desat_index: Option<u8>,
    pub perfusion_delta: Option<i16>,
    /// Alarm word, kept as printed
    pub alarm: String,
    /// Exception word, kept as printed
    pub exception: String,
}

impl TelemetryRecord {
    /// Device clock time of the record, if the date and time columns parse.
    /// Accepts both `MM/DD/YY` and `MM-DD-YY`.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let stamp = format!("{} {}", self.load_date, self.load_time);
        ["%m/%d/%y %H:%M:%S", "%m-%d-%y %H:%M:%S"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&stamp, fmt).ok())
    }

    /// True when every physiological reading is absent (probe off patient)
    pub fn is_empty(&self) -> bool {
        self.spo2.is_none()
            && self.pulse_rate.is_none()
            && self.perfusion_index.is_none()
            && self.spco.is_none()
            && self.spmet.is_none()
            && self.desat_index.is_none()
            && self.perfusion_delta.is_none()
    }
}

fn show<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} SN={} SpO2={} BPM={} PI={} SpCO={} SpMet={} DESAT={} PIDELTA={} ALARM={} EXC={}",
            self.load_date,
            self.load_time,
            self.serial_number,
            show(&self.spo2),
            show(&self.pulse_rate),
            show(&self.perfusion_index),
            show(&self.spco),
            show(&self.spmet),
            show(&self.desat_index),
            show(&self.perfusion_delta),
            self.alarm,
            self.exception
        )
    }
}
