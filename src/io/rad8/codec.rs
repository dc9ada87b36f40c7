// src/io/rad8/codec.rs
//
// Rad-8 ASCII status line codec.
//
// Decoding is purely positional: each slot is cut at a fixed column offset,
// its label is checked, and the payload is compared against the field's
// "no data" spellings before any numeric parse. See layout.rs for the columns.

use super::layout::{
    offset_of, slot_width, Field, LINE_WIDTH, NARROW_LINE_WIDTH, SPMET_NARROW, SPMET_WIDE,
};
use super::record::TelemetryRecord;
use crate::io::codec::RecordCodec;
use crate::io::error::IoError;

/// Pseudo field name for whole-line failures
const LINE: &str = "line";

/// Rad-8 status line codec.
pub struct Rad8Codec;

impl RecordCodec for Rad8Codec {
    type Record = TelemetryRecord;

    /// Decode one Rad-8 status line.
    ///
    /// Example:
    ///   `04/23/12 13:51:02 SN=0000091429 SPO2=098% BPM=066 PI=03.31% SPCO=--.-% SPMET=--.-% DESAT=-- PIDELTA=+-- ALARM=0000 EXC=000000`
    ///   -> SpO2=98, BPM=66, PI=33, SpCO/SpMet/DESAT/PIDELTA absent
    fn decode(line: &str) -> Result<TelemetryRecord, IoError> {
        let line = line.trim();
        if !line.is_ascii() {
            return Err(IoError::malformed(LINE, "line contains non-ASCII characters"));
        }
        if line.len() < NARROW_LINE_WIDTH {
            return Err(too_short(line.len(), NARROW_LINE_WIDTH));
        }

        let columns = Columns {
            line,
            spmet_width: detect_spmet_width(line)?,
        };
        let needed = LINE_WIDTH - (SPMET_WIDE - columns.spmet_width);
        if line.len() < needed {
            return Err(too_short(line.len(), needed));
        }

        Ok(TelemetryRecord {
            load_date: columns.payload(Field::LoadDate)?.to_string(),
            load_time: columns.payload(Field::LoadTime)?.to_string(),
            serial_number: columns.payload(Field::SerialNumber)?.to_string(),
            spo2: columns
                .reading(Field::SpO2)?
                .map(|v| parse_unsigned(Field::SpO2, strip_percent(Field::SpO2, v)?))
                .transpose()?,
            pulse_rate: columns
                .reading(Field::PulseRate)?
                .map(|v| parse_unsigned(Field::PulseRate, v))
                .transpose()?,
            perfusion_index: columns
                .reading(Field::PerfusionIndex)?
                .map(|v| parse_tenths(Field::PerfusionIndex, strip_percent(Field::PerfusionIndex, v)?))
                .transpose()?,
            spco: columns
                .reading(Field::SpCo)?
                .map(|v| parse_tenths(Field::SpCo, strip_percent(Field::SpCo, v)?))
                .transpose()?,
            spmet: columns
                .reading(Field::SpMet)?
                .map(|v| parse_tenths(Field::SpMet, v.strip_suffix('%').unwrap_or(v)))
                .transpose()?,
            desat_index: columns
                .reading(Field::DesatIndex)?
                .map(|v| parse_unsigned(Field::DesatIndex, v))
                .transpose()?,
            perfusion_delta: columns
                .reading(Field::PerfusionDelta)?
                .map(|v| parse_signed(Field::PerfusionDelta, v))
                .transpose()?,
            alarm: columns.payload(Field::Alarm)?.to_string(),
            exception: columns.payload(Field::Exception)?.to_string(),
        })
    }
}

fn too_short(len: usize, needed: usize) -> IoError {
    IoError::malformed(
        LINE,
        format!("line too short: {} columns, need {}", len, needed),
    )
}

/// Pick the SpMet slot width by probing the two columns where the
/// `DESAT=` label can start.
fn detect_spmet_width(line: &str) -> Result<usize, IoError> {
    let label = Field::DesatIndex.label();
    for width in [SPMET_WIDE, SPMET_NARROW] {
        let start = offset_of(Field::DesatIndex, width);
        if line.get(start..start + label.len()) == Some(label) {
            return Ok(width);
        }
    }
    Err(IoError::malformed(
        Field::DesatIndex.name(),
        format!("expected label '{}' at column {}", label, offset_of(Field::DesatIndex, SPMET_WIDE)),
    ))
}

/// A validated ASCII line plus the SpMet variant it uses
struct Columns<'a> {
    line: &'a str,
    spmet_width: usize,
}

impl<'a> Columns<'a> {
    fn slot(&self, field: Field) -> Result<&'a str, IoError> {
        let start = offset_of(field, self.spmet_width);
        let end = start + slot_width(field, self.spmet_width);
        self.line
            .get(start..end)
            .ok_or_else(|| IoError::malformed(field.name(), format!("missing columns {}..{}", start, end)))
    }

    /// Slot contents after the label, byte-for-byte
    fn payload(&self, field: Field) -> Result<&'a str, IoError> {
        let slot = self.slot(field)?;
        slot.strip_prefix(field.label()).ok_or_else(|| {
            IoError::malformed(
                field.name(),
                format!("expected label '{}', found '{}'", field.label(), slot),
            )
        })
    }

    /// Numeric payload with pad spaces removed, or `None` for "no data"
    fn reading(&self, field: Field) -> Result<Option<&'a str>, IoError> {
        let value = self.payload(field)?.trim_end();
        if field.no_data().contains(&value) {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }
}

fn strip_percent(field: Field, value: &str) -> Result<&str, IoError> {
    value
        .strip_suffix('%')
        .ok_or_else(|| IoError::malformed(field.name(), format!("'{}' is missing the '%' unit", value)))
}

fn not_a_number(field: Field, value: &str) -> IoError {
    IoError::malformed(field.name(), format!("'{}' is not a number", value))
}

fn parse_unsigned<T: std::str::FromStr>(field: Field, value: &str) -> Result<T, IoError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_a_number(field, value));
    }
    value.parse().map_err(|_| not_a_number(field, value))
}

/// `+05` -> 5, `-03` -> -3. The sign column is mandatory.
fn parse_signed(field: Field, value: &str) -> Result<i16, IoError> {
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'+') => (false, &value[1..]),
        Some(b'-') => (true, &value[1..]),
        _ => {
            return Err(IoError::malformed(
                field.name(),
                format!("'{}' has no sign column", value),
            ))
        }
    };
    let magnitude: i16 = parse_unsigned(field, digits).map_err(|_| not_a_number(field, value))?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Decimal text scaled by 10, digits past the first decimal are dropped.
/// `02.1` -> 21, `03.31` -> 33, `12` -> 120.
fn parse_tenths(field: Field, value: &str) -> Result<u16, IoError> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let whole: u16 = parse_unsigned(field, whole).map_err(|_| not_a_number(field, value))?;
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_a_number(field, value));
    }
    let tenths = fraction.bytes().next().map(|b| u16::from(b - b'0')).unwrap_or(0);
    whole
        .checked_mul(10)
        .and_then(|v| v.checked_add(tenths))
        .ok_or_else(|| IoError::malformed(field.name(), format!("'{}' is out of range", value)))
}

// ============================================================================
// Tests
// ============================================================================
