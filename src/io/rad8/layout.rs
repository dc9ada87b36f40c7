// src/io/rad8/layout.rs
//
// Column layout of a Rad-8 ASCII status line.
//
// Line format (one record per line, single space between slots):
//   04/23/12 13:51:02 SN=0000091429 SPO2=098% BPM=066 PI=03.31% SPCO=--.-% SPMET=--.-% DESAT=-- PIDELTA=+-- ALARM=0000 EXC=000000
//
// Every slot has a fixed width that includes its label. Older firmware emits a
// 9-column SpMet slot (`SPMET=--.`) instead of the 11-column one.

/// Width of the separator column between two slots
pub const SEPARATOR_WIDTH: usize = 1;

/// Fields of a status line, in wire order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    LoadDate,
    LoadTime,
    SerialNumber,
    SpO2,
    PulseRate,
    PerfusionIndex,
    SpCo,
    SpMet,
    DesatIndex,
    PerfusionDelta,
    Alarm,
    Exception,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::LoadDate,
        Field::LoadTime,
        Field::SerialNumber,
        Field::SpO2,
        Field::PulseRate,
        Field::PerfusionIndex,
        Field::SpCo,
        Field::SpMet,
        Field::DesatIndex,
        Field::PerfusionDelta,
        Field::Alarm,
        Field::Exception,
    ];

    /// Stable name used in errors and logs
    pub fn name(self) -> &'static str {
        match self {
            Field::LoadDate => "load_date",
            Field::LoadTime => "load_time",
            Field::SerialNumber => "serial_number",
            Field::SpO2 => "spo2",
            Field::PulseRate => "pulse_rate",
            Field::PerfusionIndex => "perfusion_index",
            Field::SpCo => "spco",
            Field::SpMet => "spmet",
            Field::DesatIndex => "desat_index",
            Field::PerfusionDelta => "perfusion_delta",
            Field::Alarm => "alarm",
            Field::Exception => "exception",
        }
    }

    /// Slot width in columns, label included (wide SpMet variant)
    pub fn width(self) -> usize {
        match self {
            Field::LoadDate => 8,
            Field::LoadTime => 8,
            Field::SerialNumber => 13,
            Field::SpO2 => 9,
            Field::PulseRate => 7,
            Field::PerfusionIndex => 9,
            Field::SpCo => 10,
            Field::SpMet => SPMET_WIDE,
            Field::DesatIndex => 8,
            Field::PerfusionDelta => 11,
            Field::Alarm => 10,
            Field::Exception => 10,
        }
    }

    /// Label the device prints at the start of the slot
    pub fn label(self) -> &'static str {
        match self {
            Field::LoadDate | Field::LoadTime => "",
            Field::SerialNumber => "SN=",
            Field::SpO2 => "SPO2=",
            Field::PulseRate => "BPM=",
            Field::PerfusionIndex => "PI=",
            Field::SpCo => "SPCO=",
            Field::SpMet => "SPMET=",
            Field::DesatIndex => "DESAT=",
            Field::PerfusionDelta => "PIDELTA=",
            Field::Alarm => "ALARM=",
            Field::Exception => "EXC=",
        }
    }

    /// Payload spellings that mean "no data" for this field
    pub fn no_data(self) -> &'static [&'static str] {
        match self {
            Field::SpO2 => &["---%"],
            Field::PulseRate => &["---"],
            Field::PerfusionIndex => &["--.--%"],
            Field::SpCo => &["--.-%"],
            Field::SpMet => &["--.-%", "--."],
            Field::DesatIndex => &["--"],
            Field::PerfusionDelta => &["+--"],
            _ => &[],
        }
    }
}

pub const SPMET_WIDE: usize = 11;
pub const SPMET_NARROW: usize = 9;

/// Sum of all slot widths, separators excluded
pub const RECORD_WIDTH: usize = 114;

/// Full line width with separators, wide SpMet slot
pub const LINE_WIDTH: usize = RECORD_WIDTH + (Field::ALL.len() - 1) * SEPARATOR_WIDTH;

/// Full line width when the device uses the narrow SpMet slot
pub const NARROW_LINE_WIDTH: usize = LINE_WIDTH - (SPMET_WIDE - SPMET_NARROW);

/// Column offset of a field's slot, given the SpMet slot width in use
pub fn offset_of(field: Field, spmet_width: usize) -> usize {
    Field::ALL
        .iter()
        .take_while(|f| **f != field)
        .map(|f| slot_width(*f, spmet_width) + SEPARATOR_WIDTH)
        .sum()
}

/// Slot width of a field, given the SpMet slot width in use
pub fn slot_width(field: Field, spmet_width: usize) -> usize {
    if field == Field::SpMet {
        spmet_width
    } else {
        field.width()
    }
}
