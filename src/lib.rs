// src/lib.rs
//
// Telemetry bridge for Masimo Rad-8 pulse oximeters.
//
// The monitor pushes one fixed-width text record per second over RS-232. The
// bridge finds the serial port, keeps it open through unplugs and resets,
// decodes each line into a `TelemetryRecord` and hands it to an
// `EmissionSink` supplied by the host.

#[macro_use]
pub mod logging;

pub mod device;
pub mod io;
pub mod settings;

pub use device::{DeviceInfo, DEFAULT_DEVICE_ID};
pub use io::serial::{DeviceEndpoint, PortBackend, SerialPortBackend, Supervisor};
pub use io::{ConnectionState, EmissionSink, InvalidOperation, IoError, Rad8Codec, RecordCodec, TelemetryRecord};
pub use settings::{BridgeSettings, DriverOptions};
