// src/io/serial/mod.rs
//
// Serial port driver for push-only line devices.
//
// Features:
// - Port discovery by name with unbounded retry
// - Line framing over a timed-out blocking read
// - Supervised listener that reopens the port after any I/O fault

pub mod lines;
pub mod ports;
pub mod supervisor;
pub(crate) mod utils;

pub use lines::{LineReader, LineSource};
pub use ports::{DeviceEndpoint, PortBackend, PortKind, SerialPortBackend};
pub use supervisor::Supervisor;
pub use utils::{LineParams, Parity};
