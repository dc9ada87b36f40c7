// src/io/serial/ports.rs
//
// Port enumeration and opening, behind a trait so the supervisor can be
// driven by scripted backends in tests.

use serde::Serialize;
use std::time::Duration;

use super::lines::{LineReader, LineSource};
use super::utils::{
    flow_control, to_serialport_data_bits, to_serialport_parity, to_serialport_stop_bits,
    LineParams,
};
use crate::io::IoError;

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PortKind {
    Usb,
    Pci,
    Bluetooth,
    Unknown,
}

/// A serial port found during discovery
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceEndpoint {
    pub port_name: String,
    pub kind: PortKind,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

impl DeviceEndpoint {
    /// Endpoint with only a name, as used by scripted backends
    pub fn named(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            kind: PortKind::Unknown,
            manufacturer: None,
            product: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    /// Port names compare case-insensitively ("COM3" == "com3")
    pub fn matches(&self, name: &str) -> bool {
        self.port_name.eq_ignore_ascii_case(name)
    }
}

/// First endpoint whose name matches `name`
pub fn find_endpoint<'a>(ports: &'a [DeviceEndpoint], name: &str) -> Option<&'a DeviceEndpoint> {
    ports.iter().find(|p| p.matches(name))
}

/// Comma-separated port names for log lines
pub fn port_names(ports: &[DeviceEndpoint]) -> String {
    ports
        .iter()
        .map(|p| p.port_name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

// ============================================================================
// Backend
// ============================================================================

/// Access to the platform's serial ports.
pub trait PortBackend: Send + Sync + 'static {
    fn available_ports(&self) -> Result<Vec<DeviceEndpoint>, IoError>;

    /// Open `endpoint` and wrap it in a line source.
    fn open(
        &self,
        endpoint: &DeviceEndpoint,
        params: &LineParams,
        read_timeout: Duration,
    ) -> Result<Box<dyn LineSource>, IoError>;
}

/// Real serial ports via the serialport crate
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialPortBackend;

impl PortBackend for SerialPortBackend {
    fn available_ports(&self) -> Result<Vec<DeviceEndpoint>, IoError> {
        let ports = serialport::available_ports()
            .map_err(|e| IoError::fault("(enumeration)", format!("Failed to enumerate ports: {}", e)))?;
        Ok(ports.into_iter().map(endpoint_from_info).collect())
    }

    fn open(
        &self,
        endpoint: &DeviceEndpoint,
        params: &LineParams,
        read_timeout: Duration,
    ) -> Result<Box<dyn LineSource>, IoError> {
        let port = serialport::new(&endpoint.port_name, params.baud_rate)
            .data_bits(to_serialport_data_bits(params.data_bits))
            .stop_bits(to_serialport_stop_bits(params.stop_bits))
            .parity(to_serialport_parity(&params.parity))
            .flow_control(flow_control())
            .timeout(read_timeout)
            .open()
            .map_err(|e| IoError::fault(&endpoint.port_name, format!("Failed to open: {}", e)))?;

        Ok(Box::new(LineReader::new(endpoint.port_name.clone(), port)))
    }
}

fn endpoint_from_info(p: serialport::SerialPortInfo) -> DeviceEndpoint {
    let mut endpoint = DeviceEndpoint::named(p.port_name);
    match p.port_type {
        serialport::SerialPortType::UsbPort(info) => {
            endpoint.kind = PortKind::Usb;
            endpoint.manufacturer = info.manufacturer;
            endpoint.product = info.product;
            endpoint.serial_number = info.serial_number;
            endpoint.vid = Some(info.vid);
            endpoint.pid = Some(info.pid);
        }
        serialport::SerialPortType::BluetoothPort => endpoint.kind = PortKind::Bluetooth,
        serialport::SerialPortType::PciPort => endpoint.kind = PortKind::Pci,
        serialport::SerialPortType::Unknown => endpoint.kind = PortKind::Unknown,
    }
    endpoint
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_match_ignores_case() {
        let ports = vec![
            DeviceEndpoint::named("/dev/ttyS0"),
            DeviceEndpoint::named("COM3"),
        ];
        assert_eq!(find_endpoint(&ports, "com3").map(|p| p.port_name.as_str()), Some("COM3"));
        assert!(find_endpoint(&ports, "COM4").is_none());
        assert!(find_endpoint(&[], "COM3").is_none());
    }

    #[test]
    fn test_port_names_for_logs() {
        let ports = vec![DeviceEndpoint::named("a"), DeviceEndpoint::named("b")];
        assert_eq!(port_names(&ports), "a,b");
        assert_eq!(port_names(&[]), "");
    }

    #[test]
    fn test_endpoint_from_pci_info() {
        let endpoint = endpoint_from_info(serialport::SerialPortInfo {
            port_name: "/dev/ttyS4".to_string(),
            port_type: serialport::SerialPortType::PciPort,
        });
        assert_eq!(endpoint.port_name, "/dev/ttyS4");
        assert_eq!(endpoint.kind, PortKind::Pci);
        assert!(endpoint.vid.is_none());
    }

    #[test]
    fn test_open_missing_port_is_a_fault() {
        let endpoint = DeviceEndpoint::named("/dev/this-port-does-not-exist");
        let result = SerialPortBackend.open(&endpoint, &LineParams::RAD8, Duration::from_millis(10));
        assert!(matches!(result, Err(IoError::ConnectionFault { .. })));
    }
}
