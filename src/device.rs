// src/device.rs
//
// Identity of the monitor as registered with the host framework.

use serde::{Deserialize, Serialize};

/// Device id used when the host framework does not assign one
pub const DEFAULT_DEVICE_ID: &str = "b0d9491a-5001-480c-86af-5f35dc8eb286";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "pulse_oximeter".to_string()
}

impl DeviceInfo {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            name: None,
            kind: default_kind(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name for log lines: the display name if set, else the device id
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.device_id)
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_identity() {
        let info = DeviceInfo::default();
        assert_eq!(info.device_id, DEFAULT_DEVICE_ID);
        assert_eq!(info.kind, "pulse_oximeter");
        assert_eq!(info.label(), DEFAULT_DEVICE_ID);
    }

    #[test]
    fn test_label_prefers_name() {
        let info = DeviceInfo::new("abc").with_name("Bed 4 Rad-8");
        assert_eq!(info.label(), "Bed 4 Rad-8");
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let info: DeviceInfo = serde_json::from_str(r#"{ "device_id": "x" }"#).unwrap();
        assert_eq!(info, DeviceInfo::new("x"));
    }
}
