use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Description of the device under test, embedded verbatim into every artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "CPU")]
    pub cpu: String,
    #[serde(rename = "Browser")]
    pub browser: String,
    /// Any other descriptive fields (OS, GPU, memory, ...), kept as given and in input order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeviceInfo {
    pub fn new(cpu: impl Into<String>, browser: impl Into<String>) -> Self {
        Self {
            cpu: cpu.into(),
            browser: browser.into(),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_unknown_fields_verbatim() {
        let raw = json!({
            "CPU": "Intel(R) Core(TM) i7",
            "Browser": "Chrome-120",
            "OS": "Windows 11",
            "Memory": {"total_gb": 16}
        });
        let device: DeviceInfo = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(device.cpu, "Intel(R) Core(TM) i7");
        assert_eq!(device.extra["OS"], json!("Windows 11"));
        assert_eq!(serde_json::to_value(&device).unwrap(), raw);
    }

    #[test]
    fn extra_fields_keep_input_order() {
        let raw = r#"{"CPU":"Example CPU","Browser":"Chrome","Zeta":1,"OS":"Linux","Alpha":true}"#;
        let device: DeviceInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(serde_json::to_string(&device).unwrap(), raw);

        let built = DeviceInfo::new("Example CPU", "Chrome")
            .with_field("Zeta", 1)
            .with_field("OS", "Linux")
            .with_field("Alpha", true);
        assert_eq!(serde_json::to_string(&built).unwrap(), raw);
    }
}
