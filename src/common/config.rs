//! 模块配置
//! 从 json 配置文件读取 mqtt 连接地址与子设备清单

use std::fs::File;
use std::io::Read;

use serde::Deserialize;

use crate::common::error::{ErrorCode, ModuleError};
use crate::entity::device::Subdevice;

fn default_readings_interval_ms() -> u64 {
    1000
}

/// 模块启动配置
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfiguration {
    /// 本机网关进程的 mqtt 地址，例如 tcp://localhost:1883
    pub local_mqtt_uri: String,
    /// mqtt client id，缺省时由模块自动生成
    #[serde(default)]
    pub client_id: Option<String>,
    // 示例宿主的采样周期
    #[serde(default = "default_readings_interval_ms")]
    pub readings_interval_ms: u64,
    /// 启动时登记的子设备清单
    #[serde(default)]
    pub devices: Vec<Subdevice>,
}

impl ModuleConfiguration {
    /// 从 json 文本解析配置
    pub fn from_json(raw: &str) -> Result<Self, ModuleError> {
        serde_json::from_str(raw).map_err(|e| {
            ModuleError::new(
                ErrorCode::ConfigurationError,
                format!("cannot parse module configuration: {}", e),
            )
        })
    }

    /// 从配置文件读取
    pub fn from_file(path: &str) -> Result<Self, ModuleError> {
        let mut file = File::open(path).map_err(|e| {
            ModuleError::new(
                ErrorCode::ConfigurationError,
                format!("cannot open configuration file {}: {}", path, e),
            )
        })?;
        let mut raw = String::new();
        file.read_to_string(&mut raw).map_err(|e| {
            ModuleError::new(
                ErrorCode::ConfigurationError,
                format!("cannot read configuration file {}: {}", path, e),
            )
        })?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 解析带一个子设备的完整配置
    #[test]
    fn test_parse_full_configuration() {
        let raw = r#"{
            "localMqttUri": "tcp://localhost:1883",
            "clientId": "module-1",
            "readingsIntervalMs": 500,
            "devices": [
                {
                    "name": "Thermostat",
                    "key": "DEVICE_KEY_1",
                    "template": {
                        "sensors": [
                            {
                                "name": "Temperature",
                                "reference": "T",
                                "readingType": "TEMPERATURE",
                                "unit": "CELSIUS",
                                "description": "",
                                "minimum": -40.0,
                                "maximum": 85.0
                            }
                        ]
                    }
                }
            ]
        }"#;

        let config = ModuleConfiguration::from_json(raw).unwrap();
        assert_eq!(config.local_mqtt_uri, "tcp://localhost:1883");
        assert_eq!(config.client_id.as_deref(), Some("module-1"));
        assert_eq!(config.readings_interval_ms, 500);
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].key, "DEVICE_KEY_1");
        assert_eq!(config.devices[0].template.sensors.len(), 1);
    }

    // 缺省字段有默认值
    #[test]
    fn test_parse_minimal_configuration() {
        let config =
            ModuleConfiguration::from_json(r#"{"localMqttUri": "tcp://localhost:1883"}"#).unwrap();
        assert!(config.client_id.is_none());
        assert_eq!(config.readings_interval_ms, 1000);
        assert!(config.devices.is_empty());
    }

    // 非法 json 返回配置错误
    #[test]
    fn test_parse_error_is_configuration_error() {
        let err = ModuleConfiguration::from_json("not json").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigurationError);
    }
}
