//! 子设备与能力模板
//!
//! 功能
//! - 子设备由全局唯一的 key 标识，key 一经登记不可变更
//! - 模板按 reference 描述设备能力：传感器、执行器、报警、配置项
//! - 同一种类内 reference 唯一，模板集合只增不减

use serde::{Deserialize, Serialize};

/// 执行器与配置项的取值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Boolean,
    Numeric,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorTemplate {
    pub name: String,
    pub reference: String,
    pub reading_type: String,
    pub unit: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub minimum: f64,
    #[serde(default)]
    pub maximum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActuatorTemplate {
    pub name: String,
    pub reference: String,
    pub data_type: DataType,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmTemplate {
    pub name: String,
    pub reference: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationTemplate {
    pub name: String,
    pub reference: String,
    pub data_type: DataType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

/// 设备能力模板集合
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTemplate {
    #[serde(default)]
    pub sensors: Vec<SensorTemplate>,
    #[serde(default)]
    pub actuators: Vec<ActuatorTemplate>,
    #[serde(default)]
    pub alarms: Vec<AlarmTemplate>,
    #[serde(default)]
    pub configurations: Vec<ConfigurationTemplate>,
}

impl DeviceTemplate {
    pub fn sensor_template(&self, reference: &str) -> Option<&SensorTemplate> {
        self.sensors.iter().find(|t| t.reference == reference)
    }

    pub fn actuator_template(&self, reference: &str) -> Option<&ActuatorTemplate> {
        self.actuators.iter().find(|t| t.reference == reference)
    }

    pub fn alarm_template(&self, reference: &str) -> Option<&AlarmTemplate> {
        self.alarms.iter().find(|t| t.reference == reference)
    }

    pub fn configuration_template(&self, reference: &str) -> Option<&ConfigurationTemplate> {
        self.configurations.iter().find(|t| t.reference == reference)
    }

    pub fn actuator_references(&self) -> Vec<String> {
        self.actuators.iter().map(|t| t.reference.clone()).collect()
    }

    /// 追加缺失的传感器模板；reference 已存在时忽略
    pub fn add_sensor(&mut self, template: SensorTemplate) {
        if self.sensor_template(&template.reference).is_none() {
            self.sensors.push(template);
        }
    }

    pub fn add_actuator(&mut self, template: ActuatorTemplate) {
        if self.actuator_template(&template.reference).is_none() {
            self.actuators.push(template);
        }
    }

    pub fn add_alarm(&mut self, template: AlarmTemplate) {
        if self.alarm_template(&template.reference).is_none() {
            self.alarms.push(template);
        }
    }

    pub fn add_configuration(&mut self, template: ConfigurationTemplate) {
        if self.configuration_template(&template.reference).is_none() {
            self.configurations.push(template);
        }
    }
}

/// 网关代理的一个逻辑子设备
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subdevice {
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub template: DeviceTemplate,
}

impl Subdevice {
    pub fn new(name: impl Into<String>, key: impl Into<String>, template: DeviceTemplate) -> Self {
        Subdevice {
            name: name.into(),
            key: key.into(),
            template,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(reference: &str) -> SensorTemplate {
        SensorTemplate {
            name: reference.to_string(),
            reference: reference.to_string(),
            reading_type: "GENERIC".to_string(),
            unit: "COUNT".to_string(),
            description: String::new(),
            minimum: 0.0,
            maximum: 100.0,
        }
    }

    // 同 reference 的模板不会重复追加
    #[test]
    fn test_add_sensor_ignores_duplicate_reference() {
        let mut template = DeviceTemplate::default();
        template.add_sensor(sensor("T"));
        template.add_sensor(sensor("T"));
        template.add_sensor(sensor("P"));
        assert_eq!(template.sensors.len(), 2);
    }

    #[test]
    fn test_actuator_references_preserve_order() {
        let mut template = DeviceTemplate::default();
        for reference in ["SW", "SL", "ST"] {
            template.add_actuator(ActuatorTemplate {
                name: reference.to_string(),
                reference: reference.to_string(),
                data_type: DataType::String,
                description: String::new(),
                minimum: None,
                maximum: None,
            });
        }
        assert_eq!(template.actuator_references(), vec!["SW", "SL", "ST"]);
    }

    #[test]
    fn test_template_serde_uses_camel_case() {
        let template = ConfigurationTemplate {
            name: "Interval".to_string(),
            reference: "CI".to_string(),
            data_type: DataType::Numeric,
            description: String::new(),
            default_value: "60".to_string(),
            labels: None,
            minimum: Some(1.0),
            maximum: Some(3600.0),
        };
        let json = serde_json::to_string(&template).unwrap();
        assert!(json.contains("\"dataType\":\"NUMERIC\""));
        assert!(json.contains("\"defaultValue\":\"60\""));
        assert!(!json.contains("labels"));
    }
}
