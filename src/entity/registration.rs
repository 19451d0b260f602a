//! 子设备注册与模板更新实体

use serde::{Deserialize, Serialize};

use crate::entity::device::{
    ActuatorTemplate, AlarmTemplate, ConfigurationTemplate, SensorTemplate,
};
use crate::entity::status::PlatformResult;

/// 向平台追加设备能力的更新请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdeviceUpdateRequest {
    pub device_key: String,
    pub update_default_semantics: bool,
    #[serde(default)]
    pub configurations: Vec<ConfigurationTemplate>,
    #[serde(default)]
    pub sensors: Vec<SensorTemplate>,
    #[serde(default)]
    pub alarms: Vec<AlarmTemplate>,
    #[serde(default)]
    pub actuators: Vec<ActuatorTemplate>,
}

/// 平台对注册或更新请求的应答
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformResponse {
    pub device_key: String,
    pub result: PlatformResult,
}
