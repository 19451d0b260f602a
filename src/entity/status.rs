//! 设备状态与平台侧状态实体

use serde::{Deserialize, Serialize};

/// 子设备对外上报的运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    Connected,
    Sleep,
    Service,
    Offline,
}

/// 网关与云平台之间的连接状态，由网关进程广播给各模块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformConnectivityStatus {
    Connected,
    Offline,
}

impl PlatformConnectivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformConnectivityStatus::Connected => "CONNECTED",
            PlatformConnectivityStatus::Offline => "OFFLINE",
        }
    }

    /// 仅接受协议定义的单词，其余一律视为解析失败
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "CONNECTED" => Some(PlatformConnectivityStatus::Connected),
            "OFFLINE" => Some(PlatformConnectivityStatus::Offline),
            _ => None,
        }
    }
}

/// 平台对注册/更新请求的应答结果码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformResult {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR_KEY_CONFLICT")]
    ErrorKeyConflict,
    #[serde(rename = "ERROR_MANIFEST_CONFLICT")]
    ErrorManifestConflict,
    #[serde(rename = "ERROR_MAX_DEVICES")]
    ErrorMaxDevices,
    #[serde(rename = "ERROR_READING_PAYLOAD")]
    ErrorReadingPayload,
    #[serde(rename = "ERROR_GATEWAY_NOT_FOUND")]
    ErrorGatewayNotFound,
    #[serde(rename = "ERROR_NO_GATEWAY_MANIFEST")]
    ErrorNoGatewayManifest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_status_wire_casing() {
        assert_eq!(
            serde_json::to_string(&DeviceStatus::Connected).unwrap(),
            "\"CONNECTED\""
        );
        assert_eq!(
            serde_json::from_str::<DeviceStatus>("\"SLEEP\"").unwrap(),
            DeviceStatus::Sleep
        );
    }

    #[test]
    fn test_platform_status_rejects_unknown_token() {
        assert_eq!(
            PlatformConnectivityStatus::from_str("CONNECTED"),
            Some(PlatformConnectivityStatus::Connected)
        );
        assert_eq!(PlatformConnectivityStatus::from_str("connected"), None);
        assert_eq!(PlatformConnectivityStatus::from_str(""), None);
    }

    #[test]
    fn test_platform_result_wire_names() {
        assert_eq!(
            serde_json::to_string(&PlatformResult::ErrorKeyConflict).unwrap(),
            "\"ERROR_KEY_CONFLICT\""
        );
        assert_eq!(
            serde_json::from_str::<PlatformResult>("\"ERROR_NO_GATEWAY_MANIFEST\"").unwrap(),
            PlatformResult::ErrorNoGatewayManifest
        );
    }
}
