//! 固件升级实体

use serde::{Deserialize, Serialize};

/// 平台下发的固件安装命令；固件文件已在本地文件系统中
#[derive(Debug, Clone, PartialEq)]
pub struct FirmwareUpdateInstall {
    pub device_keys: Vec<String>,
    pub file_name: String,
}

/// 平台下发的安装中止命令
#[derive(Debug, Clone, PartialEq)]
pub struct FirmwareUpdateAbort {
    pub device_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FirmwareUpdateError {
    UnspecifiedError,
    FileSystemError,
    InstallationFailed,
}

/// 模块上报的安装进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareUpdateStatus {
    Installation,
    Completed,
    Aborted,
    Error(FirmwareUpdateError),
}

/// 固件版本消息
#[derive(Debug, Clone, PartialEq)]
pub struct FirmwareVersion {
    pub device_key: String,
    pub version: String,
}

/// 每个子设备的安装状态机取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirmwareUpdateState {
    #[default]
    Idle,
    Installing,
    Completed,
    Failed,
    Aborted,
}

/// 模块内维护的每设备固件状态
#[derive(Debug, Clone, Default)]
pub struct FirmwareState {
    pub status: FirmwareUpdateState,
    pub current_version: String,
}
