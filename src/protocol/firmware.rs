//! firmware update protocol: install/abort commands, status and version messages

use serde::{Deserialize, Serialize};

use crate::entity::firmware::{
    FirmwareUpdateAbort, FirmwareUpdateError, FirmwareUpdateInstall, FirmwareUpdateStatus,
    FirmwareVersion,
};
use crate::entity::message::Message;
use crate::protocol::Protocol;
use crate::warn;

const LOG_TAG: &str = "firmware_protocol";

const INSTALL_ROOT: &str = "p2d/firmware_update_install/d/";
const ABORT_ROOT: &str = "p2d/firmware_update_abort/d/";
const STATUS_ROOT: &str = "d2p/firmware_update_status/d/";
const VERSION_ROOT: &str = "d2p/firmware_version_update/d/";

const STATUS_INSTALLATION: &str = "INSTALLATION";
const STATUS_COMPLETED: &str = "COMPLETED";
const STATUS_ABORTED: &str = "ABORTED";
const STATUS_ERROR: &str = "ERROR";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallDto {
    devices: Vec<String>,
    file_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AbortDto {
    devices: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatusDto {
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<FirmwareUpdateError>,
}

pub struct FirmwareUpdateProtocol;

impl Protocol for FirmwareUpdateProtocol {
    fn inbound_channels(&self) -> Vec<String> {
        Vec::new()
    }

    fn inbound_channels_for_device(&self, device_key: &str) -> Vec<String> {
        vec![
            format!("{}{}", INSTALL_ROOT, device_key),
            format!("{}{}", ABORT_ROOT, device_key),
        ]
    }
}

impl FirmwareUpdateProtocol {
    pub fn is_firmware_install(&self, channel: &str) -> bool {
        channel.starts_with(INSTALL_ROOT)
    }

    pub fn is_firmware_abort(&self, channel: &str) -> bool {
        channel.starts_with(ABORT_ROOT)
    }

    pub fn parse_install(&self, message: &Message) -> Option<FirmwareUpdateInstall> {
        let dto: InstallDto = match serde_json::from_str(&message.payload) {
            Ok(dto) => dto,
            Err(e) => {
                warn!(LOG_TAG, "cannot parse firmware install command: {}", e);
                return None;
            }
        };
        Some(FirmwareUpdateInstall {
            device_keys: dto.devices,
            file_name: dto.file_name,
        })
    }

    pub fn parse_abort(&self, message: &Message) -> Option<FirmwareUpdateAbort> {
        let dto: AbortDto = match serde_json::from_str(&message.payload) {
            Ok(dto) => dto,
            Err(e) => {
                warn!(LOG_TAG, "cannot parse firmware abort command: {}", e);
                return None;
            }
        };
        Some(FirmwareUpdateAbort {
            device_keys: dto.devices,
        })
    }

    pub fn make_status_message(
        &self,
        device_key: &str,
        status: &FirmwareUpdateStatus,
    ) -> Option<Message> {
        if device_key.is_empty() {
            warn!(LOG_TAG, "firmware status without device key dropped");
            return None;
        }
        let dto = match status {
            FirmwareUpdateStatus::Installation => StatusDto {
                status: STATUS_INSTALLATION.to_string(),
                error: None,
            },
            FirmwareUpdateStatus::Completed => StatusDto {
                status: STATUS_COMPLETED.to_string(),
                error: None,
            },
            FirmwareUpdateStatus::Aborted => StatusDto {
                status: STATUS_ABORTED.to_string(),
                error: None,
            },
            FirmwareUpdateStatus::Error(code) => StatusDto {
                status: STATUS_ERROR.to_string(),
                error: Some(*code),
            },
        };
        let payload = match serde_json::to_string(&dto) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(LOG_TAG, "cannot serialize firmware status: {}", e);
                return None;
            }
        };
        Some(Message::new(
            format!("{}{}", STATUS_ROOT, device_key),
            payload,
        ))
    }

    pub fn parse_status_message(&self, message: &Message) -> Option<FirmwareUpdateStatus> {
        let dto: StatusDto = serde_json::from_str(&message.payload).ok()?;
        match dto.status.as_str() {
            STATUS_INSTALLATION => Some(FirmwareUpdateStatus::Installation),
            STATUS_COMPLETED => Some(FirmwareUpdateStatus::Completed),
            STATUS_ABORTED => Some(FirmwareUpdateStatus::Aborted),
            STATUS_ERROR => Some(FirmwareUpdateStatus::Error(
                dto.error.unwrap_or(FirmwareUpdateError::UnspecifiedError),
            )),
            _ => None,
        }
    }

    /// 版本消息的载荷是裸版本号文本
    pub fn make_version_message(&self, version: &FirmwareVersion) -> Option<Message> {
        if version.device_key.is_empty() || version.version.is_empty() {
            warn!(LOG_TAG, "firmware version message missing fields, dropped");
            return None;
        }
        Some(Message::new(
            format!("{}{}", VERSION_ROOT, version.device_key),
            version.version.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_install_command() {
        let protocol = FirmwareUpdateProtocol;
        let message = Message::new(
            "p2d/firmware_update_install/d/D1",
            r#"{"devices":["D1"],"fileName":"firmware.bin"}"#,
        );
        assert!(protocol.is_firmware_install(&message.channel));
        let command = protocol.parse_install(&message).unwrap();
        assert_eq!(command.device_keys, vec!["D1"]);
        assert_eq!(command.file_name, "firmware.bin");
    }

    #[test]
    fn test_parse_abort_command() {
        let protocol = FirmwareUpdateProtocol;
        let message = Message::new("p2d/firmware_update_abort/d/D1", r#"{"devices":["D1"]}"#);
        assert!(protocol.is_firmware_abort(&message.channel));
        let command = protocol.parse_abort(&message).unwrap();
        assert_eq!(command.device_keys, vec!["D1"]);
    }

    #[test]
    fn test_status_messages_round_trip() {
        let protocol = FirmwareUpdateProtocol;
        for status in [
            FirmwareUpdateStatus::Installation,
            FirmwareUpdateStatus::Completed,
            FirmwareUpdateStatus::Aborted,
            FirmwareUpdateStatus::Error(FirmwareUpdateError::FileSystemError),
            FirmwareUpdateStatus::Error(FirmwareUpdateError::InstallationFailed),
        ] {
            let message = protocol.make_status_message("D1", &status).unwrap();
            assert_eq!(message.channel, "d2p/firmware_update_status/d/D1");
            assert_eq!(protocol.parse_status_message(&message), Some(status));
        }
    }

    #[test]
    fn test_error_status_payload_shape() {
        let protocol = FirmwareUpdateProtocol;
        let message = protocol
            .make_status_message(
                "D1",
                &FirmwareUpdateStatus::Error(FirmwareUpdateError::FileSystemError),
            )
            .unwrap();
        assert_eq!(
            message.payload,
            r#"{"status":"ERROR","error":"FILE_SYSTEM_ERROR"}"#
        );
    }

    #[test]
    fn test_version_message_is_plain_text() {
        let protocol = FirmwareUpdateProtocol;
        let message = protocol
            .make_version_message(&FirmwareVersion {
                device_key: "D1".to_string(),
                version: "2.0.1".to_string(),
            })
            .unwrap();
        assert_eq!(message.channel, "d2p/firmware_version_update/d/D1");
        assert_eq!(message.payload, "2.0.1");
    }

    #[test]
    fn test_version_message_requires_fields() {
        let protocol = FirmwareUpdateProtocol;
        assert!(protocol
            .make_version_message(&FirmwareVersion {
                device_key: "D1".to_string(),
                version: String::new(),
            })
            .is_none());
    }
}
