//! status protocol: device status updates, responses, requests and the last-will message

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::entity::message::Message;
use crate::entity::status::DeviceStatus;
use crate::protocol::Protocol;
use crate::warn;

const LOG_TAG: &str = "status_protocol";

const STATUS_REQUEST_ROOT: &str = "p2d/subdevice_status_request";
const STATUS_UPDATE_ROOT: &str = "d2p/subdevice_status_update/d/";
const STATUS_RESPONSE_ROOT: &str = "d2p/subdevice_status_response/d/";

/// 非正常断开时由网关代发，宣告所有子设备离线
pub const LAST_WILL_CHANNEL: &str = "lastwill";

lazy_static! {
    static ref INBOUND_CHANNELS: Vec<String> = vec![STATUS_REQUEST_ROOT.to_string()];
}

#[derive(Debug, Serialize, Deserialize)]
struct DeviceStatusDto {
    state: DeviceStatus,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastWillEntryDto {
    device_key: String,
    state: DeviceStatus,
}

pub struct StatusProtocol;

impl Protocol for StatusProtocol {
    fn inbound_channels(&self) -> Vec<String> {
        INBOUND_CHANNELS.clone()
    }

    fn inbound_channels_for_device(&self, device_key: &str) -> Vec<String> {
        vec![format!("{}/d/{}", STATUS_REQUEST_ROOT, device_key)]
    }
}

impl StatusProtocol {
    pub fn is_status_request(&self, channel: &str) -> bool {
        channel == STATUS_REQUEST_ROOT || channel.starts_with(&format!("{}/", STATUS_REQUEST_ROOT))
    }

    pub fn make_status_update_message(
        &self,
        device_key: &str,
        status: DeviceStatus,
    ) -> Option<Message> {
        self.make_status_message(STATUS_UPDATE_ROOT, device_key, status)
    }

    pub fn make_status_response_message(
        &self,
        device_key: &str,
        status: DeviceStatus,
    ) -> Option<Message> {
        self.make_status_message(STATUS_RESPONSE_ROOT, device_key, status)
    }

    fn make_status_message(
        &self,
        root: &str,
        device_key: &str,
        status: DeviceStatus,
    ) -> Option<Message> {
        if device_key.is_empty() {
            warn!(LOG_TAG, "status message without device key dropped");
            return None;
        }
        let payload = match serde_json::to_string(&DeviceStatusDto { state: status }) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(LOG_TAG, "cannot serialize device status: {}", e);
                return None;
            }
        };
        Some(Message::new(format!("{}{}", root, device_key), payload))
    }

    pub fn parse_device_status(&self, message: &Message) -> Option<DeviceStatus> {
        let dto: DeviceStatusDto = serde_json::from_str(&message.payload).ok()?;
        Some(dto.state)
    }

    /// 遗嘱消息列出所有已知设备并统一标记为 OFFLINE
    pub fn make_last_will_message(&self, device_keys: &[String]) -> Option<Message> {
        let entries: Vec<LastWillEntryDto> = device_keys
            .iter()
            .map(|key| LastWillEntryDto {
                device_key: key.clone(),
                state: DeviceStatus::Offline,
            })
            .collect();
        let payload = match serde_json::to_string(&entries) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(LOG_TAG, "cannot serialize last will message: {}", e);
                return None;
            }
        };
        Some(Message::new(LAST_WILL_CHANNEL, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_update_message() {
        let protocol = StatusProtocol;
        let message = protocol
            .make_status_update_message("DEVICE_KEY_1", DeviceStatus::Connected)
            .unwrap();
        assert_eq!(message.channel, "d2p/subdevice_status_update/d/DEVICE_KEY_1");
        assert_eq!(message.payload, r#"{"state":"CONNECTED"}"#);
        assert_eq!(
            protocol.parse_device_status(&message),
            Some(DeviceStatus::Connected)
        );
    }

    #[test]
    fn test_status_response_message() {
        let protocol = StatusProtocol;
        let message = protocol
            .make_status_response_message("D1", DeviceStatus::Sleep)
            .unwrap();
        assert_eq!(message.channel, "d2p/subdevice_status_response/d/D1");
        assert_eq!(
            protocol.parse_device_status(&message),
            Some(DeviceStatus::Sleep)
        );
    }

    #[test]
    fn test_status_request_classification() {
        let protocol = StatusProtocol;
        assert!(protocol.is_status_request("p2d/subdevice_status_request"));
        assert!(protocol.is_status_request("p2d/subdevice_status_request/d/D1"));
        assert!(!protocol.is_status_request("p2d/actuator_set/d/D1/r/SW"));
    }

    #[test]
    fn test_last_will_lists_all_devices_offline() {
        let protocol = StatusProtocol;
        let keys = vec!["D1".to_string(), "D2".to_string()];
        let message = protocol.make_last_will_message(&keys).unwrap();
        assert_eq!(message.channel, "lastwill");
        assert_eq!(
            message.payload,
            r#"[{"deviceKey":"D1","state":"OFFLINE"},{"deviceKey":"D2","state":"OFFLINE"}]"#
        );
    }

    #[test]
    fn test_empty_device_key_is_dropped() {
        let protocol = StatusProtocol;
        assert!(protocol
            .make_status_update_message("", DeviceStatus::Connected)
            .is_none());
    }
}
