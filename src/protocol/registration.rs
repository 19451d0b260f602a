//! registration protocol: subdevice registration and template update requests

use serde::{Deserialize, Serialize};

use crate::entity::device::{DeviceTemplate, Subdevice};
use crate::entity::message::Message;
use crate::entity::registration::{PlatformResponse, SubdeviceUpdateRequest};
use crate::entity::status::PlatformResult;
use crate::protocol::{device_key_from_channel, Protocol};
use crate::warn;

const LOG_TAG: &str = "registration_protocol";

const REGISTRATION_REQUEST_ROOT: &str = "d2p/register_subdevice/d/";
const REGISTRATION_RESPONSE_ROOT: &str = "p2d/register_subdevice/d/";
const UPDATE_REQUEST_ROOT: &str = "d2p/update_subdevice/d/";
const UPDATE_RESPONSE_ROOT: &str = "p2d/update_subdevice/d/";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationRequestDto<'a> {
    name: &'a str,
    device_key: &'a str,
    template: &'a DeviceTemplate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlatformResponseDto {
    result: PlatformResult,
    #[serde(default)]
    device_key: Option<String>,
}

pub struct RegistrationProtocol;

impl Protocol for RegistrationProtocol {
    fn inbound_channels(&self) -> Vec<String> {
        Vec::new()
    }

    fn inbound_channels_for_device(&self, device_key: &str) -> Vec<String> {
        vec![
            format!("{}{}", REGISTRATION_RESPONSE_ROOT, device_key),
            format!("{}{}", UPDATE_RESPONSE_ROOT, device_key),
        ]
    }
}

impl RegistrationProtocol {
    pub fn is_registration_response(&self, channel: &str) -> bool {
        channel.starts_with(REGISTRATION_RESPONSE_ROOT)
    }

    pub fn is_update_response(&self, channel: &str) -> bool {
        channel.starts_with(UPDATE_RESPONSE_ROOT)
    }

    pub fn make_registration_message(&self, device: &Subdevice) -> Option<Message> {
        if device.key.is_empty() {
            warn!(LOG_TAG, "registration request without device key dropped");
            return None;
        }
        let dto = RegistrationRequestDto {
            name: &device.name,
            device_key: &device.key,
            template: &device.template,
        };
        let payload = match serde_json::to_string(&dto) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(LOG_TAG, "cannot serialize registration request: {}", e);
                return None;
            }
        };
        Some(Message::new(
            format!("{}{}", REGISTRATION_REQUEST_ROOT, device.key),
            payload,
        ))
    }

    pub fn make_update_message(&self, request: &SubdeviceUpdateRequest) -> Option<Message> {
        if request.device_key.is_empty() {
            warn!(LOG_TAG, "update request without device key dropped");
            return None;
        }
        let payload = match serde_json::to_string(request) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(LOG_TAG, "cannot serialize update request: {}", e);
                return None;
            }
        };
        Some(Message::new(
            format!("{}{}", UPDATE_REQUEST_ROOT, request.device_key),
            payload,
        ))
    }

    /// 应答优先使用载荷中的 deviceKey，缺省时回退到通道内的 key
    pub fn parse_response(&self, message: &Message) -> Option<PlatformResponse> {
        let dto: PlatformResponseDto = match serde_json::from_str(&message.payload) {
            Ok(dto) => dto,
            Err(e) => {
                warn!(LOG_TAG, "cannot parse platform response: {}", e);
                return None;
            }
        };
        let device_key = dto
            .device_key
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| device_key_from_channel(&message.channel));
        if device_key.is_empty() {
            warn!(LOG_TAG, "platform response without device key dropped");
            return None;
        }
        Some(PlatformResponse {
            device_key,
            result: dto.result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::device::{DataType, SensorTemplate};

    fn device() -> Subdevice {
        let mut template = DeviceTemplate::default();
        template.add_sensor(SensorTemplate {
            name: "Temperature".to_string(),
            reference: "T".to_string(),
            reading_type: "TEMPERATURE".to_string(),
            unit: "CELSIUS".to_string(),
            description: String::new(),
            minimum: -40.0,
            maximum: 85.0,
        });
        Subdevice::new("Thermostat", "DEVICE_KEY_1", template)
    }

    #[test]
    fn test_registration_message_shape() {
        let protocol = RegistrationProtocol;
        let message = protocol.make_registration_message(&device()).unwrap();
        assert_eq!(message.channel, "d2p/register_subdevice/d/DEVICE_KEY_1");
        assert!(message.payload.contains("\"deviceKey\":\"DEVICE_KEY_1\""));
        assert!(message.payload.contains("\"reference\":\"T\""));
    }

    #[test]
    fn test_update_message_shape() {
        let protocol = RegistrationProtocol;
        let request = SubdeviceUpdateRequest {
            device_key: "D1".to_string(),
            update_default_semantics: false,
            configurations: Vec::new(),
            sensors: Vec::new(),
            alarms: Vec::new(),
            actuators: vec![crate::entity::device::ActuatorTemplate {
                name: "Switch".to_string(),
                reference: "SW".to_string(),
                data_type: DataType::Boolean,
                description: String::new(),
                minimum: None,
                maximum: None,
            }],
        };
        let message = protocol.make_update_message(&request).unwrap();
        assert_eq!(message.channel, "d2p/update_subdevice/d/D1");
        assert!(message.payload.contains("\"updateDefaultSemantics\":false"));
        assert!(message.payload.contains("\"dataType\":\"BOOLEAN\""));
    }

    #[test]
    fn test_parse_response_with_payload_key() {
        let protocol = RegistrationProtocol;
        let message = Message::new(
            "p2d/register_subdevice/d/D1",
            r#"{"result":"OK","deviceKey":"D1"}"#,
        );
        assert!(protocol.is_registration_response(&message.channel));
        let response = protocol.parse_response(&message).unwrap();
        assert_eq!(response.device_key, "D1");
        assert_eq!(response.result, PlatformResult::Ok);
    }

    #[test]
    fn test_parse_response_falls_back_to_channel_key() {
        let protocol = RegistrationProtocol;
        let message = Message::new(
            "p2d/update_subdevice/d/D2",
            r#"{"result":"ERROR_KEY_CONFLICT"}"#,
        );
        assert!(protocol.is_update_response(&message.channel));
        let response = protocol.parse_response(&message).unwrap();
        assert_eq!(response.device_key, "D2");
        assert_eq!(response.result, PlatformResult::ErrorKeyConflict);
    }

    #[test]
    fn test_parse_response_rejects_unknown_result() {
        let protocol = RegistrationProtocol;
        let message = Message::new(
            "p2d/register_subdevice/d/D1",
            r#"{"result":"SOMETHING_ELSE"}"#,
        );
        assert!(protocol.parse_response(&message).is_none());
    }
}
