//! data protocol: json codec for readings, alarms, actuator statuses and configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::message::Message;
use crate::entity::reading::{
    ActuatorGetCommand, ActuatorSetCommand, ActuatorState, ActuatorStatus, Alarm,
    ConfigurationItem, ConfigurationSnapshot, SensorReading,
};
use crate::protocol::{device_key_from_channel, reference_from_channel, Protocol};
use crate::warn;

const LOG_TAG: &str = "data_protocol";

const SENSOR_READING_ROOT: &str = "d2p/sensor_reading/d/";
const EVENTS_ROOT: &str = "d2p/events/d/";
const ACTUATOR_STATUS_ROOT: &str = "d2p/actuator_status/d/";
const CONFIGURATION_ROOT: &str = "d2p/configuration_get/d/";

const ACTUATOR_SET_ROOT: &str = "p2d/actuator_set/d/";
const ACTUATOR_GET_ROOT: &str = "p2d/actuator_get/d/";
const CONFIGURATION_SET_ROOT: &str = "p2d/configuration_set/d/";
const CONFIGURATION_GET_ROOT: &str = "p2d/configuration_get/d/";

/// 多值读数在载荷中以单个空格连接
const MULTI_VALUE_DELIMITER: &str = " ";

#[derive(Debug, Serialize, Deserialize)]
struct ReadingDto {
    utc: u64,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AlarmDto {
    utc: u64,
    active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActuatorStatusDto {
    status: ActuatorState,
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActuatorSetDto {
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigurationDto {
    values: BTreeMap<String, String>,
}

pub struct DataProtocol;

impl Protocol for DataProtocol {
    fn inbound_channels(&self) -> Vec<String> {
        Vec::new()
    }

    fn inbound_channels_for_device(&self, device_key: &str) -> Vec<String> {
        vec![
            format!("{}{}/r/+", ACTUATOR_SET_ROOT, device_key),
            format!("{}{}/r/+", ACTUATOR_GET_ROOT, device_key),
            format!("{}{}", CONFIGURATION_SET_ROOT, device_key),
            format!("{}{}", CONFIGURATION_GET_ROOT, device_key),
        ]
    }
}

impl DataProtocol {
    pub fn is_actuator_set(&self, channel: &str) -> bool {
        channel.starts_with(ACTUATOR_SET_ROOT)
    }

    pub fn is_actuator_get(&self, channel: &str) -> bool {
        channel.starts_with(ACTUATOR_GET_ROOT)
    }

    pub fn is_configuration_set(&self, channel: &str) -> bool {
        channel.starts_with(CONFIGURATION_SET_ROOT)
    }

    pub fn is_configuration_get(&self, channel: &str) -> bool {
        channel.starts_with(CONFIGURATION_GET_ROOT)
    }

    pub fn parse_actuator_set(&self, message: &Message) -> Option<ActuatorSetCommand> {
        let reference = reference_from_channel(&message.channel);
        if reference.is_empty() {
            warn!(LOG_TAG, "actuator set without reference: {}", message.channel);
            return None;
        }
        let dto: ActuatorSetDto = match serde_json::from_str(&message.payload) {
            Ok(dto) => dto,
            Err(e) => {
                warn!(LOG_TAG, "cannot parse actuator set payload: {}", e);
                return None;
            }
        };
        Some(ActuatorSetCommand {
            reference,
            value: dto.value,
        })
    }

    pub fn parse_actuator_get(&self, message: &Message) -> Option<ActuatorGetCommand> {
        let reference = reference_from_channel(&message.channel);
        if reference.is_empty() {
            warn!(LOG_TAG, "actuator get without reference: {}", message.channel);
            return None;
        }
        Some(ActuatorGetCommand { reference })
    }

    pub fn parse_configuration_set(&self, message: &Message) -> Option<Vec<ConfigurationItem>> {
        let dto: ConfigurationDto = match serde_json::from_str(&message.payload) {
            Ok(dto) => dto,
            Err(e) => {
                warn!(LOG_TAG, "cannot parse configuration set payload: {}", e);
                return None;
            }
        };
        Some(
            dto.values
                .into_iter()
                .map(|(reference, joined)| ConfigurationItem {
                    reference,
                    values: split_values(&joined),
                })
                .collect(),
        )
    }

    pub fn make_sensor_reading_message(
        &self,
        device_key: &str,
        reference: &str,
        readings: &[SensorReading],
    ) -> Option<Message> {
        if readings.is_empty() {
            return None;
        }
        let dtos: Vec<ReadingDto> = readings
            .iter()
            .map(|reading| ReadingDto {
                utc: reading.rtc,
                data: reading.values.join(MULTI_VALUE_DELIMITER),
            })
            .collect();
        let payload = match serde_json::to_string(&dtos) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(LOG_TAG, "cannot serialize sensor readings: {}", e);
                return None;
            }
        };
        Some(Message::new(
            format!("{}{}/r/{}", SENSOR_READING_ROOT, device_key, reference),
            payload,
        ))
    }

    pub fn parse_sensor_reading_message(
        &self,
        message: &Message,
    ) -> Option<(String, Vec<SensorReading>)> {
        let reference = reference_from_channel(&message.channel);
        let device_key = device_key_from_channel(&message.channel);
        if reference.is_empty() || device_key.is_empty() {
            return None;
        }
        let dtos: Vec<ReadingDto> = serde_json::from_str(&message.payload).ok()?;
        Some((
            device_key,
            dtos.into_iter()
                .map(|dto| SensorReading {
                    reference: reference.clone(),
                    values: split_values(&dto.data),
                    rtc: dto.utc,
                })
                .collect(),
        ))
    }

    pub fn make_alarm_message(
        &self,
        device_key: &str,
        reference: &str,
        alarms: &[Alarm],
    ) -> Option<Message> {
        if alarms.is_empty() {
            return None;
        }
        let dtos: Vec<AlarmDto> = alarms
            .iter()
            .map(|alarm| AlarmDto {
                utc: alarm.rtc,
                active: alarm.active,
            })
            .collect();
        let payload = match serde_json::to_string(&dtos) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(LOG_TAG, "cannot serialize alarms: {}", e);
                return None;
            }
        };
        Some(Message::new(
            format!("{}{}/r/{}", EVENTS_ROOT, device_key, reference),
            payload,
        ))
    }

    pub fn parse_alarm_message(&self, message: &Message) -> Option<(String, Vec<Alarm>)> {
        let reference = reference_from_channel(&message.channel);
        let device_key = device_key_from_channel(&message.channel);
        if reference.is_empty() || device_key.is_empty() {
            return None;
        }
        let dtos: Vec<AlarmDto> = serde_json::from_str(&message.payload).ok()?;
        Some((
            device_key,
            dtos.into_iter()
                .map(|dto| Alarm {
                    reference: reference.clone(),
                    active: dto.active,
                    rtc: dto.utc,
                })
                .collect(),
        ))
    }

    pub fn make_actuator_status_message(
        &self,
        device_key: &str,
        status: &ActuatorStatus,
    ) -> Option<Message> {
        if status.reference.is_empty() {
            warn!(LOG_TAG, "actuator status without reference dropped");
            return None;
        }
        let dto = ActuatorStatusDto {
            status: status.state,
            value: status.value.clone(),
        };
        let payload = match serde_json::to_string(&dto) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(LOG_TAG, "cannot serialize actuator status: {}", e);
                return None;
            }
        };
        Some(Message::new(
            format!(
                "{}{}/r/{}",
                ACTUATOR_STATUS_ROOT, device_key, status.reference
            ),
            payload,
        ))
    }

    pub fn parse_actuator_status_message(&self, message: &Message) -> Option<ActuatorStatus> {
        let reference = reference_from_channel(&message.channel);
        if reference.is_empty() {
            return None;
        }
        let dto: ActuatorStatusDto = serde_json::from_str(&message.payload).ok()?;
        Some(ActuatorStatus {
            reference,
            value: dto.value,
            state: dto.status,
        })
    }

    pub fn make_configuration_message(
        &self,
        device_key: &str,
        snapshot: &ConfigurationSnapshot,
    ) -> Option<Message> {
        let mut values = BTreeMap::new();
        for item in &snapshot.items {
            values.insert(
                item.reference.clone(),
                item.values.join(MULTI_VALUE_DELIMITER),
            );
        }
        let payload = match serde_json::to_string(&ConfigurationDto { values }) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(LOG_TAG, "cannot serialize configuration snapshot: {}", e);
                return None;
            }
        };
        Some(Message::new(
            format!("{}{}", CONFIGURATION_ROOT, device_key),
            payload,
        ))
    }

    pub fn parse_configuration_message(&self, message: &Message) -> Option<ConfigurationSnapshot> {
        let dto: ConfigurationDto = serde_json::from_str(&message.payload).ok()?;
        Some(ConfigurationSnapshot {
            items: dto
                .values
                .into_iter()
                .map(|(reference, joined)| ConfigurationItem {
                    reference,
                    values: split_values(&joined),
                })
                .collect(),
        })
    }
}

fn split_values(joined: &str) -> Vec<String> {
    joined
        .split(MULTI_VALUE_DELIMITER)
        .map(|value| value.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_channels_for_device() {
        let protocol = DataProtocol;
        let channels = protocol.inbound_channels_for_device("DEVICE_KEY_1");
        assert!(channels.contains(&"p2d/actuator_set/d/DEVICE_KEY_1/r/+".to_string()));
        assert!(channels.contains(&"p2d/configuration_get/d/DEVICE_KEY_1".to_string()));
        assert!(protocol.inbound_channels().is_empty());
    }

    #[test]
    fn test_sensor_reading_message_shape() {
        let protocol = DataProtocol;
        let readings = vec![SensorReading {
            reference: "T".to_string(),
            values: vec!["25.6".to_string()],
            rtc: 1609459200000,
        }];
        let message = protocol
            .make_sensor_reading_message("DEVICE_KEY_1", "T", &readings)
            .unwrap();
        assert_eq!(message.channel, "d2p/sensor_reading/d/DEVICE_KEY_1/r/T");
        assert_eq!(message.payload, r#"[{"utc":1609459200000,"data":"25.6"}]"#);
    }

    #[test]
    fn test_multi_value_reading_joined_with_space() {
        let protocol = DataProtocol;
        let readings = vec![SensorReading {
            reference: "ACL".to_string(),
            values: vec!["0".to_string(), "-5".to_string(), "10".to_string()],
            rtc: 7,
        }];
        let message = protocol
            .make_sensor_reading_message("DEVICE_KEY_2", "ACL", &readings)
            .unwrap();
        assert!(message.payload.contains(r#""data":"0 -5 10""#));
    }

    // encode 后 parse 还原为同一读数
    #[test]
    fn test_sensor_reading_round_trip() {
        let protocol = DataProtocol;
        let readings = vec![
            SensorReading {
                reference: "T".to_string(),
                values: vec!["25.6".to_string()],
                rtc: 1000,
            },
            SensorReading {
                reference: "T".to_string(),
                values: vec!["26.1".to_string()],
                rtc: 2000,
            },
        ];
        let message = protocol
            .make_sensor_reading_message("D1", "T", &readings)
            .unwrap();
        let (device_key, parsed) = protocol.parse_sensor_reading_message(&message).unwrap();
        assert_eq!(device_key, "D1");
        assert_eq!(parsed, readings);
    }

    #[test]
    fn test_alarm_round_trip() {
        let protocol = DataProtocol;
        let alarms = vec![Alarm {
            reference: "HIGH".to_string(),
            active: true,
            rtc: 123,
        }];
        let message = protocol.make_alarm_message("D1", "HIGH", &alarms).unwrap();
        assert_eq!(message.channel, "d2p/events/d/D1/r/HIGH");
        let (device_key, parsed) = protocol.parse_alarm_message(&message).unwrap();
        assert_eq!(device_key, "D1");
        assert_eq!(parsed, alarms);
    }

    #[test]
    fn test_actuator_status_round_trip() {
        let protocol = DataProtocol;
        let status = ActuatorStatus {
            reference: "SW".to_string(),
            value: "true".to_string(),
            state: ActuatorState::Ready,
        };
        let message = protocol.make_actuator_status_message("D1", &status).unwrap();
        assert_eq!(message.channel, "d2p/actuator_status/d/D1/r/SW");
        assert_eq!(message.payload, r#"{"status":"READY","value":"true"}"#);
        assert_eq!(protocol.parse_actuator_status_message(&message), Some(status));
    }

    #[test]
    fn test_configuration_round_trip() {
        let protocol = DataProtocol;
        let snapshot = ConfigurationSnapshot {
            items: vec![
                ConfigurationItem::new("CI1", vec!["60".to_string()]),
                ConfigurationItem::new("CI2", vec!["a".to_string(), "b".to_string()]),
            ],
        };
        let message = protocol.make_configuration_message("D1", &snapshot).unwrap();
        assert_eq!(message.channel, "d2p/configuration_get/d/D1");
        assert_eq!(protocol.parse_configuration_message(&message), Some(snapshot));
    }

    #[test]
    fn test_parse_actuator_set() {
        let protocol = DataProtocol;
        let message = Message::new("p2d/actuator_set/d/DEVICE_KEY_1/r/SW", r#"{"value":"true"}"#);
        assert!(protocol.is_actuator_set(&message.channel));
        let command = protocol.parse_actuator_set(&message).unwrap();
        assert_eq!(command.reference, "SW");
        assert_eq!(command.value, "true");
    }

    #[test]
    fn test_parse_actuator_set_rejects_bad_payload() {
        let protocol = DataProtocol;
        let message = Message::new("p2d/actuator_set/d/D1/r/SW", "not json");
        assert!(protocol.parse_actuator_set(&message).is_none());
    }

    #[test]
    fn test_parse_configuration_set() {
        let protocol = DataProtocol;
        let message = Message::new(
            "p2d/configuration_set/d/D1",
            r#"{"values":{"CI1":"60","CI2":"a b"}}"#,
        );
        assert!(protocol.is_configuration_set(&message.channel));
        let items = protocol.parse_configuration_set(&message).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].reference, "CI1");
        assert_eq!(items[1].values, vec!["a", "b"]);
    }

    // 空读数批次不产生消息
    #[test]
    fn test_empty_batch_is_dropped() {
        let protocol = DataProtocol;
        assert!(protocol.make_sensor_reading_message("D1", "T", &[]).is_none());
        assert!(protocol.make_alarm_message("D1", "HIGH", &[]).is_none());
    }
}
