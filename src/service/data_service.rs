//! data service
//! persists outbound telemetry and drains it in acknowledged batches;
//! dispatches inbound actuator / configuration commands into the module core

use std::sync::Arc;

use crate::common::buffer::CommandSender;
use crate::connectivity::ConnectivityService;
use crate::entity::message::Message;
use crate::entity::reading::{
    ActuatorState, ActuatorStatus, Alarm, ConfigurationItem, ConfigurationSnapshot, SensorReading,
};
use crate::module::ModuleCore;
use crate::persistence::Persistence;
use crate::protocol::{DataProtocol, Protocol};
use crate::router::MessageListener;
use crate::{error, warn};

const LOG_TAG: &str = "data_service";

/// 每次发布从单个队列弹出的最大条数
pub const PUBLISH_BATCH_ITEMS_COUNT: usize = 50;

/// 复合 key 分隔符；设备 key 与 reference 中均不允许出现
pub const PERSISTENCE_KEY_DELIMITER: &str = "+";

pub struct DataService {
    protocol: Arc<DataProtocol>,
    persistence: Arc<dyn Persistence>,
    connectivity: Arc<dyn ConnectivityService>,
    command: CommandSender<ModuleCore>,
}

impl DataService {
    pub fn new(
        protocol: Arc<DataProtocol>,
        persistence: Arc<dyn Persistence>,
        connectivity: Arc<dyn ConnectivityService>,
        command: CommandSender<ModuleCore>,
    ) -> Self {
        DataService {
            protocol,
            persistence,
            connectivity,
            command,
        }
    }

    pub fn make_persistence_key(device_key: &str, reference: &str) -> String {
        format!("{}{}{}", device_key, PERSISTENCE_KEY_DELIMITER, reference)
    }

    pub fn parse_persistence_key(key: &str) -> Option<(String, String)> {
        let (device_key, reference) = key.split_once(PERSISTENCE_KEY_DELIMITER)?;
        if device_key.is_empty() || reference.is_empty() {
            return None;
        }
        Some((device_key.to_string(), reference.to_string()))
    }

    fn key_matches_device(key: &str, device_filter: Option<&str>) -> bool {
        match device_filter {
            Some(device_key) => {
                key.starts_with(&format!("{}{}", device_key, PERSISTENCE_KEY_DELIMITER))
            }
            None => true,
        }
    }

    pub fn add_sensor_reading(
        &self,
        device_key: &str,
        reference: &str,
        values: Vec<String>,
        rtc: u64,
    ) {
        let reading = SensorReading {
            reference: reference.to_string(),
            values,
            rtc,
        };
        self.persistence
            .put_sensor_reading(&Self::make_persistence_key(device_key, reference), reading);
    }

    pub fn add_alarm(&self, device_key: &str, reference: &str, active: bool, rtc: u64) {
        let alarm = Alarm {
            reference: reference.to_string(),
            active,
            rtc,
        };
        self.persistence
            .put_alarm(&Self::make_persistence_key(device_key, reference), alarm);
    }

    pub fn add_actuator_status(
        &self,
        device_key: &str,
        reference: &str,
        value: &str,
        state: ActuatorState,
    ) {
        let status = ActuatorStatus {
            reference: reference.to_string(),
            value: value.to_string(),
            state,
        };
        self.persistence
            .put_actuator_status(&Self::make_persistence_key(device_key, reference), status);
    }

    pub fn add_configuration(&self, device_key: &str, items: Vec<ConfigurationItem>) {
        self.persistence
            .put_configuration(device_key, ConfigurationSnapshot { items });
    }

    /// 逐 key 批量发布；发布成功才从存储移除，失败的批次原样保留
    pub fn publish_sensor_readings(&self, device_filter: Option<&str>) {
        for key in self.persistence.sensor_readings_keys() {
            if !Self::key_matches_device(&key, device_filter) {
                continue;
            }
            let readings = self
                .persistence
                .sensor_readings(&key, PUBLISH_BATCH_ITEMS_COUNT);
            if readings.is_empty() {
                continue;
            }
            let Some((device_key, reference)) = Self::parse_persistence_key(&key) else {
                error!(LOG_TAG, "unable to parse persistence key: {}", key);
                continue;
            };
            let Some(message) =
                self.protocol
                    .make_sensor_reading_message(&device_key, &reference, &readings)
            else {
                error!(LOG_TAG, "unable to encode readings for key: {}", key);
                continue;
            };
            if self.connectivity.publish(&message) {
                self.persistence
                    .remove_sensor_readings(&key, PUBLISH_BATCH_ITEMS_COUNT);
            }
        }
    }

    pub fn publish_alarms(&self, device_filter: Option<&str>) {
        for key in self.persistence.alarms_keys() {
            if !Self::key_matches_device(&key, device_filter) {
                continue;
            }
            let alarms = self.persistence.alarms(&key, PUBLISH_BATCH_ITEMS_COUNT);
            if alarms.is_empty() {
                continue;
            }
            let Some((device_key, reference)) = Self::parse_persistence_key(&key) else {
                error!(LOG_TAG, "unable to parse persistence key: {}", key);
                continue;
            };
            let Some(message) = self
                .protocol
                .make_alarm_message(&device_key, &reference, &alarms)
            else {
                error!(LOG_TAG, "unable to encode alarms for key: {}", key);
                continue;
            };
            if self.connectivity.publish(&message) {
                self.persistence
                    .remove_alarms(&key, PUBLISH_BATCH_ITEMS_COUNT);
            }
        }
    }

    pub fn publish_actuator_statuses(&self, device_filter: Option<&str>) {
        for key in self.persistence.actuator_statuses_keys() {
            if !Self::key_matches_device(&key, device_filter) {
                continue;
            }
            let Some(status) = self.persistence.actuator_status(&key) else {
                continue;
            };
            let Some((device_key, _reference)) = Self::parse_persistence_key(&key) else {
                error!(LOG_TAG, "unable to parse persistence key: {}", key);
                continue;
            };
            let Some(message) = self
                .protocol
                .make_actuator_status_message(&device_key, &status)
            else {
                error!(LOG_TAG, "unable to encode actuator status for key: {}", key);
                continue;
            };
            if self.connectivity.publish(&message) {
                self.persistence.remove_actuator_status(&key);
            }
        }
    }

    pub fn publish_configuration(&self, device_filter: Option<&str>) {
        for key in self.persistence.configurations_keys() {
            if let Some(device_key) = device_filter {
                if key != device_key {
                    continue;
                }
            }
            let Some(snapshot) = self.persistence.configuration(&key) else {
                continue;
            };
            let Some(message) = self.protocol.make_configuration_message(&key, &snapshot) else {
                error!(LOG_TAG, "unable to encode configuration for device: {}", key);
                continue;
            };
            if self.connectivity.publish(&message) {
                self.persistence.remove_configuration(&key);
            }
        }
    }
}

impl MessageListener for DataService {
    fn message_received(&self, message: &Message) {
        let device_key = self.protocol.extract_device_key(&message.channel);
        if device_key.is_empty() {
            warn!(
                LOG_TAG,
                "unable to extract device key from channel: {}", message.channel
            );
            return;
        }

        if self.protocol.is_actuator_set(&message.channel) {
            let Some(command) = self.protocol.parse_actuator_set(message) else {
                warn!(LOG_TAG, "unable to parse message: {}", message.channel);
                return;
            };
            self.command.push(move |core| {
                core.handle_actuator_set(&device_key, &command.reference, &command.value)
            });
        } else if self.protocol.is_actuator_get(&message.channel) {
            let Some(command) = self.protocol.parse_actuator_get(message) else {
                warn!(LOG_TAG, "unable to parse message: {}", message.channel);
                return;
            };
            self.command
                .push(move |core| core.handle_actuator_get(&device_key, &command.reference));
        } else if self.protocol.is_configuration_set(&message.channel) {
            let Some(items) = self.protocol.parse_configuration_set(message) else {
                warn!(LOG_TAG, "unable to parse message: {}", message.channel);
                return;
            };
            self.command
                .push(move |core| core.handle_configuration_set(&device_key, items));
        } else if self.protocol.is_configuration_get(&message.channel) {
            self.command
                .push(move |core| core.handle_configuration_get(&device_key));
        } else {
            warn!(
                LOG_TAG,
                "unable to classify message channel: {}", message.channel
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_key_round_trip() {
        let key = DataService::make_persistence_key("DEVICE_KEY_1", "T");
        assert_eq!(key, "DEVICE_KEY_1+T");
        assert_eq!(
            DataService::parse_persistence_key(&key),
            Some(("DEVICE_KEY_1".to_string(), "T".to_string()))
        );
    }

    #[test]
    fn test_persistence_key_rejects_malformed() {
        assert!(DataService::parse_persistence_key("no-delimiter").is_none());
        assert!(DataService::parse_persistence_key("+REF").is_none());
        assert!(DataService::parse_persistence_key("KEY+").is_none());
    }

    #[test]
    fn test_key_matches_device_prefix() {
        assert!(DataService::key_matches_device("D1+T", Some("D1")));
        assert!(!DataService::key_matches_device("D10+T", Some("D1")));
        assert!(DataService::key_matches_device("D10+T", None));
    }
}
