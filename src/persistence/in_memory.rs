//! 内存持久化实现（默认实现）

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::entity::reading::{ActuatorStatus, Alarm, ConfigurationSnapshot, SensorReading};
use crate::persistence::Persistence;

/// 先进先出队列表，key 保持首次写入顺序
struct QueueMap<T> {
    order: Vec<String>,
    items: HashMap<String, VecDeque<T>>,
}

impl<T: Clone> QueueMap<T> {
    fn new() -> Self {
        QueueMap {
            order: Vec::new(),
            items: HashMap::new(),
        }
    }

    fn put(&mut self, key: &str, item: T) {
        if !self.items.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.items.entry(key.to_string()).or_default().push_back(item);
    }

    fn front(&self, key: &str, count: usize) -> Vec<T> {
        match self.items.get(key) {
            Some(queue) => queue.iter().take(count).cloned().collect(),
            None => Vec::new(),
        }
    }

    fn remove(&mut self, key: &str, count: usize) {
        let emptied = match self.items.get_mut(key) {
            Some(queue) => {
                for _ in 0..count {
                    if queue.pop_front().is_none() {
                        break;
                    }
                }
                queue.is_empty()
            }
            None => return,
        };
        if emptied {
            self.items.remove(key);
            self.order.retain(|k| k != key);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.order.clone()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// 单值槽位表，同 key 覆盖写入，key 保持首次写入顺序
struct SlotMap<T> {
    order: Vec<String>,
    items: HashMap<String, T>,
}

impl<T: Clone> SlotMap<T> {
    fn new() -> Self {
        SlotMap {
            order: Vec::new(),
            items: HashMap::new(),
        }
    }

    fn put(&mut self, key: &str, item: T) {
        if self.items.insert(key.to_string(), item).is_none() {
            self.order.push(key.to_string());
        }
    }

    fn get(&self, key: &str) -> Option<T> {
        self.items.get(key).cloned()
    }

    fn remove(&mut self, key: &str) {
        if self.items.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.order.clone()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct InMemoryPersistence {
    readings: Mutex<QueueMap<SensorReading>>,
    alarms: Mutex<QueueMap<Alarm>>,
    actuator_statuses: Mutex<SlotMap<ActuatorStatus>>,
    configurations: Mutex<SlotMap<ConfigurationSnapshot>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        InMemoryPersistence {
            readings: Mutex::new(QueueMap::new()),
            alarms: Mutex::new(QueueMap::new()),
            actuator_statuses: Mutex::new(SlotMap::new()),
            configurations: Mutex::new(SlotMap::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl Persistence for InMemoryPersistence {
    fn put_sensor_reading(&self, key: &str, reading: SensorReading) {
        self.readings.lock().unwrap().put(key, reading);
    }

    fn sensor_readings(&self, key: &str, count: usize) -> Vec<SensorReading> {
        self.readings.lock().unwrap().front(key, count)
    }

    fn remove_sensor_readings(&self, key: &str, count: usize) {
        self.readings.lock().unwrap().remove(key, count);
    }

    fn sensor_readings_keys(&self) -> Vec<String> {
        self.readings.lock().unwrap().keys()
    }

    fn put_alarm(&self, key: &str, alarm: Alarm) {
        self.alarms.lock().unwrap().put(key, alarm);
    }

    fn alarms(&self, key: &str, count: usize) -> Vec<Alarm> {
        self.alarms.lock().unwrap().front(key, count)
    }

    fn remove_alarms(&self, key: &str, count: usize) {
        self.alarms.lock().unwrap().remove(key, count);
    }

    fn alarms_keys(&self) -> Vec<String> {
        self.alarms.lock().unwrap().keys()
    }

    fn put_actuator_status(&self, key: &str, status: ActuatorStatus) {
        self.actuator_statuses.lock().unwrap().put(key, status);
    }

    fn actuator_status(&self, key: &str) -> Option<ActuatorStatus> {
        self.actuator_statuses.lock().unwrap().get(key)
    }

    fn remove_actuator_status(&self, key: &str) {
        self.actuator_statuses.lock().unwrap().remove(key);
    }

    fn actuator_statuses_keys(&self) -> Vec<String> {
        self.actuator_statuses.lock().unwrap().keys()
    }

    fn put_configuration(&self, key: &str, configuration: ConfigurationSnapshot) {
        self.configurations.lock().unwrap().put(key, configuration);
    }

    fn configuration(&self, key: &str) -> Option<ConfigurationSnapshot> {
        self.configurations.lock().unwrap().get(key)
    }

    fn remove_configuration(&self, key: &str) {
        self.configurations.lock().unwrap().remove(key);
    }

    fn configurations_keys(&self) -> Vec<String> {
        self.configurations.lock().unwrap().keys()
    }

    fn is_empty(&self) -> bool {
        self.readings.lock().unwrap().is_empty()
            && self.alarms.lock().unwrap().is_empty()
            && self.actuator_statuses.lock().unwrap().is_empty()
            && self.configurations.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::reading::ActuatorState;

    fn reading(value: &str) -> SensorReading {
        SensorReading {
            reference: "T".to_string(),
            values: vec![value.to_string()],
            rtc: 1,
        }
    }

    // 同一 key 内保持先进先出
    #[test]
    fn test_readings_fifo_within_key() {
        let persistence = InMemoryPersistence::new();
        for value in ["1", "2", "3"] {
            persistence.put_sensor_reading("DEVICE_KEY_1+T", reading(value));
        }

        let front = persistence.sensor_readings("DEVICE_KEY_1+T", 2);
        assert_eq!(front.len(), 2);
        assert_eq!(front[0].values, vec!["1"]);
        assert_eq!(front[1].values, vec!["2"]);

        persistence.remove_sensor_readings("DEVICE_KEY_1+T", 2);
        let rest = persistence.sensor_readings("DEVICE_KEY_1+T", 10);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].values, vec!["3"]);
    }

    // key 按首次写入顺序返回，弹空后消失
    #[test]
    fn test_keys_in_insertion_order() {
        let persistence = InMemoryPersistence::new();
        persistence.put_sensor_reading("D2+T", reading("1"));
        persistence.put_sensor_reading("D1+T", reading("1"));
        persistence.put_sensor_reading("D2+T", reading("2"));
        assert_eq!(persistence.sensor_readings_keys(), vec!["D2+T", "D1+T"]);

        persistence.remove_sensor_readings("D2+T", 10);
        assert_eq!(persistence.sensor_readings_keys(), vec!["D1+T"]);
    }

    // 执行器状态覆盖写入
    #[test]
    fn test_actuator_status_replace_on_put() {
        let persistence = InMemoryPersistence::new();
        let mut status = ActuatorStatus::new("1", ActuatorState::Busy);
        status.reference = "SW".to_string();
        persistence.put_actuator_status("D1+SW", status.clone());
        status.value = "2".to_string();
        status.state = ActuatorState::Ready;
        persistence.put_actuator_status("D1+SW", status);

        let stored = persistence.actuator_status("D1+SW").unwrap();
        assert_eq!(stored.value, "2");
        assert_eq!(stored.state, ActuatorState::Ready);
        assert_eq!(persistence.actuator_statuses_keys(), vec!["D1+SW"]);
    }

    #[test]
    fn test_is_empty_covers_all_stores() {
        let persistence = InMemoryPersistence::new();
        assert!(persistence.is_empty());

        persistence.put_alarm(
            "D1+HIGH",
            Alarm {
                reference: "HIGH".to_string(),
                active: true,
                rtc: 5,
            },
        );
        assert!(!persistence.is_empty());

        persistence.remove_alarms("D1+HIGH", 1);
        assert!(persistence.is_empty());
    }

    // remove 超过队列长度不报错
    #[test]
    fn test_remove_more_than_present() {
        let persistence = InMemoryPersistence::new();
        persistence.put_sensor_reading("D1+T", reading("1"));
        persistence.remove_sensor_readings("D1+T", 50);
        assert!(persistence.sensor_readings_keys().is_empty());
        persistence.remove_sensor_readings("UNKNOWN+T", 50);
    }
}
