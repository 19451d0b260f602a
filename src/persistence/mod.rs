//! 持久化存储接口
//!
//! 功能
//! - 以复合 key ("<deviceKey>+<reference>") 保存待发送的读数、报警、执行器状态、配置快照
//! - put 全量接受，永不拒绝；remove 从队头按先进先出弹出
//! - keys 按首次写入顺序返回未清空的 key
//! - 实现须容忍多生产者与单一消费者并发访问

use crate::entity::reading::{ActuatorStatus, Alarm, ConfigurationSnapshot, SensorReading};

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryPersistence;
pub use sqlite::SqlitePersistence;

pub trait Persistence: Send + Sync {
    fn put_sensor_reading(&self, key: &str, reading: SensorReading);
    /// 取队头最多 count 条，不移除
    fn sensor_readings(&self, key: &str, count: usize) -> Vec<SensorReading>;
    /// 从队头移除最多 count 条
    fn remove_sensor_readings(&self, key: &str, count: usize);
    fn sensor_readings_keys(&self) -> Vec<String>;

    fn put_alarm(&self, key: &str, alarm: Alarm);
    fn alarms(&self, key: &str, count: usize) -> Vec<Alarm>;
    fn remove_alarms(&self, key: &str, count: usize);
    fn alarms_keys(&self) -> Vec<String>;

    /// 执行器状态为瞬时值，同 key 覆盖写入
    fn put_actuator_status(&self, key: &str, status: ActuatorStatus);
    fn actuator_status(&self, key: &str) -> Option<ActuatorStatus>;
    fn remove_actuator_status(&self, key: &str);
    fn actuator_statuses_keys(&self) -> Vec<String>;

    /// 配置快照以设备 key 保存，同 key 覆盖写入
    fn put_configuration(&self, key: &str, configuration: ConfigurationSnapshot);
    fn configuration(&self, key: &str) -> Option<ConfigurationSnapshot>;
    fn remove_configuration(&self, key: &str);
    fn configurations_keys(&self) -> Vec<String>;

    fn is_empty(&self) -> bool;
}
