//! 上行队列实体：读数、报警、执行器状态、配置快照

use serde::{Deserialize, Serialize};

/// 传感器读数
/// 多值读数按采集顺序保存；rtc 为 epoch 毫秒，入口处为 0 表示以当前时间打点
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub reference: String,
    pub values: Vec<String>,
    pub rtc: u64,
}

/// 报警事件
#[derive(Debug, Clone, PartialEq)]
pub struct Alarm {
    pub reference: String,
    pub active: bool,
    pub rtc: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActuatorState {
    Ready,
    Busy,
    Error,
}

impl ActuatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActuatorState::Ready => "READY",
            ActuatorState::Busy => "BUSY",
            ActuatorState::Error => "ERROR",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "READY" => Some(ActuatorState::Ready),
            "BUSY" => Some(ActuatorState::Busy),
            "ERROR" => Some(ActuatorState::Error),
            _ => None,
        }
    }
}

/// 执行器状态；同一 (设备, reference) 只保留最新一条
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorStatus {
    pub reference: String,
    pub value: String,
    pub state: ActuatorState,
}

impl ActuatorStatus {
    pub fn new(value: impl Into<String>, state: ActuatorState) -> Self {
        ActuatorStatus {
            reference: String::new(),
            value: value.into(),
            state,
        }
    }
}

/// 单个配置项的当前取值
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationItem {
    pub reference: String,
    pub values: Vec<String>,
}

impl ConfigurationItem {
    pub fn new(reference: impl Into<String>, values: Vec<String>) -> Self {
        ConfigurationItem {
            reference: reference.into(),
            values,
        }
    }
}

/// 设备配置快照；每设备只保留最新一份
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigurationSnapshot {
    pub items: Vec<ConfigurationItem>,
}

/// 平台下发的执行器写入命令
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorSetCommand {
    pub reference: String,
    pub value: String,
}

/// 平台下发的执行器读取命令
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorGetCommand {
    pub reference: String,
}

/// 读数取值在入口处统一转为字符串，管线内只携带字符串
pub trait ReadingValue {
    fn into_reading_string(self) -> String;
}

impl ReadingValue for bool {
    fn into_reading_string(self) -> String {
        if self {
            "true".to_string()
        } else {
            "false".to_string()
        }
    }
}

impl ReadingValue for String {
    fn into_reading_string(self) -> String {
        self
    }
}

impl ReadingValue for &str {
    fn into_reading_string(self) -> String {
        self.to_string()
    }
}

macro_rules! impl_reading_value_for_numeric {
    ($($t:ty),*) => {
        $(
            impl ReadingValue for $t {
                fn into_reading_string(self) -> String {
                    format!("{}", self)
                }
            }
        )*
    };
}

impl_reading_value_for_numeric!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
