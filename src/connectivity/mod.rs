//! 连接服务接口
//! 将底层 mqtt 客户端抽象为 connect / publish / last-will 能力，
//! 回调通过 ConnectivityListener 反向送入模块

use std::sync::Arc;

use crate::common::error::ModuleError;
use crate::entity::message::Message;

pub mod mqtt;

pub use mqtt::MqttConnectivityService;

/// 连接事件的接收方；由模块核心的 facade 实现
pub trait ConnectivityListener: Send + Sync {
    fn message_received(&self, channel: &str, payload: &str);
    fn connection_lost(&self);
    /// 当前应订阅的通道全集
    fn channels(&self) -> Vec<String>;
}

pub trait ConnectivityService: Send + Sync {
    /// 建立连接并订阅 listener 声明的通道全集
    fn connect(&self) -> Result<(), ModuleError>;
    fn disconnect(&self);
    /// 断开重连，用于设备集合变化后刷新订阅
    fn reconnect(&self) -> Result<(), ModuleError>;
    /// 发布一条消息，返回是否成功；失败的消息留在持久化存储中等待重试
    fn publish(&self, message: &Message) -> bool;
    /// 设置遗嘱消息，在下一次建立连接时生效
    fn set_last_will(&self, message: Message);
    fn set_listener(&self, listener: Arc<dyn ConnectivityListener>);
}
