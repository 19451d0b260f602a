//! status service
//! publishes device status updates and responses, maintains the last-will
//! message, and routes inbound status requests into the module core

use std::sync::Arc;

use crate::common::buffer::CommandSender;
use crate::connectivity::ConnectivityService;
use crate::entity::message::Message;
use crate::entity::status::DeviceStatus;
use crate::module::ModuleCore;
use crate::protocol::{Protocol, StatusProtocol};
use crate::router::MessageListener;
use crate::{info, warn};

const LOG_TAG: &str = "status_service";

pub struct DeviceStatusService {
    protocol: Arc<StatusProtocol>,
    connectivity: Arc<dyn ConnectivityService>,
    command: CommandSender<ModuleCore>,
}

impl DeviceStatusService {
    pub fn new(
        protocol: Arc<StatusProtocol>,
        connectivity: Arc<dyn ConnectivityService>,
        command: CommandSender<ModuleCore>,
    ) -> Self {
        DeviceStatusService {
            protocol,
            connectivity,
            command,
        }
    }

    /// 主动上报，发送失败仅记录日志
    pub fn publish_device_status_update(&self, device_key: &str, status: DeviceStatus) {
        let Some(message) = self.protocol.make_status_update_message(device_key, status) else {
            return;
        };
        if !self.connectivity.publish(&message) {
            info!(LOG_TAG, "status not published for device: {}", device_key);
        }
    }

    /// 应答平台的状态查询
    pub fn publish_device_status_response(&self, device_key: &str, status: DeviceStatus) {
        let Some(message) = self
            .protocol
            .make_status_response_message(device_key, status)
        else {
            return;
        };
        if !self.connectivity.publish(&message) {
            info!(LOG_TAG, "status not published for device: {}", device_key);
        }
    }

    /// 设备集合变化时重建遗嘱消息，使异常断开时平台观察到全部子设备离线
    pub fn devices_updated(&self, device_keys: &[String]) {
        let Some(message) = self.protocol.make_last_will_message(device_keys) else {
            warn!(LOG_TAG, "unable to make last will message");
            return;
        };
        self.connectivity.set_last_will(message);
    }
}

impl MessageListener for DeviceStatusService {
    fn message_received(&self, message: &Message) {
        if self.protocol.is_status_request(&message.channel) {
            // 无设备 key 的查询表示对所有设备逐一上报
            let device_key = self.protocol.extract_device_key(&message.channel);
            self.command
                .push(move |core| core.handle_device_status_request(&device_key));
        } else {
            warn!(
                LOG_TAG,
                "unable to classify message channel: {}", message.channel
            );
        }
    }
}
