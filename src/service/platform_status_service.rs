//! platform status service
//! fans gateway-to-platform connectivity broadcasts out to the user listener

use std::sync::Arc;

use crate::api::PlatformStatusListener;
use crate::common::buffer::CommandSender;
use crate::entity::message::Message;
use crate::error;
use crate::module::ModuleCore;
use crate::protocol::PlatformStatusProtocol;
use crate::router::MessageListener;

const LOG_TAG: &str = "platform_status_service";

pub struct PlatformStatusService {
    protocol: Arc<PlatformStatusProtocol>,
    listener: Arc<dyn PlatformStatusListener>,
    command: CommandSender<ModuleCore>,
}

impl PlatformStatusService {
    pub fn new(
        protocol: Arc<PlatformStatusProtocol>,
        listener: Arc<dyn PlatformStatusListener>,
        command: CommandSender<ModuleCore>,
    ) -> Self {
        PlatformStatusService {
            protocol,
            listener,
            command,
        }
    }
}

impl MessageListener for PlatformStatusService {
    fn message_received(&self, message: &Message) {
        let Some(status) = self.protocol.parse_platform_status(message) else {
            error!(LOG_TAG, "failed to handle received message, not parsed");
            return;
        };
        // 经命令缓冲投递，保持与其它事件的先后次序
        let listener = self.listener.clone();
        self.command
            .push(move |_core| listener.platform_status(status));
    }
}
