//! firmware update service
//! runs the per-device install / abort flow against the user installer and
//! emits status and version messages

use std::sync::Arc;

use crate::api::{FirmwareInstaller, FirmwareVersionProvider};
use crate::common::buffer::CommandSender;
use crate::connectivity::ConnectivityService;
use crate::entity::firmware::{FirmwareUpdateStatus, FirmwareVersion};
use crate::entity::message::Message;
use crate::module::ModuleCore;
use crate::protocol::FirmwareUpdateProtocol;
use crate::router::MessageListener;
use crate::{info, warn};

const LOG_TAG: &str = "firmware_service";

pub struct FirmwareUpdateService {
    protocol: Arc<FirmwareUpdateProtocol>,
    installer: Arc<dyn FirmwareInstaller>,
    version_provider: Arc<dyn FirmwareVersionProvider>,
    connectivity: Arc<dyn ConnectivityService>,
    command: CommandSender<ModuleCore>,
}

impl FirmwareUpdateService {
    pub fn new(
        protocol: Arc<FirmwareUpdateProtocol>,
        installer: Arc<dyn FirmwareInstaller>,
        version_provider: Arc<dyn FirmwareVersionProvider>,
        connectivity: Arc<dyn ConnectivityService>,
        command: CommandSender<ModuleCore>,
    ) -> Self {
        FirmwareUpdateService {
            protocol,
            installer,
            version_provider,
            connectivity,
            command,
        }
    }

    pub fn firmware_version(&self, device_key: &str) -> String {
        self.version_provider.firmware_version(device_key)
    }

    pub fn send_status(&self, device_key: &str, status: FirmwareUpdateStatus) {
        let Some(message) = self.protocol.make_status_message(device_key, &status) else {
            warn!(LOG_TAG, "failed to create firmware update status message");
            return;
        };
        if !self.connectivity.publish(&message) {
            warn!(
                LOG_TAG,
                "firmware update status not published for device: {}", device_key
            );
        }
    }

    pub fn publish_version(&self, device_key: &str, version: &str) {
        let Some(message) = self.protocol.make_version_message(&FirmwareVersion {
            device_key: device_key.to_string(),
            version: version.to_string(),
        }) else {
            warn!(LOG_TAG, "failed to create firmware version message");
            return;
        };
        if !self.connectivity.publish(&message) {
            warn!(
                LOG_TAG,
                "firmware version not published for device: {}", device_key
            );
        }
    }

    /// 调用用户安装器；完成回调经由命令缓冲回到模块核心
    pub fn install(&self, device_key: &str, firmware_file: &str) {
        let success_sender = self.command.clone();
        let fail_sender = self.command.clone();
        self.installer.install(
            device_key,
            firmware_file,
            Box::new(move |key: String| {
                success_sender.push(move |core| core.firmware_install_succeeded(&key));
            }),
            Box::new(move |key: String| {
                fail_sender.push(move |core| core.firmware_install_failed(&key));
            }),
        );
    }

    pub fn abort(&self, device_key: &str) -> bool {
        info!(
            LOG_TAG,
            "abort firmware installation for device: {}", device_key
        );
        self.installer.abort(device_key)
    }
}

impl MessageListener for FirmwareUpdateService {
    fn message_received(&self, message: &Message) {
        if self.protocol.is_firmware_install(&message.channel) {
            let Some(command) = self.protocol.parse_install(message) else {
                warn!(
                    LOG_TAG,
                    "unable to parse message, channel: {}, content: {}",
                    message.channel,
                    message.payload
                );
                return;
            };
            self.command
                .push(move |core| core.handle_firmware_install(command));
        } else if self.protocol.is_firmware_abort(&message.channel) {
            let Some(command) = self.protocol.parse_abort(message) else {
                warn!(
                    LOG_TAG,
                    "unable to parse message, channel: {}, content: {}",
                    message.channel,
                    message.payload
                );
                return;
            };
            self.command
                .push(move |core| core.handle_firmware_abort(command));
        } else {
            warn!(
                LOG_TAG,
                "unable to classify message channel: {}", message.channel
            );
        }
    }
}
