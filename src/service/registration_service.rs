//! registration service
//! publishes subdevice registration and template update requests,
//! routes platform responses into the module core

use std::sync::Arc;

use crate::common::buffer::CommandSender;
use crate::connectivity::ConnectivityService;
use crate::entity::device::Subdevice;
use crate::entity::message::Message;
use crate::entity::registration::SubdeviceUpdateRequest;
use crate::module::ModuleCore;
use crate::protocol::RegistrationProtocol;
use crate::router::MessageListener;
use crate::{error, info, warn};

const LOG_TAG: &str = "registration_service";

pub struct DeviceRegistrationService {
    protocol: Arc<RegistrationProtocol>,
    connectivity: Arc<dyn ConnectivityService>,
    command: CommandSender<ModuleCore>,
}

impl DeviceRegistrationService {
    pub fn new(
        protocol: Arc<RegistrationProtocol>,
        connectivity: Arc<dyn ConnectivityService>,
        command: CommandSender<ModuleCore>,
    ) -> Self {
        DeviceRegistrationService {
            protocol,
            connectivity,
            command,
        }
    }

    pub fn publish_registration_request(&self, device: &Subdevice) {
        let Some(message) = self.protocol.make_registration_message(device) else {
            return;
        };
        if !self.connectivity.publish(&message) {
            info!(
                LOG_TAG,
                "registration request not published for device: {}", device.key
            );
        }
    }

    pub fn publish_update_request(&self, request: &SubdeviceUpdateRequest) {
        let Some(message) = self.protocol.make_update_message(request) else {
            return;
        };
        if !self.connectivity.publish(&message) {
            info!(
                LOG_TAG,
                "update request not published for device: {}", request.device_key
            );
        }
    }
}

impl MessageListener for DeviceRegistrationService {
    fn message_received(&self, message: &Message) {
        if self.protocol.is_registration_response(&message.channel) {
            let Some(response) = self.protocol.parse_response(message) else {
                error!(
                    LOG_TAG,
                    "registration response could not be deserialized, channel: {}, payload: {}",
                    message.channel,
                    message.payload
                );
                return;
            };
            self.command
                .push(move |core| core.handle_registration_response(response));
        } else if self.protocol.is_update_response(&message.channel) {
            let Some(response) = self.protocol.parse_response(message) else {
                error!(
                    LOG_TAG,
                    "update response could not be deserialized, channel: {}, payload: {}",
                    message.channel,
                    message.payload
                );
                return;
            };
            self.command
                .push(move |core| core.handle_update_response(response));
        } else {
            warn!(
                LOG_TAG,
                "unable to classify message channel: {}", message.channel
            );
        }
    }
}
