//! platform status protocol: gateway-to-platform connectivity broadcasts

use lazy_static::lazy_static;

use crate::entity::message::Message;
use crate::entity::status::PlatformConnectivityStatus;
use crate::error;
use crate::protocol::Protocol;

const LOG_TAG: &str = "platform_status_protocol";

/// 网关进程广播自身与云端连接状态的通道，载荷为单个单词
pub const PLATFORM_STATUS_CHANNEL: &str = "p2d/connection_status";

lazy_static! {
    static ref INBOUND_CHANNELS: Vec<String> = vec![PLATFORM_STATUS_CHANNEL.to_string()];
}

pub struct PlatformStatusProtocol;

impl Protocol for PlatformStatusProtocol {
    fn inbound_channels(&self) -> Vec<String> {
        INBOUND_CHANNELS.clone()
    }

    fn inbound_channels_for_device(&self, _device_key: &str) -> Vec<String> {
        Vec::new()
    }

    // 此协议的消息不携带设备 key
    fn extract_device_key(&self, _channel: &str) -> String {
        String::new()
    }
}

impl PlatformStatusProtocol {
    pub fn parse_platform_status(&self, message: &Message) -> Option<PlatformConnectivityStatus> {
        if message.channel != PLATFORM_STATUS_CHANNEL {
            error!(
                LOG_TAG,
                "unexpected channel for platform status: {}", message.channel
            );
            return None;
        }
        match PlatformConnectivityStatus::from_str(message.payload.trim()) {
            Some(status) => Some(status),
            None => {
                error!(
                    LOG_TAG,
                    "cannot parse platform status payload: {}", message.payload
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tokens() {
        let protocol = PlatformStatusProtocol;
        assert_eq!(
            protocol.parse_platform_status(&Message::new(PLATFORM_STATUS_CHANNEL, "CONNECTED")),
            Some(PlatformConnectivityStatus::Connected)
        );
        assert_eq!(
            protocol.parse_platform_status(&Message::new(PLATFORM_STATUS_CHANNEL, "OFFLINE")),
            Some(PlatformConnectivityStatus::Offline)
        );
    }

    #[test]
    fn test_parse_rejects_unknown_payload() {
        let protocol = PlatformStatusProtocol;
        assert!(protocol
            .parse_platform_status(&Message::new(PLATFORM_STATUS_CHANNEL, "RECONNECTING"))
            .is_none());
    }

    #[test]
    fn test_parse_rejects_wrong_channel() {
        let protocol = PlatformStatusProtocol;
        assert!(protocol
            .parse_platform_status(&Message::new("p2d/other", "CONNECTED"))
            .is_none());
    }

    #[test]
    fn test_channels() {
        let protocol = PlatformStatusProtocol;
        assert_eq!(
            protocol.inbound_channels(),
            vec![PLATFORM_STATUS_CHANNEL.to_string()]
        );
        assert!(protocol.inbound_channels_for_device("D1").is_empty());
        assert_eq!(protocol.extract_device_key(PLATFORM_STATUS_CHANNEL), "");
    }
}
