//! mqtt 通道协议族
//!
//! 通道约定
//! - 使用 '/' 分隔；方向前缀 d2p（模块发往平台侧）/ p2d（平台侧下发）
//! - 设备 key 紧跟 'd' 段，reference 紧跟 'r' 段
//! - key 提取是纯词法操作，与具体协议无关

pub mod data;
pub mod firmware;
pub mod platform_status;
pub mod registration;
pub mod status;

pub use data::DataProtocol;
pub use firmware::FirmwareUpdateProtocol;
pub use platform_status::PlatformStatusProtocol;
pub use registration::RegistrationProtocol;
pub use status::StatusProtocol;

pub const CHANNEL_DELIMITER: &str = "/";
pub const DEVICE_PATH_PREFIX: &str = "d";
pub const REFERENCE_PATH_PREFIX: &str = "r";
pub const DEVICE_TO_PLATFORM_DIRECTION: &str = "d2p";
pub const PLATFORM_TO_DEVICE_DIRECTION: &str = "p2d";
pub const CHANNEL_WILDCARD_SINGLE_LEVEL: &str = "+";
pub const CHANNEL_WILDCARD_MULTI_LEVEL: &str = "#";

/// 协议的公共能力：声明订阅通道、按词法提取设备 key
pub trait Protocol: Send + Sync {
    /// 与具体设备无关的静态订阅通道
    fn inbound_channels(&self) -> Vec<String>;
    /// 按设备 key 实例化的订阅通道
    fn inbound_channels_for_device(&self, device_key: &str) -> Vec<String>;
    /// 从通道中提取设备 key；通道不含 key 时返回空串
    fn extract_device_key(&self, channel: &str) -> String {
        device_key_from_channel(channel)
    }
}

/// 'd' 段之后的一段即设备 key
pub fn device_key_from_channel(channel: &str) -> String {
    segment_after(channel, DEVICE_PATH_PREFIX)
}

/// 'r' 段之后的一段即 reference
pub fn reference_from_channel(channel: &str) -> String {
    segment_after(channel, REFERENCE_PATH_PREFIX)
}

fn segment_after(channel: &str, marker: &str) -> String {
    let segments: Vec<&str> = channel.split(CHANNEL_DELIMITER).collect();
    segments
        .windows(2)
        .find(|pair| pair[0] == marker)
        .map(|pair| pair[1].to_string())
        .unwrap_or_default()
}

/// mqtt 通配符匹配：'+' 匹配单段，'#' 匹配其后全部段
pub fn channel_matches(pattern: &str, channel: &str) -> bool {
    if pattern == channel {
        return true;
    }

    let pattern_segments: Vec<&str> = pattern.split(CHANNEL_DELIMITER).collect();
    let channel_segments: Vec<&str> = channel.split(CHANNEL_DELIMITER).collect();

    let mut index = 0;
    for pattern_segment in &pattern_segments {
        if *pattern_segment == CHANNEL_WILDCARD_MULTI_LEVEL {
            return true;
        }
        if index >= channel_segments.len() {
            return false;
        }
        if *pattern_segment != CHANNEL_WILDCARD_SINGLE_LEVEL
            && *pattern_segment != channel_segments[index]
        {
            return false;
        }
        index += 1;
    }

    index == channel_segments.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_key_extraction_is_lexical() {
        assert_eq!(
            device_key_from_channel("d2p/sensor_reading/d/DEVICE_KEY_1/r/T"),
            "DEVICE_KEY_1"
        );
        assert_eq!(
            device_key_from_channel("p2d/configuration_set/d/DEVICE_KEY_2"),
            "DEVICE_KEY_2"
        );
        assert_eq!(device_key_from_channel("p2d/connection_status"), "");
        assert_eq!(device_key_from_channel(""), "");
    }

    #[test]
    fn test_reference_extraction() {
        assert_eq!(
            reference_from_channel("p2d/actuator_set/d/DEVICE_KEY_1/r/SW"),
            "SW"
        );
        assert_eq!(reference_from_channel("p2d/actuator_set/d/DEVICE_KEY_1"), "");
    }

    #[test]
    fn test_exact_channel_match() {
        assert!(channel_matches(
            "p2d/connection_status",
            "p2d/connection_status"
        ));
        assert!(!channel_matches(
            "p2d/connection_status",
            "p2d/connection_status/extra"
        ));
    }

    #[test]
    fn test_single_level_wildcard() {
        assert!(channel_matches(
            "p2d/actuator_set/d/D1/r/+",
            "p2d/actuator_set/d/D1/r/SW"
        ));
        assert!(!channel_matches(
            "p2d/actuator_set/d/D1/r/+",
            "p2d/actuator_set/d/D2/r/SW"
        ));
        assert!(!channel_matches(
            "p2d/actuator_set/d/D1/r/+",
            "p2d/actuator_set/d/D1"
        ));
    }

    #[test]
    fn test_multi_level_wildcard() {
        assert!(channel_matches("p2d/#", "p2d/actuator_set/d/D1/r/SW"));
        assert!(channel_matches(
            "p2d/register_subdevice/#",
            "p2d/register_subdevice/d/D1"
        ));
        assert!(!channel_matches("d2p/#", "p2d/actuator_set/d/D1/r/SW"));
    }
}
