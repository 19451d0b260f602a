//! inbound message router
//! get message from the bus connection, then dispatch it to every service
//! whose protocol declares a matching channel

use std::sync::{Arc, Mutex};

use crate::entity::message::Message;
use crate::protocol::{channel_matches, Protocol};
use crate::{debug, trace};

const LOG_TAG: &str = "router";

/// 订阅消息的接收方；由各个 service 实现
pub trait MessageListener: Send + Sync {
    fn message_received(&self, message: &Message);
}

struct Registration {
    protocol: Arc<dyn Protocol>,
    listener: Arc<dyn MessageListener>,
}

pub struct InboundMessageRouter {
    registrations: Mutex<Vec<Registration>>,
    device_keys: Mutex<Vec<String>>,
}

impl InboundMessageRouter {
    pub fn new() -> Self {
        InboundMessageRouter {
            registrations: Mutex::new(Vec::new()),
            device_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, protocol: Arc<dyn Protocol>, listener: Arc<dyn MessageListener>) {
        self.registrations
            .lock()
            .unwrap()
            .push(Registration { protocol, listener });
    }

    pub fn add_device_key(&self, device_key: &str) {
        let mut keys = self.device_keys.lock().unwrap();
        if !keys.iter().any(|key| key == device_key) {
            keys.push(device_key.to_string());
        }
    }

    pub fn remove_device_key(&self, device_key: &str) {
        self.device_keys.lock().unwrap().retain(|key| key != device_key);
    }

    /// 所有已注册协议的静态通道与按设备实例化通道的并集
    pub fn channels(&self) -> Vec<String> {
        let registrations = self.registrations.lock().unwrap();
        let device_keys = self.device_keys.lock().unwrap();

        let mut channels = Vec::new();
        for registration in registrations.iter() {
            for channel in registration.protocol.inbound_channels() {
                if !channels.contains(&channel) {
                    channels.push(channel);
                }
            }
            for key in device_keys.iter() {
                for channel in registration.protocol.inbound_channels_for_device(key) {
                    if !channels.contains(&channel) {
                        channels.push(channel);
                    }
                }
            }
        }
        channels
    }

    /// 将收到的消息分发给通道匹配的全部监听者；不做去重，监听者须幂等
    pub fn dispatch(&self, channel: &str, payload: &str) {
        trace!(LOG_TAG, "received message on {}", channel);
        let message = Message::new(channel, payload);

        let registrations = self.registrations.lock().unwrap();
        let device_keys = self.device_keys.lock().unwrap().clone();

        let mut delivered = false;
        for registration in registrations.iter() {
            let mut patterns = registration.protocol.inbound_channels();
            for key in device_keys.iter() {
                patterns.extend(registration.protocol.inbound_channels_for_device(key));
            }
            if patterns
                .iter()
                .any(|pattern| channel_matches(pattern, channel))
            {
                registration.listener.message_received(&message);
                delivered = true;
            }
        }
        if !delivered {
            debug!(LOG_TAG, "no listener for channel {}", channel);
        }
    }
}

impl Default for InboundMessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct StubProtocol;

    impl Protocol for StubProtocol {
        fn inbound_channels(&self) -> Vec<String> {
            vec!["p2d/static_channel".to_string()]
        }

        fn inbound_channels_for_device(&self, device_key: &str) -> Vec<String> {
            vec![format!("p2d/stub/d/{}/r/+", device_key)]
        }
    }

    struct RecordingListener {
        seen: StdMutex<Vec<String>>,
    }

    impl RecordingListener {
        fn new() -> Self {
            RecordingListener {
                seen: StdMutex::new(Vec::new()),
            }
        }
    }

    impl MessageListener for RecordingListener {
        fn message_received(&self, message: &Message) {
            self.seen.lock().unwrap().push(message.channel.clone());
        }
    }

    #[test]
    fn test_channels_union_includes_device_channels() {
        let router = InboundMessageRouter::new();
        router.register(Arc::new(StubProtocol), Arc::new(RecordingListener::new()));
        router.add_device_key("D1");
        router.add_device_key("D2");
        router.add_device_key("D1");

        let channels = router.channels();
        assert_eq!(channels.len(), 3);
        assert!(channels.contains(&"p2d/static_channel".to_string()));
        assert!(channels.contains(&"p2d/stub/d/D1/r/+".to_string()));
        assert!(channels.contains(&"p2d/stub/d/D2/r/+".to_string()));

        router.remove_device_key("D2");
        assert_eq!(router.channels().len(), 2);
    }

    #[test]
    fn test_dispatch_to_matching_listener() {
        let router = InboundMessageRouter::new();
        let listener = Arc::new(RecordingListener::new());
        router.register(Arc::new(StubProtocol), listener.clone());
        router.add_device_key("D1");

        router.dispatch("p2d/stub/d/D1/r/SW", "{}");
        router.dispatch("p2d/static_channel", "{}");
        router.dispatch("p2d/stub/d/UNKNOWN/r/SW", "{}");

        let seen = listener.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                "p2d/stub/d/D1/r/SW".to_string(),
                "p2d/static_channel".to_string()
            ]
        );
    }
}
