//! MQTT 服务连接器

use std::sync::{Arc, Mutex};
use std::time::Duration;

use paho_mqtt;

use crate::common::error::{ErrorCode, ModuleError};
use crate::connectivity::{ConnectivityListener, ConnectivityService};
use crate::entity::message::Message;
use crate::{debug, error, info};

const LOG_TAG: &str = "mqtt";

const KEEP_ALIVE_SECS: u64 = 20;
const QOS: i32 = 0;

struct Inner {
    client: Option<paho_mqtt::AsyncClient>,
    listener: Option<Arc<dyn ConnectivityListener>>,
    last_will: Option<Message>,
}

pub struct MqttConnectivityService {
    /// 远程服务器地址，例如 tcp://localhost:1883
    uri: String,

    // client_id
    client_id: String,

    inner: Mutex<Inner>,
}

impl MqttConnectivityService {
    pub fn new(uri: &str, client_id: &str) -> Self {
        MqttConnectivityService {
            uri: uri.to_string(),
            client_id: client_id.to_string(),
            inner: Mutex::new(Inner {
                client: None,
                listener: None,
                last_will: None,
            }),
        }
    }

    fn do_connect(&self, inner: &mut Inner) -> Result<(), ModuleError> {
        let create_opts = paho_mqtt::CreateOptionsBuilder::new()
            .server_uri(self.uri.as_str())
            .client_id(self.client_id.as_str())
            .finalize();

        let client = paho_mqtt::AsyncClient::new(create_opts).map_err(|e| {
            ModuleError::new(
                ErrorCode::ConnectivityError,
                format!("cannot create mqtt client: {}", e),
            )
        })?;

        if let Some(listener) = inner.listener.clone() {
            let message_listener = listener.clone();
            client.set_message_callback(move |_cli, msg| {
                if let Some(msg) = msg {
                    message_listener.message_received(msg.topic(), &msg.payload_str());
                }
            });

            let loss_listener = listener;
            client.set_connection_lost_callback(move |_cli| {
                error!(LOG_TAG, "*** mqtt connection lost ***");
                loss_listener.connection_lost();
            });
        }

        let mut conn_builder = paho_mqtt::ConnectOptionsBuilder::new();
        conn_builder
            .keep_alive_interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .clean_session(true);
        if let Some(will) = &inner.last_will {
            conn_builder.will_message(paho_mqtt::Message::new(
                will.channel.as_str(),
                will.payload.as_str(),
                QOS,
            ));
        }

        if let Err(e) = client.connect(conn_builder.finalize()).wait() {
            error!(LOG_TAG, "cannot connect to mqtt server: {:?}", e);
            return Err(ModuleError::new(
                ErrorCode::ConnectivityError,
                format!("cannot connect to mqtt server: {}", e),
            ));
        }

        if let Some(listener) = &inner.listener {
            for channel in listener.channels() {
                if let Err(e) = client.subscribe(channel.as_str(), QOS).wait() {
                    error!(LOG_TAG, "mqtt subscribe failed for {}: {}", channel, e);
                }
            }
        }

        info!(LOG_TAG, "connected to mqtt server {}", self.uri);
        inner.client = Some(client);

        Ok(())
    }

    fn do_disconnect(&self, inner: &mut Inner) {
        if let Some(client) = inner.client.take() {
            let _ = client.disconnect(None).wait();
            debug!(LOG_TAG, "mqtt client disconnected");
        }
    }
}

impl ConnectivityService for MqttConnectivityService {
    fn connect(&self) -> Result<(), ModuleError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.client.is_some() {
            debug!(LOG_TAG, "already connected, reconnecting");
            self.do_disconnect(&mut inner);
        }
        self.do_connect(&mut inner)
    }

    fn disconnect(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.do_disconnect(&mut inner);
    }

    fn reconnect(&self) -> Result<(), ModuleError> {
        let mut inner = self.inner.lock().unwrap();
        self.do_disconnect(&mut inner);
        self.do_connect(&mut inner)
    }

    fn publish(&self, message: &Message) -> bool {
        let inner = self.inner.lock().unwrap();
        match &inner.client {
            Some(client) => {
                let msg = paho_mqtt::Message::new(
                    message.channel.as_str(),
                    message.payload.as_str(),
                    QOS,
                );
                match client.publish(msg).wait() {
                    Ok(()) => true,
                    Err(e) => {
                        error!(LOG_TAG, "mqtt publish failed on {}: {}", message.channel, e);
                        false
                    }
                }
            }
            None => {
                error!(LOG_TAG, "mqtt publish failed, no connection");
                false
            }
        }
    }

    fn set_last_will(&self, message: Message) {
        let mut inner = self.inner.lock().unwrap();
        debug!(
            LOG_TAG,
            "last will updated, takes effect on next connect: {}", message.channel
        );
        inner.last_will = Some(message);
    }

    fn set_listener(&self, listener: Arc<dyn ConnectivityListener>) {
        let mut inner = self.inner.lock().unwrap();
        inner.listener = Some(listener);
    }
}
