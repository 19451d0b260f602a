//! 模块核心
//!
//! 功能
//! - 持有子设备注册表、固件状态与连接标志
//! - 对外公开线程安全的 API，所有调用转为命令入队
//! - 全部状态变更与用户回调都在命令缓冲线程上执行

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::api::{
    ActuationHandler, ActuatorStatusProvider, ConfigurationHandler, ConfigurationProvider,
    DeviceStatusProvider, RegistrationResponseHandler,
};
use crate::common::buffer::{CommandBuffer, CommandSender};
use crate::common::time::current_rtc;
use crate::connectivity::ConnectivityService;
use crate::entity::device::{
    ActuatorTemplate, AlarmTemplate, ConfigurationTemplate, SensorTemplate, Subdevice,
};
use crate::entity::firmware::{
    FirmwareState, FirmwareUpdateAbort, FirmwareUpdateError, FirmwareUpdateInstall,
    FirmwareUpdateState, FirmwareUpdateStatus,
};
use crate::entity::reading::{ActuatorState, ConfigurationItem, ReadingValue};
use crate::entity::registration::{PlatformResponse, SubdeviceUpdateRequest};
use crate::entity::status::{DeviceStatus, PlatformResult};
use crate::router::InboundMessageRouter;
use crate::service::{
    DataService, DeviceRegistrationService, DeviceStatusService, FirmwareUpdateService,
};
use crate::service::data_service::PERSISTENCE_KEY_DELIMITER;
use crate::{error, info, warn};

pub mod builder;
pub mod facade;

pub use builder::GatewayModuleBuilder;

const LOG_TAG: &str = "module";

/// 连接失败后的固定重试间隔
const RECONNECT_DELAY_MS: u64 = 2000;

/// 模块状态与服务装配的聚合体；由命令缓冲的消费线程独占持有
pub struct ModuleCore {
    pub(crate) devices: HashMap<String, Subdevice>,
    pub(crate) firmware_states: HashMap<String, FirmwareState>,
    pub(crate) connected: bool,

    pub(crate) command: CommandSender<ModuleCore>,
    pub(crate) connectivity: Arc<dyn ConnectivityService>,
    pub(crate) router: Arc<InboundMessageRouter>,

    pub(crate) data_service: Arc<DataService>,
    pub(crate) status_service: Arc<DeviceStatusService>,
    pub(crate) registration_service: Arc<DeviceRegistrationService>,
    pub(crate) firmware_service: Option<Arc<FirmwareUpdateService>>,

    pub(crate) actuation_handler: Arc<dyn ActuationHandler>,
    pub(crate) actuator_status_provider: Arc<dyn ActuatorStatusProvider>,
    pub(crate) device_status_provider: Arc<dyn DeviceStatusProvider>,
    pub(crate) configuration_handler: Option<Arc<dyn ConfigurationHandler>>,
    pub(crate) configuration_provider: Option<Arc<dyn ConfigurationProvider>>,
    pub(crate) registration_response_handler: Option<RegistrationResponseHandler>,
}

impl ModuleCore {
    // ---- registry lookups ----

    pub fn device_exists(&self, device_key: &str) -> bool {
        self.devices.contains_key(device_key)
    }

    pub fn device_keys(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    pub fn sensor_defined_for_device(&self, device_key: &str, reference: &str) -> bool {
        self.devices
            .get(device_key)
            .map(|device| device.template.sensor_template(reference).is_some())
            .unwrap_or(false)
    }

    pub fn alarm_defined_for_device(&self, device_key: &str, reference: &str) -> bool {
        self.devices
            .get(device_key)
            .map(|device| device.template.alarm_template(reference).is_some())
            .unwrap_or(false)
    }

    pub fn actuator_defined_for_device(&self, device_key: &str, reference: &str) -> bool {
        self.devices
            .get(device_key)
            .map(|device| device.template.actuator_template(reference).is_some())
            .unwrap_or(false)
    }

    pub fn configuration_item_defined_for_device(&self, device_key: &str, reference: &str) -> bool {
        self.devices
            .get(device_key)
            .map(|device| device.template.configuration_template(reference).is_some())
            .unwrap_or(false)
    }

    pub fn actuator_references(&self, device_key: &str) -> Vec<String> {
        self.devices
            .get(device_key)
            .map(|device| device.template.actuator_references())
            .unwrap_or_default()
    }

    // ---- connection lifecycle ----

    pub(crate) fn handle_connect(&mut self, publish_right_away: bool) {
        match self.connectivity.connect() {
            Ok(()) => {
                info!(LOG_TAG, "connected to local message bus");
                self.connected = true;

                let keys = self.device_keys();
                for key in &keys {
                    if let Some(device) = self.devices.get(key) {
                        self.registration_service.publish_registration_request(device);
                    }
                    self.publish_firmware_version(key);
                    let status = self.device_status_provider.device_status(key);
                    self.status_service.publish_device_status_update(key, status);
                }
                for key in &keys {
                    for reference in self.actuator_references(key) {
                        self.acquire_actuator_status(key, &reference);
                    }
                    self.data_service.publish_actuator_statuses(Some(key.as_str()));
                }
                for key in &keys {
                    self.handle_configuration_get(key);
                }

                if publish_right_away {
                    self.handle_publish_all();
                }
            }
            Err(e) => {
                error!(
                    LOG_TAG,
                    "connect failed: {}, retrying in {} ms", e, RECONNECT_DELAY_MS
                );
                thread::sleep(Duration::from_millis(RECONNECT_DELAY_MS));
                self.command
                    .push(move |core| core.handle_connect(publish_right_away));
            }
        }
    }

    pub(crate) fn handle_connection_lost(&mut self) {
        self.connected = false;
        self.handle_connect(true);
    }

    pub(crate) fn handle_disconnect(&mut self) {
        self.connected = false;
        self.connectivity.disconnect();
    }

    pub(crate) fn handle_publish_all(&mut self) {
        self.data_service.publish_actuator_statuses(None);
        self.data_service.publish_configuration(None);
        self.data_service.publish_alarms(None);
        self.data_service.publish_sensor_readings(None);
    }

    pub(crate) fn handle_publish_device(&mut self, device_key: &str) {
        if !self.device_exists(device_key) {
            error!(LOG_TAG, "device does not exist: {}", device_key);
            return;
        }
        self.data_service.publish_actuator_statuses(Some(device_key));
        self.data_service.publish_configuration(Some(device_key));
        self.data_service.publish_alarms(Some(device_key));
        self.data_service.publish_sensor_readings(Some(device_key));
    }

    // ---- outbound ingestion ----

    pub(crate) fn handle_add_sensor_reading(
        &mut self,
        device_key: &str,
        reference: &str,
        values: Vec<String>,
        rtc: u64,
    ) {
        if values.is_empty() {
            return;
        }
        if !self.device_exists(device_key) {
            error!(LOG_TAG, "device does not exist: {}", device_key);
            return;
        }
        if !self.sensor_defined_for_device(device_key, reference) {
            error!(
                LOG_TAG,
                "sensor does not exist for device: {}, {}", device_key, reference
            );
            return;
        }
        let rtc = if rtc == 0 { current_rtc() } else { rtc };
        self.data_service
            .add_sensor_reading(device_key, reference, values, rtc);
    }

    pub(crate) fn handle_add_alarm(
        &mut self,
        device_key: &str,
        reference: &str,
        active: bool,
        rtc: u64,
    ) {
        if !self.device_exists(device_key) {
            error!(LOG_TAG, "device does not exist: {}", device_key);
            return;
        }
        if !self.alarm_defined_for_device(device_key, reference) {
            error!(
                LOG_TAG,
                "alarm does not exist for device: {}, {}", device_key, reference
            );
            return;
        }
        let rtc = if rtc == 0 { current_rtc() } else { rtc };
        self.data_service.add_alarm(device_key, reference, active, rtc);
    }

    pub(crate) fn handle_add_device_status(&mut self, device_key: &str, status: DeviceStatus) {
        if !self.device_exists(device_key) {
            error!(LOG_TAG, "device does not exist: {}", device_key);
            return;
        }
        self.status_service
            .publish_device_status_update(device_key, status);
    }

    pub(crate) fn handle_publish_device_status(&mut self, device_key: &str, status: DeviceStatus) {
        self.status_service
            .publish_device_status_update(device_key, status);
    }

    // ---- inbound data commands ----

    fn acquire_actuator_status(&self, device_key: &str, reference: &str) {
        let status = self
            .actuator_status_provider
            .actuator_status(device_key, reference);
        // provider 返回值可能不带 reference，这里统一补齐
        self.data_service
            .add_actuator_status(device_key, reference, &status.value, status.state);
    }

    pub(crate) fn handle_actuator_set(&mut self, device_key: &str, reference: &str, value: &str) {
        if !self.device_exists(device_key) {
            error!(LOG_TAG, "device does not exist: {}", device_key);
            return;
        }
        if !self.actuator_defined_for_device(device_key, reference) {
            error!(
                LOG_TAG,
                "actuator does not exist for device: {}, {}", device_key, reference
            );
            return;
        }

        self.actuation_handler
            .handle_actuation(device_key, reference, value);
        self.acquire_actuator_status(device_key, reference);

        let device_key = device_key.to_string();
        self.command.push(move |core| {
            core.data_service
                .publish_actuator_statuses(Some(device_key.as_str()));
        });
    }

    pub(crate) fn handle_actuator_get(&mut self, device_key: &str, reference: &str) {
        if !self.device_exists(device_key) {
            error!(LOG_TAG, "device does not exist: {}", device_key);
            return;
        }
        if !self.actuator_defined_for_device(device_key, reference) {
            error!(
                LOG_TAG,
                "actuator does not exist for device: {}, {}", device_key, reference
            );
            return;
        }
        self.acquire_actuator_status(device_key, reference);
        self.data_service.publish_actuator_statuses(Some(device_key));
    }

    pub(crate) fn handle_actuator_status_value(
        &mut self,
        device_key: &str,
        reference: &str,
        value: &str,
    ) {
        self.data_service
            .add_actuator_status(device_key, reference, value, ActuatorState::Ready);
        self.data_service.publish_actuator_statuses(Some(device_key));
    }

    pub(crate) fn handle_configuration_set(
        &mut self,
        device_key: &str,
        items: Vec<ConfigurationItem>,
    ) {
        if !self.device_exists(device_key) {
            error!(LOG_TAG, "device does not exist: {}", device_key);
            return;
        }
        for item in &items {
            if !self.configuration_item_defined_for_device(device_key, &item.reference) {
                error!(
                    LOG_TAG,
                    "configuration item does not exist for device: {}, {}",
                    device_key,
                    item.reference
                );
                return;
            }
        }

        let Some(handler) = self.configuration_handler.clone() else {
            warn!(LOG_TAG, "configuration handler not set, command dropped");
            return;
        };
        handler.handle_configuration(device_key, &items);

        self.handle_configuration_get(device_key);
    }

    pub(crate) fn handle_configuration_get(&mut self, device_key: &str) {
        if !self.device_exists(device_key) {
            error!(LOG_TAG, "device does not exist: {}", device_key);
            return;
        }
        let Some(provider) = self.configuration_provider.clone() else {
            return;
        };
        let items = provider.configuration(device_key);
        self.data_service.add_configuration(device_key, items);
        self.data_service.publish_configuration(Some(device_key));
    }

    pub(crate) fn handle_device_status_request(&mut self, device_key: &str) {
        if device_key.is_empty() {
            self.publish_device_statuses();
            return;
        }
        if !self.device_exists(device_key) {
            return;
        }
        let status = self.device_status_provider.device_status(device_key);
        self.status_service
            .publish_device_status_response(device_key, status);
    }

    fn publish_device_statuses(&mut self) {
        for key in self.device_keys() {
            let status = self.device_status_provider.device_status(&key);
            self.status_service.publish_device_status_update(&key, status);
        }
    }

    // ---- registry mutation ----

    pub(crate) fn handle_add_device(&mut self, device: Subdevice) {
        let device_key = device.key.clone();
        if device_key.is_empty() || device_key.contains(PERSISTENCE_KEY_DELIMITER) {
            error!(LOG_TAG, "invalid device key: '{}'", device_key);
            return;
        }
        if !Self::template_references_valid(&device) {
            error!(
                LOG_TAG,
                "device '{}' has a reference containing the reserved '{}' byte",
                device_key,
                PERSISTENCE_KEY_DELIMITER
            );
            return;
        }
        if self.device_exists(&device_key) {
            error!(
                LOG_TAG,
                "device with key '{}' was already added", device_key
            );
            return;
        }

        self.devices.insert(device_key.clone(), device);
        self.router.add_device_key(&device_key);
        self.status_service.devices_updated(&self.device_keys());

        if self.connected {
            if let Some(device) = self.devices.get(&device_key) {
                self.registration_service.publish_registration_request(device);
            }
            // 重连以刷新订阅集合，纳入新设备的通道
            if let Err(e) = self.connectivity.reconnect() {
                error!(LOG_TAG, "reconnect after device registration failed: {}", e);
            }
        }
    }

    fn template_references_valid(device: &Subdevice) -> bool {
        let template = &device.template;
        template
            .sensors
            .iter()
            .map(|t| &t.reference)
            .chain(template.actuators.iter().map(|t| &t.reference))
            .chain(template.alarms.iter().map(|t| &t.reference))
            .chain(template.configurations.iter().map(|t| &t.reference))
            .all(|reference| !reference.contains(PERSISTENCE_KEY_DELIMITER))
    }

    pub(crate) fn handle_add_assets_to_device(
        &mut self,
        device_key: &str,
        update_default_semantics: bool,
        configurations: Vec<ConfigurationTemplate>,
        sensors: Vec<SensorTemplate>,
        alarms: Vec<AlarmTemplate>,
        actuators: Vec<ActuatorTemplate>,
    ) {
        let Some(device) = self.devices.get(device_key) else {
            error!(
                LOG_TAG,
                "can't update device with key '{}': device is not registered", device_key
            );
            return;
        };

        if !Self::validate_assets_to_update(device, &configurations, &sensors, &alarms, &actuators)
        {
            return;
        }

        if let Some(device) = self.devices.get_mut(device_key) {
            for template in &configurations {
                device.template.add_configuration(template.clone());
            }
            for template in &sensors {
                device.template.add_sensor(template.clone());
            }
            for template in &alarms {
                device.template.add_alarm(template.clone());
            }
            for template in &actuators {
                device.template.add_actuator(template.clone());
            }
        }

        if self.connected {
            let request = SubdeviceUpdateRequest {
                device_key: device_key.to_string(),
                update_default_semantics,
                configurations,
                sensors,
                alarms,
                actuators,
            };
            self.registration_service.publish_update_request(&request);
        }
    }

    /// 相同 reference 的模板必须与已有模板完全一致，否则整个调用被拒绝
    fn validate_assets_to_update(
        device: &Subdevice,
        configurations: &[ConfigurationTemplate],
        sensors: &[SensorTemplate],
        alarms: &[AlarmTemplate],
        actuators: &[ActuatorTemplate],
    ) -> bool {
        let reserved = |reference: &str| reference.contains(PERSISTENCE_KEY_DELIMITER);

        for template in configurations {
            if reserved(&template.reference) {
                error!(LOG_TAG, "invalid reference: '{}'", template.reference);
                return false;
            }
            if let Some(existing) = device.template.configuration_template(&template.reference) {
                if existing != template {
                    error!(
                        LOG_TAG,
                        "can't update device with key '{}': conflicting configuration template",
                        device.key
                    );
                    return false;
                }
            }
        }
        for template in sensors {
            if reserved(&template.reference) {
                error!(LOG_TAG, "invalid reference: '{}'", template.reference);
                return false;
            }
            if let Some(existing) = device.template.sensor_template(&template.reference) {
                if existing != template {
                    error!(
                        LOG_TAG,
                        "can't update device with key '{}': conflicting sensor template",
                        device.key
                    );
                    return false;
                }
            }
        }
        for template in alarms {
            if reserved(&template.reference) {
                error!(LOG_TAG, "invalid reference: '{}'", template.reference);
                return false;
            }
            if let Some(existing) = device.template.alarm_template(&template.reference) {
                if existing != template {
                    error!(
                        LOG_TAG,
                        "can't update device with key '{}': conflicting alarm template",
                        device.key
                    );
                    return false;
                }
            }
        }
        for template in actuators {
            if reserved(&template.reference) {
                error!(LOG_TAG, "invalid reference: '{}'", template.reference);
                return false;
            }
            if let Some(existing) = device.template.actuator_template(&template.reference) {
                if existing != template {
                    error!(
                        LOG_TAG,
                        "can't update device with key '{}': conflicting actuator template",
                        device.key
                    );
                    return false;
                }
            }
        }

        true
    }

    pub(crate) fn handle_remove_device(&mut self, device_key: &str) {
        if self.devices.remove(device_key).is_none() {
            return;
        }
        self.firmware_states.remove(device_key);
        self.router.remove_device_key(device_key);
        self.status_service.devices_updated(&self.device_keys());
    }

    // ---- registration responses ----

    pub(crate) fn handle_registration_response(&mut self, response: PlatformResponse) {
        info!(
            LOG_TAG,
            "registration response for device '{}' received: {:?}",
            response.device_key,
            response.result
        );
        if !self.device_exists(&response.device_key) {
            error!(LOG_TAG, "device does not exist: {}", response.device_key);
            return;
        }

        if response.result == PlatformResult::Ok {
            self.republish_device_data(&response.device_key);
        }

        if let Some(handler) = &self.registration_response_handler {
            handler(&response.device_key, response.result);
        }
    }

    pub(crate) fn handle_update_response(&mut self, response: PlatformResponse) {
        info!(
            LOG_TAG,
            "update response for device '{}' received: {:?}",
            response.device_key,
            response.result
        );
        if !self.device_exists(&response.device_key) {
            error!(LOG_TAG, "device does not exist: {}", response.device_key);
            return;
        }

        if response.result == PlatformResult::Ok {
            self.republish_device_data(&response.device_key);
        }
    }

    /// 注册/更新成功后重发执行器状态、配置与固件版本
    fn republish_device_data(&mut self, device_key: &str) {
        for reference in self.actuator_references(device_key) {
            self.acquire_actuator_status(device_key, &reference);
        }
        self.data_service.publish_actuator_statuses(Some(device_key));
        self.handle_configuration_get(device_key);
        self.publish_firmware_version(device_key);
    }

    // ---- firmware update ----

    pub(crate) fn publish_firmware_version(&mut self, device_key: &str) {
        let Some(service) = self.firmware_service.clone() else {
            return;
        };
        let version = service.firmware_version(device_key);
        if version.is_empty() {
            warn!(
                LOG_TAG,
                "failed to get firmware version for device {}", device_key
            );
            return;
        }
        self.firmware_states
            .entry(device_key.to_string())
            .or_default()
            .current_version = version.clone();
        service.publish_version(device_key, &version);
    }

    fn firmware_status(&self, device_key: &str) -> FirmwareUpdateState {
        self.firmware_states
            .get(device_key)
            .map(|state| state.status)
            .unwrap_or_default()
    }

    fn set_firmware_status(&mut self, device_key: &str, status: FirmwareUpdateState) {
        self.firmware_states
            .entry(device_key.to_string())
            .or_default()
            .status = status;
    }

    pub(crate) fn handle_firmware_install(&mut self, command: FirmwareUpdateInstall) {
        let Some(service) = self.firmware_service.clone() else {
            warn!(LOG_TAG, "firmware update not supported, command dropped");
            return;
        };
        if command.device_keys.len() != 1 || command.device_keys[0].is_empty() {
            warn!(
                LOG_TAG,
                "unable to extract device key from firmware install command"
            );
            return;
        }
        let device_key = command.device_keys[0].clone();
        if !self.device_exists(&device_key) {
            error!(LOG_TAG, "device does not exist: {}", device_key);
            return;
        }
        if self.firmware_status(&device_key) == FirmwareUpdateState::Installing {
            warn!(
                LOG_TAG,
                "firmware installation already in progress for device: {}", device_key
            );
            return;
        }

        if command.file_name.is_empty() {
            warn!(LOG_TAG, "missing file path in firmware install command");
            service.send_status(
                &device_key,
                FirmwareUpdateStatus::Error(FirmwareUpdateError::FileSystemError),
            );
            return;
        }
        let file_present = std::fs::metadata(Path::new(&command.file_name))
            .map(|metadata| metadata.is_file() && metadata.len() > 0)
            .unwrap_or(false);
        if !file_present {
            warn!(LOG_TAG, "missing firmware file: {}", command.file_name);
            service.send_status(
                &device_key,
                FirmwareUpdateStatus::Error(FirmwareUpdateError::FileSystemError),
            );
            return;
        }

        self.set_firmware_status(&device_key, FirmwareUpdateState::Installing);
        service.send_status(&device_key, FirmwareUpdateStatus::Installation);
        service.install(&device_key, &command.file_name);
    }

    pub(crate) fn handle_firmware_abort(&mut self, command: FirmwareUpdateAbort) {
        let Some(service) = self.firmware_service.clone() else {
            return;
        };
        if command.device_keys.len() != 1 || command.device_keys[0].is_empty() {
            warn!(
                LOG_TAG,
                "unable to extract device key from firmware abort command"
            );
            return;
        }
        let device_key = command.device_keys[0].clone();
        if self.firmware_status(&device_key) != FirmwareUpdateState::Installing {
            info!(
                LOG_TAG,
                "no firmware installation in progress for device: {}", device_key
            );
            return;
        }

        if service.abort(&device_key) {
            info!(
                LOG_TAG,
                "firmware installation aborted for device: {}", device_key
            );
            self.set_firmware_status(&device_key, FirmwareUpdateState::Aborted);
            service.send_status(&device_key, FirmwareUpdateStatus::Aborted);
        } else {
            info!(
                LOG_TAG,
                "firmware installation cannot be aborted for device: {}", device_key
            );
        }
    }

    pub(crate) fn firmware_install_succeeded(&mut self, device_key: &str) {
        let Some(service) = self.firmware_service.clone() else {
            return;
        };
        if self.firmware_status(device_key) != FirmwareUpdateState::Installing {
            warn!(
                LOG_TAG,
                "ignoring install result for device {} with no active installation", device_key
            );
            return;
        }
        self.set_firmware_status(device_key, FirmwareUpdateState::Completed);
        service.send_status(device_key, FirmwareUpdateStatus::Completed);
        self.publish_firmware_version(device_key);
    }

    pub(crate) fn firmware_install_failed(&mut self, device_key: &str) {
        let Some(service) = self.firmware_service.clone() else {
            return;
        };
        if self.firmware_status(device_key) != FirmwareUpdateState::Installing {
            warn!(
                LOG_TAG,
                "ignoring install result for device {} with no active installation", device_key
            );
            return;
        }
        self.set_firmware_status(device_key, FirmwareUpdateState::Failed);
        service.send_status(
            device_key,
            FirmwareUpdateStatus::Error(FirmwareUpdateError::InstallationFailed),
        );
    }
}

/// 模块对外句柄；所有方法线程安全，实际工作在内部工作线程上执行
pub struct GatewayModule {
    command: CommandSender<ModuleCore>,
    buffer: CommandBuffer<ModuleCore>,
}

impl GatewayModule {
    pub(crate) fn new(command: CommandSender<ModuleCore>, buffer: CommandBuffer<ModuleCore>) -> Self {
        GatewayModule { command, buffer }
    }

    pub fn builder() -> GatewayModuleBuilder {
        GatewayModuleBuilder::new()
    }

    /// 建立连接并执行引导序列；失败时以固定间隔无限重试。
    /// publish_right_away 为 true 时连接成功后立即清空持久化队列
    pub fn connect(&self, publish_right_away: bool) {
        self.command
            .push(move |core| core.handle_connect(publish_right_away));
    }

    pub fn disconnect(&self) {
        self.command.push(|core| core.handle_disconnect());
    }

    /// 清空四类持久化队列；可随时机会性调用
    pub fn publish(&self) {
        self.command.push(|core| core.handle_publish_all());
    }

    /// 只清空指定设备的持久化队列
    pub fn publish_for_device(&self, device_key: &str) {
        let device_key = device_key.to_string();
        self.command
            .push(move |core| core.handle_publish_device(&device_key));
    }

    /// 登记一条标量读数；rtc 为 0 时以当前时间打点
    pub fn add_sensor_reading<T: ReadingValue>(
        &self,
        device_key: &str,
        reference: &str,
        value: T,
        rtc: u64,
    ) {
        self.enqueue_sensor_reading(device_key, reference, vec![value.into_reading_string()], rtc);
    }

    /// 登记一条多值读数；空向量不产生任何效果
    pub fn add_multi_value_sensor_reading<T: ReadingValue>(
        &self,
        device_key: &str,
        reference: &str,
        values: Vec<T>,
        rtc: u64,
    ) {
        if values.is_empty() {
            return;
        }
        let values = values
            .into_iter()
            .map(|value| value.into_reading_string())
            .collect();
        self.enqueue_sensor_reading(device_key, reference, values, rtc);
    }

    fn enqueue_sensor_reading(
        &self,
        device_key: &str,
        reference: &str,
        values: Vec<String>,
        rtc: u64,
    ) {
        let device_key = device_key.to_string();
        let reference = reference.to_string();
        self.command.push(move |core| {
            core.handle_add_sensor_reading(&device_key, &reference, values, rtc)
        });
    }

    pub fn add_alarm(&self, device_key: &str, reference: &str, active: bool, rtc: u64) {
        let device_key = device_key.to_string();
        let reference = reference.to_string();
        self.command
            .push(move |core| core.handle_add_alarm(&device_key, &reference, active, rtc));
    }

    /// 通过状态回调读取执行器状态并发布
    pub fn publish_actuator_status(&self, device_key: &str, reference: &str) {
        let device_key = device_key.to_string();
        let reference = reference.to_string();
        self.command
            .push(move |core| core.handle_actuator_get(&device_key, &reference));
    }

    /// 直接发布给定的执行器取值，状态标记为 READY
    pub fn publish_actuator_status_value(&self, device_key: &str, reference: &str, value: &str) {
        let device_key = device_key.to_string();
        let reference = reference.to_string();
        let value = value.to_string();
        self.command.push(move |core| {
            core.handle_actuator_status_value(&device_key, &reference, &value)
        });
    }

    /// 通过配置回调读取当前配置并发布
    pub fn publish_configuration(&self, device_key: &str) {
        let device_key = device_key.to_string();
        self.command
            .push(move |core| core.handle_configuration_get(&device_key));
    }

    /// 直接发布给定的配置项集合
    pub fn publish_configuration_items(&self, device_key: &str, items: Vec<ConfigurationItem>) {
        let device_key = device_key.to_string();
        self.command.push(move |core| {
            core.data_service.add_configuration(&device_key, items);
            core.data_service
                .publish_configuration(Some(device_key.as_str()));
        });
    }

    /// 上报已登记设备的状态
    pub fn add_device_status(&self, device_key: &str, status: DeviceStatus) {
        let device_key = device_key.to_string();
        self.command
            .push(move |core| core.handle_add_device_status(&device_key, status));
    }

    /// 显式上报设备状态，不校验设备是否登记
    pub fn publish_device_status(&self, device_key: &str, status: DeviceStatus) {
        let device_key = device_key.to_string();
        self.command
            .push(move |core| core.handle_publish_device_status(&device_key, status));
    }

    /// 登记子设备；key 已存在时忽略并记录错误
    pub fn add_device(&self, device: Subdevice) {
        self.command.push(move |core| core.handle_add_device(device));
    }

    /// 为已登记设备追加能力模板；与已有模板冲突时整体拒绝
    pub fn add_assets_to_device(
        &self,
        device_key: &str,
        update_default_semantics: bool,
        configurations: Vec<ConfigurationTemplate>,
        sensors: Vec<SensorTemplate>,
        alarms: Vec<AlarmTemplate>,
        actuators: Vec<ActuatorTemplate>,
    ) {
        let device_key = device_key.to_string();
        self.command.push(move |core| {
            core.handle_add_assets_to_device(
                &device_key,
                update_default_semantics,
                configurations,
                sensors,
                alarms,
                actuators,
            )
        });
    }

    /// 移除子设备；幂等
    pub fn remove_device(&self, device_key: &str) {
        let device_key = device_key.to_string();
        self.command
            .push(move |core| core.handle_remove_device(&device_key));
    }

    /// 停止命令工作线程；队列中剩余命令执行完后返回
    pub fn stop(&mut self) {
        self.buffer.stop();
    }
}
