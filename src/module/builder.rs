//! 模块装配
//!
//! 校验回调槽位的完整性并装配协议、服务、路由与连接层。
//! 必需槽位：执行器写入回调、执行器状态回调、设备状态回调；
//! 配置回调成对出现；固件安装器与版本回调成对出现

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{
    ActuationHandler, ActuatorStatusProvider, ConfigurationHandler, ConfigurationProvider,
    DeviceStatusProvider, FirmwareInstaller, FirmwareVersionProvider, PlatformStatusListener,
    RegistrationResponseHandler,
};
use crate::common::buffer::CommandBuffer;
use crate::common::error::{ErrorCode, ModuleError};
use crate::common::time::current_rtc;
use crate::connectivity::{ConnectivityService, MqttConnectivityService};
use crate::entity::status::PlatformResult;
use crate::module::facade::ConnectivityFacade;
use crate::module::{GatewayModule, ModuleCore};
use crate::persistence::{InMemoryPersistence, Persistence};
use crate::protocol::{
    DataProtocol, FirmwareUpdateProtocol, PlatformStatusProtocol, RegistrationProtocol,
    StatusProtocol,
};
use crate::router::InboundMessageRouter;
use crate::service::{
    DataService, DeviceRegistrationService, DeviceStatusService, FirmwareUpdateService,
    PlatformStatusService,
};

const MESSAGE_BUS_HOST: &str = "tcp://localhost:1883";

pub struct GatewayModuleBuilder {
    host: String,
    client_id: Option<String>,
    persistence: Option<Arc<dyn Persistence>>,
    connectivity: Option<Arc<dyn ConnectivityService>>,
    actuation_handler: Option<Arc<dyn ActuationHandler>>,
    actuator_status_provider: Option<Arc<dyn ActuatorStatusProvider>>,
    device_status_provider: Option<Arc<dyn DeviceStatusProvider>>,
    configuration_handler: Option<Arc<dyn ConfigurationHandler>>,
    configuration_provider: Option<Arc<dyn ConfigurationProvider>>,
    firmware_installer: Option<Arc<dyn FirmwareInstaller>>,
    firmware_version_provider: Option<Arc<dyn FirmwareVersionProvider>>,
    platform_status_listener: Option<Arc<dyn PlatformStatusListener>>,
    registration_response_handler: Option<RegistrationResponseHandler>,
}

impl GatewayModuleBuilder {
    pub fn new() -> Self {
        GatewayModuleBuilder {
            host: MESSAGE_BUS_HOST.to_string(),
            client_id: None,
            persistence: None,
            connectivity: None,
            actuation_handler: None,
            actuator_status_provider: None,
            device_status_provider: None,
            configuration_handler: None,
            configuration_provider: None,
            firmware_installer: None,
            firmware_version_provider: None,
            platform_status_listener: None,
            registration_response_handler: None,
        }
    }

    /// 本机网关进程的 mqtt 地址
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn client_id(mut self, client_id: &str) -> Self {
        self.client_id = Some(client_id.to_string());
        self
    }

    pub fn actuation_handler(mut self, handler: impl ActuationHandler + 'static) -> Self {
        self.actuation_handler = Some(Arc::new(handler));
        self
    }

    pub fn actuator_status_provider(
        mut self,
        provider: impl ActuatorStatusProvider + 'static,
    ) -> Self {
        self.actuator_status_provider = Some(Arc::new(provider));
        self
    }

    pub fn device_status_provider(mut self, provider: impl DeviceStatusProvider + 'static) -> Self {
        self.device_status_provider = Some(Arc::new(provider));
        self
    }

    pub fn configuration_handler(mut self, handler: impl ConfigurationHandler + 'static) -> Self {
        self.configuration_handler = Some(Arc::new(handler));
        self
    }

    pub fn configuration_provider(
        mut self,
        provider: impl ConfigurationProvider + 'static,
    ) -> Self {
        self.configuration_provider = Some(Arc::new(provider));
        self
    }

    pub fn with_firmware_update(
        mut self,
        installer: impl FirmwareInstaller + 'static,
        version_provider: impl FirmwareVersionProvider + 'static,
    ) -> Self {
        self.firmware_installer = Some(Arc::new(installer));
        self.firmware_version_provider = Some(Arc::new(version_provider));
        self
    }

    pub fn with_platform_status_listener(
        mut self,
        listener: impl PlatformStatusListener + 'static,
    ) -> Self {
        self.platform_status_listener = Some(Arc::new(listener));
        self
    }

    pub fn with_registration_response_handler(
        mut self,
        handler: impl Fn(&str, PlatformResult) + Send + Sync + 'static,
    ) -> Self {
        self.registration_response_handler = Some(Box::new(handler));
        self
    }

    /// 替换默认的内存持久化
    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// 替换默认的 mqtt 连接层（测试时注入桩实现）
    pub fn with_connectivity(mut self, connectivity: Arc<dyn ConnectivityService>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn build(self) -> Result<GatewayModule, ModuleError> {
        let actuation_handler = self.actuation_handler.ok_or_else(|| {
            ModuleError::new(ErrorCode::ConfigurationError, "actuation handler not set")
        })?;
        let actuator_status_provider = self.actuator_status_provider.ok_or_else(|| {
            ModuleError::new(
                ErrorCode::ConfigurationError,
                "actuator status provider not set",
            )
        })?;
        let device_status_provider = self.device_status_provider.ok_or_else(|| {
            ModuleError::new(
                ErrorCode::ConfigurationError,
                "device status provider not set",
            )
        })?;

        if self.configuration_handler.is_some() != self.configuration_provider.is_some() {
            return Err(ModuleError::new(
                ErrorCode::ConfigurationError,
                "both configuration handler and configuration provider must be set",
            ));
        }
        if self.firmware_installer.is_some() != self.firmware_version_provider.is_some() {
            return Err(ModuleError::new(
                ErrorCode::ConfigurationError,
                "both firmware installer and firmware version provider must be set",
            ));
        }

        let client_id = self
            .client_id
            .unwrap_or_else(|| format!("subdevice-module-{}", current_rtc()));
        let connectivity: Arc<dyn ConnectivityService> = match self.connectivity {
            Some(connectivity) => connectivity,
            None => Arc::new(MqttConnectivityService::new(&self.host, &client_id)),
        };
        let persistence: Arc<dyn Persistence> = match self.persistence {
            Some(persistence) => persistence,
            None => Arc::new(InMemoryPersistence::new()),
        };

        let mut buffer = CommandBuffer::new();
        let command = buffer.sender();
        let router = Arc::new(InboundMessageRouter::new());

        let data_protocol = Arc::new(DataProtocol);
        let data_service = Arc::new(DataService::new(
            data_protocol.clone(),
            persistence.clone(),
            connectivity.clone(),
            command.clone(),
        ));
        router.register(data_protocol, data_service.clone());

        let status_protocol = Arc::new(StatusProtocol);
        let status_service = Arc::new(DeviceStatusService::new(
            status_protocol.clone(),
            connectivity.clone(),
            command.clone(),
        ));
        router.register(status_protocol, status_service.clone());

        let registration_protocol = Arc::new(RegistrationProtocol);
        let registration_service = Arc::new(DeviceRegistrationService::new(
            registration_protocol.clone(),
            connectivity.clone(),
            command.clone(),
        ));
        router.register(registration_protocol, registration_service.clone());

        let firmware_service = match (self.firmware_installer, self.firmware_version_provider) {
            (Some(installer), Some(version_provider)) => {
                let firmware_protocol = Arc::new(FirmwareUpdateProtocol);
                let service = Arc::new(FirmwareUpdateService::new(
                    firmware_protocol.clone(),
                    installer,
                    version_provider,
                    connectivity.clone(),
                    command.clone(),
                ));
                router.register(firmware_protocol, service.clone());
                Some(service)
            }
            _ => None,
        };

        if let Some(listener) = self.platform_status_listener {
            let platform_protocol = Arc::new(PlatformStatusProtocol);
            let platform_service = Arc::new(PlatformStatusService::new(
                platform_protocol.clone(),
                listener,
                command.clone(),
            ));
            router.register(platform_protocol, platform_service);
        }

        let facade = Arc::new(ConnectivityFacade::new(router.clone(), command.clone()));
        connectivity.set_listener(facade);

        // 连接建立前也要有遗嘱消息可用
        status_service.devices_updated(&[]);

        let core = ModuleCore {
            devices: HashMap::new(),
            firmware_states: HashMap::new(),
            connected: false,
            command: command.clone(),
            connectivity,
            router,
            data_service,
            status_service,
            registration_service,
            firmware_service,
            actuation_handler,
            actuator_status_provider,
            device_status_provider,
            configuration_handler: self.configuration_handler,
            configuration_provider: self.configuration_provider,
            registration_response_handler: self.registration_response_handler,
        };
        buffer.run(core);

        Ok(GatewayModule::new(command, buffer))
    }
}

impl Default for GatewayModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
