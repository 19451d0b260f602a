//! 用户回调边界
//!
//! 每个回调槽位只有一个函数式 trait；闭包通过 blanket impl 直接注册，
//! 也可以为自定义类型实现对应 trait。回调在命令缓冲线程上执行，
//! 必须快速返回且不得阻塞。

use crate::entity::reading::{ActuatorStatus, ConfigurationItem};
use crate::entity::status::{DeviceStatus, PlatformConnectivityStatus, PlatformResult};

/// 平台下发执行器写入时被调用
pub trait ActuationHandler: Send + Sync {
    fn handle_actuation(&self, device_key: &str, reference: &str, value: &str);
}

impl<F> ActuationHandler for F
where
    F: Fn(&str, &str, &str) + Send + Sync,
{
    fn handle_actuation(&self, device_key: &str, reference: &str, value: &str) {
        self(device_key, reference, value)
    }
}

/// 读取执行器当前状态
pub trait ActuatorStatusProvider: Send + Sync {
    fn actuator_status(&self, device_key: &str, reference: &str) -> ActuatorStatus;
}

impl<F> ActuatorStatusProvider for F
where
    F: Fn(&str, &str) -> ActuatorStatus + Send + Sync,
{
    fn actuator_status(&self, device_key: &str, reference: &str) -> ActuatorStatus {
        self(device_key, reference)
    }
}

/// 读取子设备当前运行状态
pub trait DeviceStatusProvider: Send + Sync {
    fn device_status(&self, device_key: &str) -> DeviceStatus;
}

impl<F> DeviceStatusProvider for F
where
    F: Fn(&str) -> DeviceStatus + Send + Sync,
{
    fn device_status(&self, device_key: &str) -> DeviceStatus {
        self(device_key)
    }
}

/// 平台下发配置写入时被调用
pub trait ConfigurationHandler: Send + Sync {
    fn handle_configuration(&self, device_key: &str, configuration: &[ConfigurationItem]);
}

impl<F> ConfigurationHandler for F
where
    F: Fn(&str, &[ConfigurationItem]) + Send + Sync,
{
    fn handle_configuration(&self, device_key: &str, configuration: &[ConfigurationItem]) {
        self(device_key, configuration)
    }
}

/// 读取子设备当前配置
pub trait ConfigurationProvider: Send + Sync {
    fn configuration(&self, device_key: &str) -> Vec<ConfigurationItem>;
}

impl<F> ConfigurationProvider for F
where
    F: Fn(&str) -> Vec<ConfigurationItem> + Send + Sync,
{
    fn configuration(&self, device_key: &str) -> Vec<ConfigurationItem> {
        self(device_key)
    }
}

/// 安装结果回调，由安装器在完成或失败时调用，参数为设备 key
pub type FirmwareInstallCallback = Box<dyn FnOnce(String) + Send>;

/// 固件安装器
/// install 收到的文件路径已在本地文件系统中；安装可以异步进行，
/// 完成后调用 on_success 或 on_fail 其中之一
pub trait FirmwareInstaller: Send + Sync {
    fn install(
        &self,
        device_key: &str,
        firmware_file: &str,
        on_success: FirmwareInstallCallback,
        on_fail: FirmwareInstallCallback,
    );

    /// 尝试中止安装；返回 false 表示无法中止，安装继续
    fn abort(&self, device_key: &str) -> bool;
}

/// 读取子设备当前固件版本；返回空串表示不可用
pub trait FirmwareVersionProvider: Send + Sync {
    fn firmware_version(&self, device_key: &str) -> String;
}

impl<F> FirmwareVersionProvider for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn firmware_version(&self, device_key: &str) -> String {
        self(device_key)
    }
}

/// 网关与云平台连接状态变化的监听者
pub trait PlatformStatusListener: Send + Sync {
    fn platform_status(&self, status: PlatformConnectivityStatus);
}

impl<F> PlatformStatusListener for F
where
    F: Fn(PlatformConnectivityStatus) + Send + Sync,
{
    fn platform_status(&self, status: PlatformConnectivityStatus) {
        self(status)
    }
}

/// 注册应答的用户回调
pub type RegistrationResponseHandler = Box<dyn Fn(&str, PlatformResult) + Send + Sync>;
