pub mod data_service;
pub mod firmware_service;
pub mod platform_status_service;
pub mod registration_service;
pub mod status_service;

pub use data_service::DataService;
pub use firmware_service::FirmwareUpdateService;
pub use platform_status_service::PlatformStatusService;
pub use registration_service::DeviceRegistrationService;
pub use status_service::DeviceStatusService;
