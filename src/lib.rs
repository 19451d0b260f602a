//! Gateway-side subdevice module.
//!
//! A physical gateway hosts many logical subdevices; this module multiplexes
//! their telemetry, actuation, configuration, status and firmware traffic
//! over a single MQTT connection to the gateway process on the same host,
//! speaking a JSON protocol family.
//!
//! The public entry point is [`GatewayModule`], obtained through
//! [`GatewayModule::builder`]. All module state is owned by a single worker
//! thread; public API calls and bus callbacks enqueue commands onto it, so
//! user callbacks must return promptly.

pub mod api;
pub mod common;
pub mod connectivity;
pub mod entity;
pub mod module;
pub mod persistence;
pub mod protocol;
pub mod router;
pub mod service;

pub use api::{
    ActuationHandler, ActuatorStatusProvider, ConfigurationHandler, ConfigurationProvider,
    DeviceStatusProvider, FirmwareInstaller, FirmwareVersionProvider, PlatformStatusListener,
};
pub use common::config::ModuleConfiguration;
pub use common::error::{ErrorCode, ModuleError};
pub use common::logger::init_logger;
pub use entity::device::{
    ActuatorTemplate, AlarmTemplate, ConfigurationTemplate, DataType, DeviceTemplate,
    SensorTemplate, Subdevice,
};
pub use entity::reading::{
    ActuatorState, ActuatorStatus, Alarm, ConfigurationItem, ConfigurationSnapshot, ReadingValue,
    SensorReading,
};
pub use entity::status::{DeviceStatus, PlatformConnectivityStatus, PlatformResult};
pub use module::{GatewayModule, GatewayModuleBuilder};
pub use persistence::{InMemoryPersistence, Persistence, SqlitePersistence};
