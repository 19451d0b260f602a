pub mod device;
pub mod firmware;
pub mod message;
pub mod reading;
pub mod registration;
pub mod status;
