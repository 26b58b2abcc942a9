//! ADB (Android Debug Bridge) backend for the device and UI tree traits.

mod connection;
mod device;
pub mod input;

pub use connection::{AdbConnection, CommandOutput, ConnectionType, DeviceInfo};
pub use device::AdbDevice;
