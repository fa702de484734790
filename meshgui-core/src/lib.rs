//! Core library for the meshgui desktop app
//!
//! This crate finds Meshtastic radios over Serial/USB, Bluetooth LE and TCP,
//! opens connections to them through the `meshtastic` crate, and runs the
//! asynchronous parts on a background I/O runner so the UI thread never blocks.

pub mod connection;
pub mod discovery;
pub mod error;
pub mod io_runner;
pub mod registry;
pub mod state;
pub mod transport;

// Re-export commonly used types
pub use anyhow::Result;
pub use connection::{Connector, DeviceHandle, MeshDevice, MeshtasticConnector};
pub use error::ConnectError;
pub use io_runner::{IoHandle, IoRunner, TaskHandle};
pub use registry::DeviceRegistry;
pub use state::DeviceState;
pub use transport::{ConnectionTarget, Transport};

// Re-export meshtastic types for convenience
pub use meshtastic::protobufs;

#[cfg(test)]
mod tests;
