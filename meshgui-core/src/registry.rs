use chrono::{DateTime, Local};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::connection::DeviceHandle;

#[derive(Clone)]
pub struct RegisteredDevice {
    pub handle: DeviceHandle,
    pub connected_at: DateTime<Local>,
}

/// Live connections, keyed by [`ConnectionTarget::key`](crate::ConnectionTarget::key).
///
/// Two radios may report the same name, so the key is the transport and
/// address rather than anything the radio says about itself.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, RegisteredDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly connected device. Returns the handle it replaced, if any.
    pub fn register_device(&mut self, handle: DeviceHandle) -> Option<DeviceHandle> {
        let key = handle.target().key();
        info!("Registering device {}", key);

        let previous = self.devices.insert(
            key.clone(),
            RegisteredDevice {
                handle,
                connected_at: Local::now(),
            },
        );

        if previous.is_some() {
            warn!("Device {} was already registered; replacing it", key);
        }
        previous.map(|entry| entry.handle)
    }

    pub fn get(&self, key: &str) -> Option<&RegisteredDevice> {
        self.devices.get(key)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisteredDevice)> {
        self.devices.iter().map(|(key, entry)| (key.as_str(), entry))
    }
}
