//! Connection handles and the seam through which they are opened.

mod manager;

pub use manager::{Connection, apply_from_radio};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ConnectError;
use crate::state::DeviceState;
use crate::transport::{ConnectionTarget, Transport};

/// A live session with one radio.
pub trait MeshDevice: Send + Sync {
    fn target(&self) -> &ConnectionTarget;

    /// Snapshot of everything the radio has reported so far.
    fn state(&self) -> DeviceState;

    fn short_name(&self) -> Option<String> {
        self.state().short_name().map(str::to_string)
    }

    fn long_name(&self) -> Option<String> {
        self.state().long_name().map(str::to_string)
    }

    fn transport(&self) -> Transport {
        self.target().transport()
    }

    fn address(&self) -> String {
        self.target().address()
    }

    /// Long name if the radio reported one, otherwise the address.
    fn display_name(&self) -> String {
        self.long_name().unwrap_or_else(|| self.address())
    }
}

pub type DeviceHandle = Arc<dyn MeshDevice>;

/// Opens connections to radios.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, target: ConnectionTarget) -> Result<DeviceHandle, ConnectError>;
}

/// Opens real connections through the `meshtastic` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshtasticConnector;

#[async_trait]
impl Connector for MeshtasticConnector {
    async fn open(&self, target: ConnectionTarget) -> Result<DeviceHandle, ConnectError> {
        let connection = Connection::open(target).await?;
        Ok(Arc::new(connection))
    }
}
