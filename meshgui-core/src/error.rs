use thiserror::Error;

use crate::transport::Transport;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a connection attempt did not produce a device handle.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("Failed to open {transport} connection to {address}")]
    Open {
        transport: Transport,
        address: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to configure connection to {address}")]
    Configure {
        address: String,
        #[source]
        source: BoxError,
    },

    #[error("Bluetooth support not compiled. Build with --features bluetooth")]
    BluetoothUnsupported,
}
