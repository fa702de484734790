use meshgui_core::discovery::{PeerScanner, PortEnumerator, SystemPorts, system_scanner};
use meshgui_core::{Connector, IoHandle, MeshtasticConnector};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Cli;

/// Shared services handed to every component that discovers or connects.
#[derive(Clone)]
pub struct AppContext {
    pub io: IoHandle,
    pub connector: Arc<dyn Connector>,
    pub ports: Arc<dyn PortEnumerator>,
    pub scanner: Arc<dyn PeerScanner>,
    pub scan_duration: Duration,
    pub tcp_host: String,
    pub tcp_port: u16,
}

impl AppContext {
    /// Services backed by the real serial ports, Bluetooth adapter and radios.
    pub fn system(io: IoHandle, cli: &Cli) -> Self {
        Self {
            io,
            connector: Arc::new(MeshtasticConnector),
            ports: Arc::new(SystemPorts),
            scanner: system_scanner(),
            scan_duration: cli.scan_duration,
            tcp_host: cli.tcp_host.clone(),
            tcp_port: cli.tcp_port,
        }
    }
}
