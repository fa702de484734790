//! Finding connection candidates before anything is opened.

pub mod ble;
pub mod serial;

pub use ble::{DiscoveredPeer, MESHTASTIC_SERVICE_UUID, PeerScanner, ScanEvent, system_scanner};
pub use serial::{DetectedDevice, PortEnumerator, SystemPorts, supported_vendor_ids};
