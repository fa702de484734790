//! Bluetooth LE peer discovery.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::mpsc::Sender;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// GATT service every Meshtastic radio advertises.
pub const MESHTASTIC_SERVICE_UUID: Uuid = Uuid::from_u128(0x6ba1b218_15a8_461f_9fa8_5dcae273eafd);

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredPeer {
    pub name: Option<String>,
    pub address: String,
    pub rssi: Option<i16>,
}

impl DiscoveredPeer {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

/// Peers already reported during one scan.
///
/// An id counts as seen only once its properties were read, so a peripheral
/// whose first advertisement came without them is retried on the next event.
#[cfg_attr(not(feature = "bluetooth"), allow(dead_code))]
#[derive(Debug)]
pub(crate) struct PeerTracker<K> {
    seen: HashSet<K>,
}

#[cfg_attr(not(feature = "bluetooth"), allow(dead_code))]
impl<K: Eq + Hash> PeerTracker<K> {
    pub(crate) fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    pub(crate) fn knows(&self, id: &K) -> bool {
        self.seen.contains(id)
    }

    /// Returns the peer if it should be listed now.
    pub(crate) fn observe(&mut self, id: K, peer: Option<DiscoveredPeer>) -> Option<DiscoveredPeer> {
        let peer = peer?;
        self.seen.insert(id).then_some(peer)
    }
}

/// Progress of a running scan, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    PeerFound(DiscoveredPeer),
    /// The scan stopped. `Err` carries a human readable reason.
    Finished(Result<(), String>),
}

/// Scans for radios advertising [`MESHTASTIC_SERVICE_UUID`].
#[async_trait]
pub trait PeerScanner: Send + Sync {
    /// Scan for `duration`, posting each newly seen peer to `events` as it
    /// arrives. Cancelling `cancel` ends the scan early; either way the
    /// adapter is told to stop scanning before this returns.
    async fn scan(
        &self,
        duration: Duration,
        events: Sender<ScanEvent>,
        cancel: CancellationToken,
    ) -> Result<()>;
}

#[cfg(feature = "bluetooth")]
pub use btle::BtleplugScanner;

#[cfg(feature = "bluetooth")]
mod btle {
    use super::{DiscoveredPeer, MESHTASTIC_SERVICE_UUID, PeerScanner, PeerTracker, ScanEvent};
    use anyhow::{Context, Result};
    use async_trait::async_trait;
    use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
    use btleplug::platform::Manager;
    use futures_util::StreamExt;
    use std::sync::mpsc::Sender;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tracing::{debug, info, warn};

    /// Scans with the first Bluetooth adapter `btleplug` reports.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct BtleplugScanner;

    #[async_trait]
    impl PeerScanner for BtleplugScanner {
        async fn scan(
            &self,
            duration: Duration,
            events: Sender<ScanEvent>,
            cancel: CancellationToken,
        ) -> Result<()> {
            info!("Starting Bluetooth scan for {:?}", duration);

            let manager = Manager::new()
                .await
                .context("Failed to start Bluetooth manager")?;
            let adapter = manager
                .adapters()
                .await
                .context("Failed to list Bluetooth adapters")?
                .into_iter()
                .next()
                .context("No Bluetooth adapter found")?;

            let mut central_events = adapter
                .events()
                .await
                .context("Failed to subscribe to Bluetooth events")?;
            adapter
                .start_scan(ScanFilter {
                    services: vec![MESHTASTIC_SERVICE_UUID],
                })
                .await
                .context("Failed to start Bluetooth scan")?;

            let deadline = tokio::time::sleep(duration);
            tokio::pin!(deadline);
            let mut tracker = PeerTracker::new();

            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    _ = cancel.cancelled() => {
                        debug!("Bluetooth scan cancelled");
                        break;
                    }
                    event = central_events.next() => {
                        let Some(event) = event else { break };
                        let (CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id)) = event
                        else {
                            continue;
                        };
                        if tracker.knows(&id) {
                            continue;
                        }

                        let peripheral = match adapter.peripheral(&id).await {
                            Ok(peripheral) => peripheral,
                            Err(e) => {
                                warn!("Discovered peripheral vanished: {}", e);
                                continue;
                            }
                        };
                        // Properties may not be ready yet; a later event retries
                        let properties = match peripheral.properties().await {
                            Ok(properties) => properties,
                            Err(e) => {
                                debug!("No properties for peripheral yet: {}", e);
                                None
                            }
                        };
                        let found = properties.map(|properties| DiscoveredPeer {
                            name: properties.local_name,
                            address: properties.address.to_string(),
                            rssi: properties.rssi,
                        });
                        let Some(peer) = tracker.observe(id, found) else {
                            continue;
                        };

                        debug!("Found Bluetooth peer {} ({:?})", peer.address, peer.rssi);
                        if events.send(ScanEvent::PeerFound(peer)).is_err() {
                            // Nobody is listening any more
                            break;
                        }
                    }
                }
            }

            if let Err(e) = adapter.stop_scan().await {
                warn!("Failed to stop Bluetooth scan: {}", e);
            }
            info!("Finished Bluetooth scan");
            Ok(())
        }
    }
}

/// Stand-in used when Bluetooth support is not compiled in.
#[cfg(not(feature = "bluetooth"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedScanner;

#[cfg(not(feature = "bluetooth"))]
#[async_trait]
impl PeerScanner for UnsupportedScanner {
    async fn scan(
        &self,
        _duration: Duration,
        _events: Sender<ScanEvent>,
        _cancel: CancellationToken,
    ) -> Result<()> {
        anyhow::bail!("Bluetooth support not compiled. Build with --features bluetooth")
    }
}

/// The scanner for this build.
pub fn system_scanner() -> std::sync::Arc<dyn PeerScanner> {
    #[cfg(feature = "bluetooth")]
    {
        std::sync::Arc::new(BtleplugScanner)
    }
    #[cfg(not(feature = "bluetooth"))]
    {
        std::sync::Arc::new(UnsupportedScanner)
    }
}
