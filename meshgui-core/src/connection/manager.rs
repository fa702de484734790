use meshtastic::Message as ProstMessage;
use meshtastic::api::state::Configured;
use meshtastic::api::{ConnectedStreamApi, StreamApi};
use meshtastic::packet::PacketReceiver;
use meshtastic::protobufs;
use meshtastic::utils;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::MeshDevice;
use crate::error::ConnectError;
use crate::state::{
    ChannelInfo, DeviceMetadata, DeviceMetrics, DeviceState, LoraSummary, MyNodeInfo, NodeInfo,
    User,
};
use crate::transport::ConnectionTarget;

#[cfg(feature = "bluetooth")]
const BLE_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time given to the packet processor to pick up the initial config burst.
const INITIAL_SYNC_DELAY: Duration = Duration::from_millis(500);

/// A configured stream API plus the task that folds incoming packets into
/// [`DeviceState`]. Dropping it stops packet processing.
pub struct Connection {
    target: ConnectionTarget,
    _api: Mutex<ConnectedStreamApi<Configured>>,
    device_state: Arc<Mutex<DeviceState>>,
    packet_processor: JoinHandle<()>,
}

impl Connection {
    /// Open and configure a connection. Must run inside a tokio runtime.
    pub async fn open(target: ConnectionTarget) -> Result<Self, ConnectError> {
        info!("Establishing connection to {}", target.key());

        let stream_api = StreamApi::new();

        let (packet_receiver, connected_api) = match &target {
            ConnectionTarget::Serial { port } => {
                info!("Connecting via serial port {}", port);
                let stream = utils::stream::build_serial_stream(
                    port.clone(),
                    None, // Use default baud rate
                    None, // Use default DTR
                    None, // Use default RTS
                )
                .map_err(|e| open_error(&target, e))?;
                stream_api.connect(stream).await
            }
            ConnectionTarget::Tcp { host, port } => {
                let address = format!("{host}:{port}");
                info!("Connecting via TCP to {}", address);
                let stream = utils::stream::build_tcp_stream(address)
                    .await
                    .map_err(|e| open_error(&target, e))?;
                stream_api.connect(stream).await
            }
            ConnectionTarget::Ble {
                address: _address,
                name: _name,
            } => {
                #[cfg(feature = "bluetooth")]
                {
                    use crate::transport::BleLookup;

                    let ble_id = match BleLookup::resolve(_address, _name.as_deref()) {
                        BleLookup::Name(name) => {
                            info!("Connecting via Bluetooth to device named {}", name);
                            utils::stream::BleId::from_name(&name)
                        }
                        BleLookup::MacAddress(address) => {
                            info!("Connecting via Bluetooth to {}", address);
                            // Try as MAC address first, then as name
                            utils::stream::BleId::from_mac_address(&address)
                                .unwrap_or_else(|_| utils::stream::BleId::from_name(&address))
                        }
                    };
                    let stream = utils::stream::build_ble_stream(&ble_id, BLE_CONNECT_TIMEOUT)
                        .await
                        .map_err(|e| open_error(&target, e))?;
                    stream_api.connect(stream).await
                }
                #[cfg(not(feature = "bluetooth"))]
                {
                    return Err(ConnectError::BluetoothUnsupported);
                }
            }
        };

        info!("Configuring connection...");
        let config_id = utils::generate_rand_id();
        let configured_api =
            connected_api
                .configure(config_id)
                .await
                .map_err(|e| ConnectError::Configure {
                    address: target.address(),
                    source: anyhow::Error::from(e).into(),
                })?;

        let device_state = Arc::new(Mutex::new(DeviceState::new()));
        let packet_processor = spawn_packet_processing(packet_receiver, device_state.clone());

        // Give the processor a moment to start receiving initial packets
        tokio::time::sleep(INITIAL_SYNC_DELAY).await;

        info!("Connection to {} established", target.key());
        Ok(Self {
            target,
            _api: Mutex::new(configured_api),
            device_state,
            packet_processor,
        })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.device_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl MeshDevice for Connection {
    fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    fn state(&self) -> DeviceState {
        self.lock_state().clone()
    }

    fn short_name(&self) -> Option<String> {
        self.lock_state().short_name().map(str::to_string)
    }

    fn long_name(&self) -> Option<String> {
        self.lock_state().long_name().map(str::to_string)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        debug!("Dropping connection to {}", self.target.key());
        self.packet_processor.abort();
    }
}

fn open_error(target: &ConnectionTarget, err: impl Into<anyhow::Error>) -> ConnectError {
    ConnectError::Open {
        transport: target.transport(),
        address: target.address(),
        source: err.into().into(),
    }
}

fn spawn_packet_processing(
    mut receiver: PacketReceiver,
    device_state: Arc<Mutex<DeviceState>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting packet processing loop");

        while let Some(packet) = receiver.recv().await {
            let mut state = device_state.lock().unwrap_or_else(PoisonError::into_inner);
            apply_from_radio(&mut state, packet);
        }

        warn!("Packet processing loop ended");
    })
}

/// Fold one `FromRadio` packet into the cached device state.
pub fn apply_from_radio(state: &mut DeviceState, from_radio: protobufs::FromRadio) {
    let Some(payload_variant) = from_radio.payload_variant else {
        return; // Ignore empty packets
    };

    match payload_variant {
        protobufs::from_radio::PayloadVariant::MyInfo(my_info) => {
            state.set_my_node_info(MyNodeInfo {
                node_num: my_info.my_node_num,
                node_id: format!("{:08x}", my_info.my_node_num),
                reboot_count: my_info.reboot_count,
                min_app_version: my_info.min_app_version,
                device_id: hex::encode(my_info.device_id),
            });
            debug!("Updated my node info");
        }

        protobufs::from_radio::PayloadVariant::NodeInfo(node_info) => {
            let user = node_info.user.clone().unwrap_or_default();
            let is_mine = state
                .my_node_info
                .as_ref()
                .is_some_and(|info| info.node_num == node_info.num);

            if is_mine && let Some(metrics) = node_info.device_metrics {
                state.set_device_metrics(device_metrics(metrics));
            }

            state.update_node(
                node_info.num,
                NodeInfo {
                    id: format!("{:08x}", node_info.num),
                    num: node_info.num,
                    user: User {
                        id: user.id.clone(),
                        long_name: user.long_name.clone(),
                        short_name: user.short_name.clone(),
                        hw_model: Some(format!("{:?}", user.hw_model())),
                    },
                    last_heard: (node_info.last_heard > 0).then_some(node_info.last_heard as u64),
                    snr: Some(node_info.snr),
                },
            );
            debug!("Updated node info for {}", node_info.num);
        }

        protobufs::from_radio::PayloadVariant::Channel(channel) => {
            state.update_channel(ChannelInfo {
                index: channel.index as u32,
                name: channel
                    .settings
                    .as_ref()
                    .map(|s| s.name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| format!("Channel {index}", index = channel.index)),
                role: format!("{:?}", channel.role()),
                has_psk: channel
                    .settings
                    .as_ref()
                    .map(|s| !s.psk.is_empty())
                    .unwrap_or(false),
            });
            debug!("Updated channel {}", channel.index);
        }

        protobufs::from_radio::PayloadVariant::Metadata(metadata) => {
            state.set_metadata(DeviceMetadata {
                firmware_version: metadata.firmware_version.clone(),
                hw_model: format!("{:?}", metadata.hw_model()),
                has_bluetooth: metadata.has_bluetooth,
                has_wifi: metadata.has_wifi,
                has_ethernet: metadata.has_ethernet,
            });
            debug!("Updated device metadata");
        }

        protobufs::from_radio::PayloadVariant::Config(config) => {
            if let Some(protobufs::config::PayloadVariant::Lora(lora_config)) =
                config.payload_variant
            {
                state.set_lora(LoraSummary {
                    region: format!("{:?}", lora_config.region()),
                    modem_preset: format!("{:?}", lora_config.modem_preset()),
                    hop_limit: lora_config.hop_limit,
                    tx_enabled: lora_config.tx_enabled,
                });
                debug!("Updated LoRa config");
            }
        }

        protobufs::from_radio::PayloadVariant::Packet(mesh_packet) => {
            apply_mesh_packet(state, mesh_packet);
        }

        _ => {
            // Other packet types are not shown in the summary
        }
    }
}

fn apply_mesh_packet(state: &mut DeviceState, mesh_packet: protobufs::MeshPacket) {
    let Some(protobufs::mesh_packet::PayloadVariant::Decoded(packet_data)) =
        mesh_packet.payload_variant
    else {
        // Can't process encrypted packets
        return;
    };

    if packet_data.portnum() != protobufs::PortNum::TelemetryApp {
        return;
    }

    let is_mine = state
        .my_node_info
        .as_ref()
        .is_some_and(|info| info.node_num == mesh_packet.from);
    if !is_mine {
        return;
    }

    if let Ok(telemetry) = protobufs::Telemetry::decode(packet_data.payload.as_slice())
        && let Some(protobufs::telemetry::Variant::DeviceMetrics(metrics)) = telemetry.variant
    {
        state.set_device_metrics(device_metrics(metrics));
        debug!("Updated device metrics for {:08x}", mesh_packet.from);
    }
}

fn device_metrics(m: protobufs::DeviceMetrics) -> DeviceMetrics {
    DeviceMetrics {
        battery_level: m.battery_level,
        voltage: m.voltage,
        channel_utilization: m.channel_utilization,
        air_util_tx: m.air_util_tx,
        uptime_seconds: m.uptime_seconds,
    }
}
