#[cfg(test)]
mod transport_tests {
    use crate::transport::{
        BleLookup, ConnectionTarget, DEFAULT_TCP_HOST, DEFAULT_TCP_PORT, NIL_BLE_ADDRESS, Transport,
    };
    use strum::IntoEnumIterator;

    #[test]
    fn test_transport_labels() {
        assert_eq!(Transport::Serial.to_string(), "Serial/USB");
        assert_eq!(Transport::Ble.to_string(), "Bluetooth");
        assert_eq!(Transport::Tcp.to_string(), "TCP Link");

        // Radio button order in the connect dialog
        let order: Vec<_> = Transport::iter().collect();
        assert_eq!(order, [Transport::Serial, Transport::Ble, Transport::Tcp]);
    }

    #[test]
    fn test_target_address_and_key() {
        let tcp = ConnectionTarget::tcp(DEFAULT_TCP_HOST, DEFAULT_TCP_PORT);
        assert_eq!(tcp.transport(), Transport::Tcp);
        assert_eq!(tcp.address(), "localhost:4403");
        assert_eq!(tcp.key(), "tcp:localhost:4403");

        let serial = ConnectionTarget::serial("/dev/ttyUSB0");
        assert_eq!(serial.address(), "/dev/ttyUSB0");
        assert_eq!(serial.key(), "serial:/dev/ttyUSB0");

        let ble = ConnectionTarget::Ble {
            address: "AA:BB:CC:DD:EE:FF".to_string(),
            name: Some("Meshtastic_1a2b".to_string()),
        };
        assert_eq!(ble.transport(), Transport::Ble);
        assert_eq!(ble.address(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_hidden_ble_address_resolves_by_name() {
        assert_eq!(
            BleLookup::resolve("AA:BB:CC:DD:EE:FF", Some("Meshtastic_1a2b")),
            BleLookup::MacAddress("AA:BB:CC:DD:EE:FF".to_string())
        );
        assert_eq!(
            BleLookup::resolve(NIL_BLE_ADDRESS, Some("Meshtastic_1a2b")),
            BleLookup::Name("Meshtastic_1a2b".to_string())
        );
        // Nothing better to go on
        assert_eq!(
            BleLookup::resolve(NIL_BLE_ADDRESS, None),
            BleLookup::MacAddress(NIL_BLE_ADDRESS.to_string())
        );

        let first = ConnectionTarget::Ble {
            address: NIL_BLE_ADDRESS.to_string(),
            name: Some("Meshtastic_aa11".to_string()),
        };
        let second = ConnectionTarget::Ble {
            address: NIL_BLE_ADDRESS.to_string(),
            name: Some("Meshtastic_bb22".to_string()),
        };
        assert_eq!(first.address(), "Meshtastic_aa11");
        assert_ne!(first.key(), second.key());
    }

    #[test]
    fn test_same_address_different_transport_keys_differ() {
        let serial = ConnectionTarget::serial("localhost:4403");
        let tcp = ConnectionTarget::tcp("localhost", 4403);
        assert_eq!(serial.address(), tcp.address());
        assert_ne!(serial.key(), tcp.key());
    }
}

#[cfg(test)]
mod state_tests {
    use crate::connection::apply_from_radio;
    use crate::protobufs;
    use crate::state::DeviceState;
    use anyhow::{Context, Result};
    use meshtastic::Message;

    const MY_NODE: u32 = 0x1234abcd;

    fn from_radio(variant: protobufs::from_radio::PayloadVariant) -> protobufs::FromRadio {
        protobufs::FromRadio {
            payload_variant: Some(variant),
            ..Default::default()
        }
    }

    fn my_info() -> protobufs::FromRadio {
        from_radio(protobufs::from_radio::PayloadVariant::MyInfo(
            protobufs::MyNodeInfo {
                my_node_num: MY_NODE,
                reboot_count: 4,
                ..Default::default()
            },
        ))
    }

    fn node_info(num: u32, long_name: &str, short_name: &str, last_heard: u32) -> protobufs::FromRadio {
        from_radio(protobufs::from_radio::PayloadVariant::NodeInfo(
            protobufs::NodeInfo {
                num,
                user: Some(protobufs::User {
                    id: format!("!{num:08x}"),
                    long_name: long_name.to_string(),
                    short_name: short_name.to_string(),
                    ..Default::default()
                }),
                last_heard,
                snr: 6.5,
                ..Default::default()
            },
        ))
    }

    #[test]
    fn test_names_unknown_until_my_node_reported() -> Result<()> {
        let mut state = DeviceState::new();
        assert!(state.long_name().is_none());

        apply_from_radio(&mut state, node_info(MY_NODE, "Base Camp", "BASE", 100));
        assert!(state.long_name().is_none(), "my node number not known yet");

        apply_from_radio(&mut state, my_info());
        assert_eq!(state.long_name(), Some("Base Camp"));
        assert_eq!(state.short_name(), Some("BASE"));

        let info = state.my_node_info.context("My node info not found")?;
        assert_eq!(info.node_id, "1234abcd");
        assert_eq!(info.reboot_count, 4);
        Ok(())
    }

    #[test]
    fn test_empty_names_are_unknown() {
        let mut state = DeviceState::new();
        apply_from_radio(&mut state, my_info());
        apply_from_radio(&mut state, node_info(MY_NODE, "", "", 0));
        assert!(state.long_name().is_none());
        assert!(state.short_name().is_none());
    }

    #[test]
    fn test_empty_packet_is_ignored() {
        let mut state = DeviceState::new();
        apply_from_radio(&mut state, protobufs::FromRadio::default());
        assert!(state.nodes.is_empty());
        assert!(state.my_node_info.is_none());
    }

    #[test]
    fn test_channel_update_replaces_by_index() -> Result<()> {
        let mut state = DeviceState::new();
        let channel = |name: &str| {
            from_radio(protobufs::from_radio::PayloadVariant::Channel(
                protobufs::Channel {
                    index: 0,
                    settings: Some(protobufs::ChannelSettings {
                        name: name.to_string(),
                        psk: vec![1],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ))
        };

        apply_from_radio(&mut state, channel(""));
        apply_from_radio(&mut state, channel("LongFast"));

        assert_eq!(state.channels.len(), 1);
        let stored = state.channels.first().context("Channel not found")?;
        assert_eq!(stored.name, "LongFast");
        assert!(stored.has_psk);
        Ok(())
    }

    #[test]
    fn test_unnamed_channel_gets_index_name() -> Result<()> {
        let mut state = DeviceState::new();
        apply_from_radio(
            &mut state,
            from_radio(protobufs::from_radio::PayloadVariant::Channel(
                protobufs::Channel {
                    index: 2,
                    ..Default::default()
                },
            )),
        );
        let stored = state.channels.first().context("Channel not found")?;
        assert_eq!(stored.name, "Channel 2");
        assert!(!stored.has_psk);
        Ok(())
    }

    #[test]
    fn test_metadata_and_lora_config() -> Result<()> {
        let mut state = DeviceState::new();
        apply_from_radio(
            &mut state,
            from_radio(protobufs::from_radio::PayloadVariant::Metadata(
                protobufs::DeviceMetadata {
                    firmware_version: "2.5.6.d55c08d".to_string(),
                    has_bluetooth: true,
                    ..Default::default()
                },
            )),
        );
        apply_from_radio(
            &mut state,
            from_radio(protobufs::from_radio::PayloadVariant::Config(
                protobufs::Config {
                    payload_variant: Some(protobufs::config::PayloadVariant::Lora(
                        protobufs::config::LoRaConfig {
                            hop_limit: 3,
                            tx_enabled: true,
                            ..Default::default()
                        },
                    )),
                    ..Default::default()
                },
            )),
        );

        let metadata = state.metadata.as_ref().context("Metadata not found")?;
        assert_eq!(metadata.firmware_version, "2.5.6.d55c08d");
        assert!(metadata.has_bluetooth);

        let lora = state.lora.as_ref().context("LoRa summary not found")?;
        assert_eq!(lora.hop_limit, 3);
        assert!(lora.tx_enabled);
        Ok(())
    }

    #[test]
    fn test_telemetry_only_tracked_for_my_node() -> Result<()> {
        let mut state = DeviceState::new();
        apply_from_radio(&mut state, my_info());

        let telemetry_from = |from: u32, battery: u32| {
            let telemetry = protobufs::Telemetry {
                variant: Some(protobufs::telemetry::Variant::DeviceMetrics(
                    protobufs::DeviceMetrics {
                        battery_level: Some(battery),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            };
            from_radio(protobufs::from_radio::PayloadVariant::Packet(
                protobufs::MeshPacket {
                    from,
                    payload_variant: Some(protobufs::mesh_packet::PayloadVariant::Decoded(
                        protobufs::Data {
                            portnum: protobufs::PortNum::TelemetryApp as i32,
                            payload: telemetry.encode_to_vec(),
                            ..Default::default()
                        },
                    )),
                    ..Default::default()
                },
            ))
        };

        apply_from_radio(&mut state, telemetry_from(0x99999999, 12));
        assert!(state.device_metrics.is_none());

        apply_from_radio(&mut state, telemetry_from(MY_NODE, 87));
        let metrics = state.device_metrics.context("Device metrics not found")?;
        assert_eq!(metrics.battery_level, Some(87));
        Ok(())
    }

    #[test]
    fn test_nodes_sorted_by_last_heard() {
        let mut state = DeviceState::new();
        apply_from_radio(&mut state, node_info(1, "Old", "OLD", 100));
        apply_from_radio(&mut state, node_info(2, "New", "NEW", 300));
        apply_from_radio(&mut state, node_info(3, "Never", "NVR", 0));

        let order: Vec<u32> = state.nodes_by_last_heard().iter().map(|n| n.num).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn test_summary_rows() -> Result<()> {
        let mut state = DeviceState::new();
        let value = |state: &DeviceState, label: &str| {
            state
                .summary_rows()
                .into_iter()
                .find(|(l, _)| *l == label)
                .map(|(_, v)| v)
        };

        assert_eq!(value(&state, "Long Name").as_deref(), Some("Unknown"));
        assert_eq!(value(&state, "Known Nodes").as_deref(), Some("0"));
        assert!(value(&state, "Region").is_none());

        apply_from_radio(&mut state, my_info());
        apply_from_radio(&mut state, node_info(MY_NODE, "Base Camp", "BASE", 100));

        assert_eq!(value(&state, "Long Name").as_deref(), Some("Base Camp"));
        assert_eq!(value(&state, "Node ID").as_deref(), Some("!1234abcd"));
        assert_eq!(value(&state, "Known Nodes").as_deref(), Some("1"));
        assert_eq!(
            value(&state, "Reboot Count").context("Reboot count row missing")?,
            "4"
        );
        Ok(())
    }

    #[test]
    fn test_battery_above_100_reads_powered() -> Result<()> {
        let mut state = DeviceState::new();
        state.set_device_metrics(crate::state::DeviceMetrics {
            battery_level: Some(101),
            voltage: None,
            channel_utilization: None,
            air_util_tx: None,
            uptime_seconds: None,
        });
        let battery = state
            .summary_rows()
            .into_iter()
            .find(|(label, _)| *label == "Battery")
            .context("Battery row missing")?;
        assert_eq!(battery.1, "Powered");
        Ok(())
    }
}

#[cfg(test)]
mod serial_discovery_tests {
    use crate::discovery::serial::{UsbSerialPort, group_known_hardware, supported_vendor_ids};
    use anyhow::{Context, Result};

    fn usb(port: &str, vid: u16, pid: u16, serial: Option<&str>) -> UsbSerialPort {
        UsbSerialPort {
            port_name: port.to_string(),
            vendor_id: vid,
            product_id: pid,
            serial_number: serial.map(str::to_string),
        }
    }

    #[test]
    fn test_supported_vendor_ids_are_unique_hex() {
        let vids = supported_vendor_ids();
        assert!(vids.contains(&"1a86".to_string()));
        assert!(vids.contains(&"239a".to_string()));
        let mut deduped = vids.clone();
        deduped.dedup();
        assert_eq!(vids, deduped);
    }

    #[test]
    fn test_ports_of_one_device_are_grouped() -> Result<()> {
        let ports = vec![
            usb("/dev/ttyACM0", 0x239a, 0x8029, Some("F1E2D3")),
            usb("/dev/ttyACM1", 0x239a, 0x8029, Some("F1E2D3")),
        ];
        let devices = group_known_hardware(&ports);
        assert_eq!(devices.len(), 1);

        let device = devices.first().context("Device not found")?;
        assert_eq!(device.label(), "RAK 4631 19003 (nrf52)");
        assert_eq!(device.ports, vec!["/dev/ttyACM0", "/dev/ttyACM1"]);
        Ok(())
    }

    #[test]
    fn test_unknown_vendor_is_skipped() {
        let ports = vec![usb("/dev/ttyUSB3", 0x0403, 0x6001, None)];
        assert!(group_known_hardware(&ports).is_empty());
    }

    #[test]
    fn test_shared_usb_bridge_lists_every_candidate() -> Result<()> {
        let ports = vec![usb("/dev/ttyUSB0", 0x1a86, 0x55d4, None)];
        let devices = group_known_hardware(&ports);
        let device = devices.first().context("Device not found")?;
        assert_eq!(device.name, "T-Beam / T-Lora / Meshtastic DIY / Nano G1");
        assert_eq!(device.device_class, "esp32");
        Ok(())
    }

    #[test]
    fn test_ports_without_serial_number_are_separate_devices() {
        let ports = vec![
            usb("/dev/ttyUSB0", 0x10c4, 0xea60, None),
            usb("/dev/ttyUSB1", 0x10c4, 0xea60, None),
        ];
        assert_eq!(group_known_hardware(&ports).len(), 2);
    }

    #[test]
    fn test_vendor_match_without_exact_product() -> Result<()> {
        let ports = vec![usb("/dev/ttyACM0", 0x2886, 0x1234, Some("X1"))];
        let devices = group_known_hardware(&ports);
        let device = devices.first().context("Device not found")?;
        assert_eq!(device.name, "Seeed Xiao ESP32-S3");
        Ok(())
    }
}

#[cfg(test)]
mod registry_tests {
    use crate::connection::{DeviceHandle, MeshDevice};
    use crate::registry::DeviceRegistry;
    use crate::state::DeviceState;
    use crate::transport::ConnectionTarget;
    use anyhow::{Context, Result};
    use std::sync::Arc;

    struct FakeDevice {
        target: ConnectionTarget,
    }

    impl MeshDevice for FakeDevice {
        fn target(&self) -> &ConnectionTarget {
            &self.target
        }

        fn state(&self) -> DeviceState {
            DeviceState::new()
        }
    }

    fn device(target: ConnectionTarget) -> DeviceHandle {
        Arc::new(FakeDevice { target })
    }

    #[test]
    fn test_register_and_lookup() -> Result<()> {
        let mut registry = DeviceRegistry::new();
        assert!(registry.is_empty());

        let replaced = registry.register_device(device(ConnectionTarget::tcp("localhost", 4403)));
        assert!(replaced.is_none());
        assert_eq!(registry.len(), 1);

        let entry = registry
            .get("tcp:localhost:4403")
            .context("Device not registered")?;
        assert_eq!(entry.handle.address(), "localhost:4403");
        Ok(())
    }

    #[test]
    fn test_same_key_replaces_previous_handle() -> Result<()> {
        let mut registry = DeviceRegistry::new();
        let first = device(ConnectionTarget::serial("/dev/ttyUSB0"));
        registry.register_device(first.clone());

        let replaced = registry
            .register_device(device(ConnectionTarget::serial("/dev/ttyUSB0")))
            .context("Expected previous handle")?;
        assert!(Arc::ptr_eq(&replaced, &first));
        assert_eq!(registry.len(), 1);
        Ok(())
    }

    #[test]
    fn test_devices_with_same_name_do_not_collide() {
        let mut registry = DeviceRegistry::new();
        registry.register_device(device(ConnectionTarget::serial("/dev/ttyUSB0")));
        registry.register_device(device(ConnectionTarget::serial("/dev/ttyUSB1")));
        assert_eq!(registry.len(), 2);

        // Neither radio reported a name, so both display their address
        let names: Vec<String> = registry.iter().map(|(_, d)| d.handle.display_name()).collect();
        assert!(names.contains(&"/dev/ttyUSB0".to_string()));
        assert!(names.contains(&"/dev/ttyUSB1".to_string()));
    }
}

#[cfg(test)]
mod io_runner_tests {
    use crate::io_runner::IoRunner;
    use anyhow::Result;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, mpsc};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_completion_callback_runs_on_io_thread() -> Result<()> {
        let runner = IoRunner::start()?;
        let (tx, rx) = mpsc::channel();

        runner.handle().submit_with(async { 21 * 2 }, move |value| {
            let thread = std::thread::current().name().map(str::to_string);
            let _ = tx.send((value, thread));
        });

        let (value, thread) = rx.recv_timeout(WAIT)?;
        assert_eq!(value, 42);
        assert_eq!(thread.as_deref(), Some(crate::io_runner::IO_THREAD_NAME));
        Ok(())
    }

    #[test]
    fn test_submit_does_not_block_caller() -> Result<()> {
        let runner = IoRunner::start()?;
        let (tx, rx) = mpsc::channel();

        let task = runner.handle().submit(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(());
        });

        assert!(!task.is_finished());
        rx.recv_timeout(WAIT)?;
        Ok(())
    }

    #[test]
    fn test_cancel_drops_the_task() -> Result<()> {
        struct DropFlag(Arc<AtomicBool>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let runner = IoRunner::start()?;
        let dropped = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = mpsc::channel();
        let flag = DropFlag(dropped.clone());

        let task = runner.handle().submit(async move {
            let _flag = flag;
            let _ = started_tx.send(());
            std::future::pending::<()>().await;
        });
        started_rx.recv_timeout(WAIT)?;

        task.cancel();
        let deadline = std::time::Instant::now() + WAIT;
        while !(dropped.load(Ordering::SeqCst) && task.is_finished())
            && std::time::Instant::now() < deadline
        {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(dropped.load(Ordering::SeqCst));
        assert!(task.is_finished());
        Ok(())
    }

    #[test]
    fn test_shutdown_joins_thread() -> Result<()> {
        let mut runner = IoRunner::start()?;
        let handle = runner.handle();
        runner.shutdown();
        // Submitting after shutdown must not panic or run anything
        let (tx, rx) = mpsc::channel::<()>();
        handle.submit(async move {
            let _ = tx.send(());
        });
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        Ok(())
    }
}

#[cfg(test)]
mod ble_discovery_tests {
    use crate::discovery::ble::{DiscoveredPeer, PeerTracker};

    fn peer(address: &str) -> DiscoveredPeer {
        DiscoveredPeer {
            name: Some("Meshtastic_1a2b".to_string()),
            address: address.to_string(),
            rssi: Some(-55),
        }
    }

    #[test]
    fn test_peer_without_properties_is_retried() {
        let mut tracker = PeerTracker::new();

        // First advertisement arrived before its properties were readable
        assert!(tracker.observe(7u32, None).is_none());
        assert!(!tracker.knows(&7));

        let listed = tracker.observe(7, Some(peer("AA:BB:CC:DD:EE:FF")));
        assert_eq!(listed, Some(peer("AA:BB:CC:DD:EE:FF")));
        assert!(tracker.knows(&7));
    }

    #[test]
    fn test_peer_listed_once() {
        let mut tracker = PeerTracker::new();
        assert!(tracker.observe(1u32, Some(peer("AA:BB:CC:DD:EE:01"))).is_some());
        assert!(tracker.observe(1, Some(peer("AA:BB:CC:DD:EE:01"))).is_none());
        assert!(tracker.observe(2, Some(peer("AA:BB:CC:DD:EE:02"))).is_some());
    }
}
