//! Serial/USB candidate discovery.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// A USB radio model the firmware ships for, identified by its USB bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedDevice {
    pub name: &'static str,
    pub device_class: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,
}

const fn supported(
    name: &'static str,
    device_class: &'static str,
    vendor_id: u16,
    product_id: u16,
) -> SupportedDevice {
    SupportedDevice {
        name,
        device_class,
        vendor_id,
        product_id,
    }
}

pub const SUPPORTED_DEVICES: &[SupportedDevice] = &[
    supported("T-Beam", "esp32", 0x1a86, 0x55d4),
    supported("T-Lora", "esp32", 0x1a86, 0x55d4),
    supported("Meshtastic DIY", "esp32", 0x1a86, 0x55d4),
    supported("Nano G1", "esp32", 0x1a86, 0x55d4),
    supported("Heltec", "esp32", 0x10c4, 0xea60),
    supported("RAK 19007", "esp32", 0x1a86, 0x7523),
    supported("T-Echo", "nrf52", 0x239a, 0x0029),
    supported("RAK 4631", "nrf52", 0x239a, 0x0029),
    supported("RAK 4631 19003", "nrf52", 0x239a, 0x8029),
    supported("Seeed Xiao ESP32-S3", "esp32", 0x2886, 0x0059),
];

/// Unique vendor ids of [`SUPPORTED_DEVICES`], formatted as lowercase hex.
pub fn supported_vendor_ids() -> Vec<String> {
    SUPPORTED_DEVICES
        .iter()
        .map(|d| d.vendor_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|vid| format!("{vid:04x}"))
        .collect()
}

/// One physical radio found on the USB bus and the serial ports it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedDevice {
    pub name: String,
    pub device_class: String,
    pub ports: Vec<String>,
}

impl DetectedDevice {
    pub fn label(&self) -> String {
        format!("{name} ({class})", name = self.name, class = self.device_class)
    }
}

/// A USB serial port as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbSerialPort {
    pub port_name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
}

/// Source of serial connection candidates.
pub trait PortEnumerator: Send + Sync {
    /// Radios whose USB ids match a supported model, with their ports.
    fn detect_known_hardware(&self) -> Result<Vec<DetectedDevice>>;

    /// Every serial port on the system, known hardware or not.
    fn list_serial_ports(&self) -> Result<Vec<String>>;
}

/// Enumerates the ports of the machine we run on.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortEnumerator for SystemPorts {
    fn detect_known_hardware(&self) -> Result<Vec<DetectedDevice>> {
        let ports = serialport::available_ports().context("Failed to list USB serial ports")?;
        let usb_ports: Vec<UsbSerialPort> = ports
            .into_iter()
            .filter_map(|port| match port.port_type {
                serialport::SerialPortType::UsbPort(usb) => Some(UsbSerialPort {
                    port_name: port.port_name,
                    vendor_id: usb.vid,
                    product_id: usb.pid,
                    serial_number: usb.serial_number,
                }),
                _ => None,
            })
            .collect();
        debug!("Found {} USB serial port(s)", usb_ports.len());
        Ok(group_known_hardware(&usb_ports))
    }

    fn list_serial_ports(&self) -> Result<Vec<String>> {
        meshtastic::utils::stream::available_serial_ports().context("Failed to list serial ports")
    }
}

/// Group ports by physical device, keeping only devices with a supported vendor id.
///
/// Ports sharing vendor id, product id and USB serial number belong to the same
/// device. Ports without a serial number each count as their own device.
pub fn group_known_hardware(ports: &[UsbSerialPort]) -> Vec<DetectedDevice> {
    let mut groups: Vec<((u16, u16, String), DetectedDevice)> = Vec::new();

    for port in ports {
        let Some((name, device_class)) = identify(port.vendor_id, port.product_id) else {
            continue;
        };

        let key = (
            port.vendor_id,
            port.product_id,
            port.serial_number
                .clone()
                .unwrap_or_else(|| port.port_name.clone()),
        );

        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, device)) => device.ports.push(port.port_name.clone()),
            None => {
                info!("Found serial device: {}", name);
                groups.push((
                    key,
                    DetectedDevice {
                        name,
                        device_class,
                        ports: vec![port.port_name.clone()],
                    },
                ));
            }
        }
    }

    groups.into_iter().map(|(_, device)| device).collect()
}

/// Name the models a USB id could be. Several boards share one USB bridge, so
/// exact product matches win, then any model with the same vendor id.
fn identify(vendor_id: u16, product_id: u16) -> Option<(String, String)> {
    let same_vendor: Vec<&SupportedDevice> = SUPPORTED_DEVICES
        .iter()
        .filter(|d| d.vendor_id == vendor_id)
        .collect();
    let exact: Vec<&SupportedDevice> = same_vendor
        .iter()
        .copied()
        .filter(|d| d.product_id == product_id)
        .collect();
    let candidates = if exact.is_empty() { same_vendor } else { exact };

    let first = candidates.first()?;
    let mut names: Vec<&str> = Vec::new();
    for device in &candidates {
        if !names.contains(&device.name) {
            names.push(device.name);
        }
    }

    Some((names.join(" / "), first.device_class.to_string()))
}
