use anyhow::Result;
use colored::*;
use comfy_table::{Cell, Table};
use meshgui_core::discovery::{DetectedDevice, PortEnumerator, supported_vendor_ids};
use serde::Serialize;

pub fn print_error(message: &str) {
    eprintln!("{prefix} {message}", prefix = "Error:".red().bold());
}

pub fn print_warning(message: &str) {
    eprintln!("{prefix} {message}", prefix = "⚠".yellow().bold());
}

pub fn print_info(message: &str) {
    eprintln!("{prefix} {message}", prefix = "ℹ".blue().bold());
}

pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

#[derive(Debug, Serialize)]
struct PortReport {
    supported_vendor_ids: Vec<String>,
    known_hardware: Vec<DetectedDevice>,
    serial_ports: Vec<String>,
}

/// Print what the serial picker would offer, without opening a window.
pub fn print_port_report(ports: &dyn PortEnumerator, json: bool) -> Result<()> {
    let known_hardware = ports.detect_known_hardware().unwrap_or_else(|e| {
        print_warning(&format!("Known hardware detection failed: {e:#}"));
        Vec::new()
    });
    let serial_ports = ports.list_serial_ports()?;

    let report = PortReport {
        supported_vendor_ids: supported_vendor_ids(),
        known_hardware,
        serial_ports,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_info(&format!(
        "Searching for any of VIDs: {}",
        report.supported_vendor_ids.join(", ")
    ));

    if report.known_hardware.is_empty() {
        println!("No known Meshtastic hardware detected");
    } else {
        let mut table = create_table();
        table.set_header(vec![Cell::new("Device"), Cell::new("Ports")]);
        for device in &report.known_hardware {
            table.add_row(vec![
                Cell::new(device.label()),
                Cell::new(device.ports.join("\n")),
            ]);
        }
        println!("{table}");
    }

    if report.serial_ports.is_empty() {
        println!("No serial ports found");
    } else {
        let mut table = create_table();
        table.set_header(vec![Cell::new("Serial Port")]);
        for port in &report.serial_ports {
            table.add_row(vec![Cell::new(port)]);
        }
        println!("{table}");
    }

    Ok(())
}
