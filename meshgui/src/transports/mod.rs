//! Per-transport candidate pickers shown inside the connect dialog.

pub mod ble;
pub mod serial;
pub mod tcp;

use eframe::egui;
use meshgui_core::{ConnectionTarget, Transport};

use crate::context::AppContext;

pub use ble::BlePicker;
pub use serial::SerialPicker;
pub use tcp::TcpPicker;

/// Identifier of a candidate row, unique within one picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId(u32);

#[derive(Debug, Default)]
pub(crate) struct RowIds {
    next: u32,
}

impl RowIds {
    pub(crate) fn next(&mut self) -> RowId {
        self.next += 1;
        RowId(self.next)
    }
}

/// The one picker currently mounted in the connect dialog.
pub enum TransportPicker {
    Serial(SerialPicker),
    Ble(BlePicker),
    Tcp(TcpPicker),
}

impl TransportPicker {
    /// Build the picker for `transport` and start its discovery.
    pub fn mount(transport: Transport, ctx: &AppContext) -> Self {
        match transport {
            Transport::Serial => Self::Serial(SerialPicker::new(ctx.ports.clone())),
            Transport::Ble => Self::Ble(BlePicker::start(
                &ctx.io,
                ctx.scanner.clone(),
                ctx.scan_duration,
            )),
            Transport::Tcp => Self::Tcp(TcpPicker::new(ctx.tcp_host.clone(), ctx.tcp_port)),
        }
    }

    /// Stop any background work the picker owns.
    pub fn unmount(&mut self) {
        if let Self::Ble(picker) = self {
            picker.stop_scan();
        }
    }

    pub fn transport(&self) -> Transport {
        match self {
            Self::Serial(_) => Transport::Serial,
            Self::Ble(_) => Transport::Ble,
            Self::Tcp(_) => Transport::Tcp,
        }
    }

    /// What to connect to, or `None` when the selection is missing or invalid.
    pub fn connect_target(&self) -> Option<ConnectionTarget> {
        match self {
            Self::Serial(picker) => picker.connect_target(),
            Self::Ble(picker) => picker.connect_target(),
            Self::Tcp(picker) => picker.connect_target(),
        }
    }

    /// Apply results posted by background discovery.
    pub fn poll(&mut self) {
        if let Self::Ble(picker) = self {
            picker.poll();
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        match self {
            Self::Serial(picker) => picker.show(ui),
            Self::Ble(picker) => picker.show(ui),
            Self::Tcp(picker) => picker.show(ui),
        }
    }
}
