use eframe::egui;
use meshgui_core::{DeviceHandle, Transport};

pub const STATUS_CONNECTED: &str = "Connected";

/// One connected radio as shown in the list.
#[derive(Clone)]
pub struct DeviceRow {
    pub handle: DeviceHandle,
    pub status: &'static str,
    pub transport: Transport,
    pub address: String,
}

impl DeviceRow {
    pub fn name(&self) -> String {
        self.handle.display_name()
    }
}

pub enum DeviceListAction {
    AddDevice,
    Selected(DeviceHandle),
}

/// Left-hand list of every radio connected this session.
#[derive(Default)]
pub struct DeviceList {
    rows: Vec<DeviceRow>,
    selected: Option<usize>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row for a newly connected device. Returns its index.
    pub fn add_row(&mut self, handle: DeviceHandle, transport: Transport, address: String) -> usize {
        self.rows.push(DeviceRow {
            handle,
            status: STATUS_CONNECTED,
            transport,
            address,
        });
        self.rows.len() - 1
    }

    pub fn rows(&self) -> &[DeviceRow] {
        &self.rows
    }

    pub fn selected(&self) -> Option<&DeviceRow> {
        self.selected.and_then(|index| self.rows.get(index))
    }

    pub fn select(&mut self, index: usize) -> Option<DeviceHandle> {
        let row = self.rows.get(index)?;
        self.selected = Some(index);
        Some(row.handle.clone())
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> Option<DeviceListAction> {
        let mut action = None;

        ui.horizontal(|ui| {
            ui.heading("Meshtastic Devices");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Add Device").clicked() {
                    action = Some(DeviceListAction::AddDevice);
                }
            });
        });
        ui.separator();

        if self.rows.is_empty() {
            ui.weak("No devices connected. Use Add Device to connect one.");
            return action;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Grid::new("device_list")
                    .num_columns(4)
                    .striped(true)
                    .show(ui, |ui| {
                        ui.strong("Device");
                        ui.strong("Status");
                        ui.strong("Interface");
                        ui.strong("Address");
                        ui.end_row();

                        for (index, row) in self.rows.iter().enumerate() {
                            let selected = self.selected == Some(index);
                            if ui.selectable_label(selected, row.name()).clicked() {
                                clicked = Some(index);
                            }
                            ui.label(row.status);
                            ui.label(row.transport.to_string());
                            ui.monospace(&row.address);
                            ui.end_row();
                        }
                    });
            });

        if let Some(index) = clicked
            && let Some(handle) = self.select(index)
        {
            action = Some(DeviceListAction::Selected(handle));
        }
        action
    }
}
