use eframe::egui::{self, RichText};
use meshgui_core::ConnectionTarget;
use meshgui_core::discovery::{PortEnumerator, supported_vendor_ids};
use std::sync::Arc;
use tracing::{info, warn};

use super::{RowId, RowIds};

/// Whether a row can be connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTag {
    /// Grouping header for one physical device
    Device,
    /// A serial port path
    Port,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub id: RowId,
    pub label: String,
    pub tag: RowTag,
    pub parent: Option<RowId>,
}

/// Lists serial ports, grouped under known hardware when any is attached.
pub struct SerialPicker {
    ports: Arc<dyn PortEnumerator>,
    rows: Vec<CandidateRow>,
    selected: Option<RowId>,
    ids: RowIds,
}

impl SerialPicker {
    pub fn new(ports: Arc<dyn PortEnumerator>) -> Self {
        let mut picker = Self {
            ports,
            rows: Vec::new(),
            selected: None,
            ids: RowIds::default(),
        };
        picker.refresh();
        picker
    }

    /// Discard the current rows and selection and enumerate again.
    pub fn refresh(&mut self) {
        self.rows.clear();
        self.selected = None;

        info!(
            "Searching for any of VIDs: {}",
            supported_vendor_ids().join(", ")
        );

        let devices = self.ports.detect_known_hardware().unwrap_or_else(|e| {
            warn!("Known hardware detection failed: {:#}", e);
            Vec::new()
        });

        if !devices.is_empty() {
            for device in devices {
                let group = self.push_row(device.label(), RowTag::Device, None);
                for port in device.ports {
                    self.push_row(port, RowTag::Port, Some(group));
                }
            }
            return;
        }

        info!("No known hardware found, listing all serial ports");
        match self.ports.list_serial_ports() {
            Ok(ports) => {
                for port in ports {
                    self.push_row(port, RowTag::Port, None);
                }
            }
            Err(e) => warn!("Serial port enumeration failed: {:#}", e),
        }
    }

    fn push_row(&mut self, label: String, tag: RowTag, parent: Option<RowId>) -> RowId {
        let id = self.ids.next();
        self.rows.push(CandidateRow {
            id,
            label,
            tag,
            parent,
        });
        id
    }

    pub fn rows(&self) -> &[CandidateRow] {
        &self.rows
    }

    pub fn children_of(&self, parent: RowId) -> impl Iterator<Item = &CandidateRow> {
        self.rows.iter().filter(move |row| row.parent == Some(parent))
    }

    pub fn selected(&self) -> Option<RowId> {
        self.selected
    }

    /// Select a row. Unknown ids clear the selection.
    pub fn select(&mut self, id: RowId) {
        self.selected = self.rows.iter().any(|row| row.id == id).then_some(id);
    }

    pub fn connect_target(&self) -> Option<ConnectionTarget> {
        let id = self.selected?;
        let row = self.rows.iter().find(|row| row.id == id)?;
        match row.tag {
            RowTag::Port => Some(ConnectionTarget::serial(row.label.clone())),
            RowTag::Device => None,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Serial ports");
            if ui.small_button("Refresh").clicked() {
                self.refresh();
            }
        });
        ui.separator();

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if self.rows.is_empty() {
                    ui.weak("No serial ports found");
                }

                for row in self.rows.iter().filter(|row| row.parent.is_none()) {
                    let selected = self.selected == Some(row.id);
                    let text = match row.tag {
                        RowTag::Device => RichText::new(&row.label).strong(),
                        RowTag::Port => RichText::new(&row.label).monospace(),
                    };
                    if ui.selectable_label(selected, text).clicked() {
                        clicked = Some(row.id);
                    }

                    if row.tag == RowTag::Device {
                        ui.indent(row.id.0, |ui| {
                            for child in self.children_of(row.id) {
                                let selected = self.selected == Some(child.id);
                                let text = RichText::new(&child.label).monospace();
                                if ui.selectable_label(selected, text).clicked() {
                                    clicked = Some(child.id);
                                }
                            }
                        });
                    }
                }
            });

        if let Some(id) = clicked {
            self.select(id);
        }
    }
}
