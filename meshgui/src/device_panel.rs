use chrono::{DateTime, Local};
use eframe::egui;
use meshgui_core::registry::RegisteredDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelTab {
    #[default]
    Summary,
    Nodes,
}

impl PanelTab {
    pub fn label(self) -> &'static str {
        match self {
            Self::Summary => "Device Summary",
            Self::Nodes => "Nodes",
        }
    }
}

/// Detail view for the device selected in the list.
#[derive(Default)]
pub struct DevicePanel {
    device: Option<RegisteredDevice>,
    tab: PanelTab,
}

impl DevicePanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_device(&mut self, device: RegisteredDevice) {
        self.device = Some(device);
    }

    pub fn device(&self) -> Option<&RegisteredDevice> {
        self.device.as_ref()
    }

    pub fn tab(&self) -> PanelTab {
        self.tab
    }

    /// Label/value pairs for the summary tab, empty when nothing is selected.
    pub fn summary_rows(&self) -> Vec<(&'static str, String)> {
        let Some(device) = &self.device else {
            return Vec::new();
        };

        let mut rows = device.handle.state().summary_rows();
        rows.push(("Interface", device.handle.transport().to_string()));
        rows.push(("Address", device.handle.address()));
        rows.push((
            "Connected",
            device.connected_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ));
        rows
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let Some(device) = &self.device else {
            ui.centered_and_justified(|ui| {
                ui.weak("Select a device to see its details");
            });
            return;
        };

        ui.heading(device.handle.display_name());
        ui.horizontal(|ui| {
            for tab in [PanelTab::Summary, PanelTab::Nodes] {
                ui.selectable_value(&mut self.tab, tab, tab.label());
            }
        });
        ui.separator();

        match self.tab {
            PanelTab::Summary => self.show_summary(ui),
            PanelTab::Nodes => self.show_nodes(ui),
        }
    }

    fn show_summary(&self, ui: &mut egui::Ui) {
        egui::Grid::new("device_summary")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for (label, value) in self.summary_rows() {
                    ui.strong(label);
                    ui.label(value);
                    ui.end_row();
                }
            });
    }

    fn show_nodes(&self, ui: &mut egui::Ui) {
        let Some(device) = &self.device else {
            return;
        };
        let state = device.handle.state();
        let nodes = state.nodes_by_last_heard();

        if nodes.is_empty() {
            ui.weak("No nodes heard yet");
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Grid::new("device_nodes")
                    .num_columns(5)
                    .striped(true)
                    .show(ui, |ui| {
                        ui.strong("ID");
                        ui.strong("Long Name");
                        ui.strong("Short Name");
                        ui.strong("Last Heard");
                        ui.strong("SNR");
                        ui.end_row();

                        for node in nodes {
                            ui.monospace(&node.id);
                            ui.label(&node.user.long_name);
                            ui.label(&node.user.short_name);
                            ui.label(format_last_heard(node.last_heard));
                            ui.label(
                                node.snr
                                    .map(|snr| format!("{snr:.1} dB"))
                                    .unwrap_or_else(|| "-".to_string()),
                            );
                            ui.end_row();
                        }
                    });
            });
    }
}

pub fn format_last_heard(last_heard: Option<u64>) -> String {
    last_heard
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "Never".to_string())
}
