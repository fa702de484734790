use eframe::egui;
use meshgui_core::ConnectionTarget;

/// Host and port entry for radios reachable over the network.
#[derive(Debug, Clone)]
pub struct TcpPicker {
    pub host: String,
    pub port: String,
}

impl TcpPicker {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port: port.to_string(),
        }
    }

    pub fn connect_target(&self) -> Option<ConnectionTarget> {
        let host = self.host.trim();
        if host.is_empty() {
            return None;
        }
        let port = self.port.trim().parse::<u16>().ok()?;
        Some(ConnectionTarget::tcp(host, port))
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        ui.label("Address");
        ui.add(egui::TextEdit::singleline(&mut self.host).desired_width(f32::INFINITY));
        ui.label("Port");
        ui.add(egui::TextEdit::singleline(&mut self.port).desired_width(f32::INFINITY));
    }
}
