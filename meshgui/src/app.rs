use eframe::egui;
use meshgui_core::{DeviceHandle, DeviceRegistry};
use std::time::Duration;
use tracing::{info, warn};

use crate::connect_dialog::{ConnectDialog, DialogOutcome};
use crate::context::AppContext;
use crate::device_list::{DeviceList, DeviceListAction};
use crate::device_panel::DevicePanel;

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

/// Main window: device list on the left, details of the selected device in the centre.
pub struct MeshtasticApp {
    ctx: AppContext,
    registry: DeviceRegistry,
    device_list: DeviceList,
    device_panel: DevicePanel,
    connect_dialog: Option<ConnectDialog>,
}

impl MeshtasticApp {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            registry: DeviceRegistry::new(),
            device_list: DeviceList::new(),
            device_panel: DevicePanel::new(),
            connect_dialog: None,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn device_list(&self) -> &DeviceList {
        &self.device_list
    }

    pub fn device_panel(&self) -> &DevicePanel {
        &self.device_panel
    }

    pub fn connect_dialog(&self) -> Option<&ConnectDialog> {
        self.connect_dialog.as_ref()
    }

    pub fn connect_dialog_mut(&mut self) -> Option<&mut ConnectDialog> {
        self.connect_dialog.as_mut()
    }

    /// Open the connect dialog unless it is already showing.
    pub fn open_connect_dialog(&mut self) {
        if self.connect_dialog.is_none() {
            info!("Opening connect dialog");
            self.connect_dialog = Some(ConnectDialog::new(self.ctx.clone()));
        }
    }

    /// Record a new connection in the registry and the device list.
    pub fn register_device(&mut self, handle: DeviceHandle) {
        // The registry logs when this replaces an earlier connection
        self.registry.register_device(handle.clone());
        self.device_list
            .add_row(handle.clone(), handle.transport(), handle.address());
    }

    pub fn select_device(&mut self, handle: &DeviceHandle) {
        match self.registry.get(&handle.target().key()) {
            Some(entry) => self.device_panel.set_device(entry.clone()),
            None => warn!("Selected device {} is not registered", handle.address()),
        }
    }

    pub fn handle_dialog_outcome(&mut self, outcome: DialogOutcome) {
        match outcome {
            DialogOutcome::Open => {}
            DialogOutcome::Cancelled => {
                self.connect_dialog = None;
            }
            DialogOutcome::Connected(handle) => {
                self.connect_dialog = None;
                self.register_device(handle);
            }
        }
    }

    /// Drain background results for the dialog without drawing it.
    pub fn poll_dialog(&mut self) {
        if let Some(dialog) = self.connect_dialog.as_mut() {
            let outcome = dialog.poll();
            self.handle_dialog_outcome(outcome);
        }
    }
}

impl eframe::App for MeshtasticApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Background results only arrive through polling
        ctx.request_repaint_after(REPAINT_INTERVAL);

        egui::SidePanel::left("device_list")
            .resizable(true)
            .default_width(460.0)
            .min_width(320.0)
            .show(ctx, |ui| match self.device_list.show(ui) {
                Some(DeviceListAction::AddDevice) => self.open_connect_dialog(),
                Some(DeviceListAction::Selected(handle)) => self.select_device(&handle),
                None => {}
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.device_panel.show(ui);
        });

        if let Some(dialog) = self.connect_dialog.as_mut() {
            let outcome = dialog.show(ctx);
            self.handle_dialog_outcome(outcome);
        }
    }
}
