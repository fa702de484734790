use eframe::egui::{self, Id, RichText};
use meshgui_core::{ConnectError, ConnectionTarget, DeviceHandle, TaskHandle, Transport};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::context::AppContext;
use crate::transports::TransportPicker;

pub const FAILED_TITLE: &str = "Could Not Connect";
pub const FAILED_MESSAGE: &str = "Failed to connect to the selected device.";

/// What the main window should do with the dialog after a frame.
pub enum DialogOutcome {
    Open,
    Cancelled,
    Connected(DeviceHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAttempt {
    Started,
    /// An attempt is already in flight
    Busy,
    /// Nothing connectable is selected
    NoSelection,
}

struct PendingConnect {
    target: ConnectionTarget,
    result: Receiver<Result<DeviceHandle, ConnectError>>,
    task: TaskHandle,
}

/// Modal that picks a transport and a candidate, then connects to it.
pub struct ConnectDialog {
    ctx: AppContext,
    picker: TransportPicker,
    pending: Option<PendingConnect>,
    warning: Option<String>,
}

impl ConnectDialog {
    pub fn new(ctx: AppContext) -> Self {
        let picker = TransportPicker::mount(Transport::Serial, &ctx);
        Self {
            ctx,
            picker,
            pending: None,
            warning: None,
        }
    }

    pub fn transport(&self) -> Transport {
        self.picker.transport()
    }

    pub fn picker(&self) -> &TransportPicker {
        &self.picker
    }

    pub fn picker_mut(&mut self) -> &mut TransportPicker {
        &mut self.picker
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn is_connecting(&self) -> bool {
        self.pending.is_some()
    }

    /// Unmount the current picker and mount the one for `transport`.
    pub fn select_transport(&mut self, transport: Transport) {
        if transport == self.transport() {
            return;
        }
        info!("Switching connection interface to {}", transport);
        self.picker.unmount();
        self.picker = TransportPicker::mount(transport, &self.ctx);
    }

    /// Start connecting to the selected candidate on the I/O runner.
    pub fn attempt_connect(&mut self) -> ConnectAttempt {
        if self.pending.is_some() {
            debug!("Connect requested while another attempt is in flight");
            return ConnectAttempt::Busy;
        }

        let Some(target) = self.picker.connect_target() else {
            warn!("No connectable {} candidate selected", self.transport());
            self.warning = Some(FAILED_MESSAGE.to_string());
            return ConnectAttempt::NoSelection;
        };

        info!("Connecting to {}", target.key());
        let (tx, rx) = mpsc::channel();
        let connector = self.ctx.connector.clone();
        let open_target = target.clone();

        let task = self.ctx.io.submit_with(
            async move { connector.open(open_target).await },
            move |result| {
                let _ = tx.send(result);
            },
        );

        self.warning = None;
        self.pending = Some(PendingConnect {
            target,
            result: rx,
            task,
        });
        ConnectAttempt::Started
    }

    /// Pick up discovery results and the outcome of a pending connect.
    pub fn poll(&mut self) -> DialogOutcome {
        self.picker.poll();

        let Some(pending) = &self.pending else {
            return DialogOutcome::Open;
        };

        let failure = match pending.result.try_recv() {
            Err(TryRecvError::Empty) => return DialogOutcome::Open,
            Ok(Ok(handle)) => {
                info!("Connected to {}", pending.target.key());
                self.pending = None;
                return DialogOutcome::Connected(handle);
            }
            Ok(Err(e)) => anyhow::Error::from(e),
            Err(TryRecvError::Disconnected) => anyhow::anyhow!("connect task ended without a result"),
        };

        warn!("Connection to {} failed: {:#}", pending.target.key(), failure);
        self.pending = None;
        self.warning = Some(FAILED_MESSAGE.to_string());
        DialogOutcome::Open
    }

    pub fn dismiss_warning(&mut self) {
        self.warning = None;
    }

    /// Render the dialog and report what happened this frame.
    pub fn show(&mut self, ctx: &egui::Context) -> DialogOutcome {
        let outcome = self.poll();
        if !matches!(outcome, DialogOutcome::Open) {
            return outcome;
        }

        let mut cancelled = false;
        let modal = egui::Modal::new(Id::new("connect_dialog")).show(ctx, |ui| {
            ui.set_width(560.0);
            ui.heading("Add Meshtastic Device");
            ui.separator();

            ui.horizontal_top(|ui| {
                ui.group(|ui| {
                    ui.vertical(|ui| {
                        ui.label(RichText::new("Connection Interface").strong());
                        let mut choice = self.transport();
                        for transport in Transport::iter() {
                            ui.radio_value(&mut choice, transport, transport.to_string());
                        }
                        if choice != self.transport() {
                            self.select_transport(choice);
                        }
                    });
                });

                ui.vertical(|ui| {
                    ui.set_min_height(260.0);
                    ui.set_max_height(260.0);
                    self.picker.show(ui);
                });
            });

            ui.separator();
            ui.horizontal(|ui| {
                let connecting = self.is_connecting();
                if ui
                    .add_enabled(!connecting, egui::Button::new("Connect"))
                    .clicked()
                {
                    self.attempt_connect();
                }
                if connecting {
                    ui.add(egui::Spinner::new());
                    ui.label("Connecting...");
                }
                if ui.button("Cancel").clicked() {
                    cancelled = true;
                }
            });
        });

        if let Some(message) = self.warning.clone() {
            let warning = egui::Modal::new(Id::new("connect_warning")).show(ctx, |ui| {
                ui.label(RichText::new(FAILED_TITLE).strong());
                ui.label(message);
                ui.button("OK").clicked()
            });
            if warning.inner || warning.should_close() {
                self.dismiss_warning();
            }
        } else if modal.should_close() {
            cancelled = true;
        }

        if cancelled {
            info!("Connect dialog cancelled");
            return DialogOutcome::Cancelled;
        }
        DialogOutcome::Open
    }
}

impl Drop for ConnectDialog {
    fn drop(&mut self) {
        self.picker.unmount();
        if let Some(pending) = self.pending.take() {
            debug!("Abandoning connect attempt to {}", pending.target.key());
            pending.task.cancel();
        }
    }
}
