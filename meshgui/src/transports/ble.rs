use eframe::egui;
use meshgui_core::discovery::{DiscoveredPeer, PeerScanner, ScanEvent};
use meshgui_core::{ConnectionTarget, IoHandle};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{RowId, RowIds};

#[derive(Debug, Clone, PartialEq)]
pub struct PeerRow {
    pub id: RowId,
    pub peer: DiscoveredPeer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    Scanning,
    Complete,
    Failed(String),
}

/// Lists radios found by a Bluetooth scan running on the I/O runner.
///
/// The scan posts [`ScanEvent`]s to a channel; [`BlePicker::poll`] drains it on
/// the UI thread. Dropping the picker cancels the scan, which still lets the
/// scanner stop the adapter before it returns.
pub struct BlePicker {
    rows: Vec<PeerRow>,
    selected: Option<RowId>,
    ids: RowIds,
    status: ScanStatus,
    started: Instant,
    duration: Duration,
    events: Receiver<ScanEvent>,
    cancel: CancellationToken,
}

impl BlePicker {
    pub fn start(io: &IoHandle, scanner: Arc<dyn PeerScanner>, duration: Duration) -> Self {
        info!("Starting Bluetooth discovery");
        let (tx, rx) = mpsc::channel();
        let found = tx.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        io.submit_with(
            async move { scanner.scan(duration, found, token).await },
            move |result| {
                let finished = result.map_err(|e| format!("{e:#}"));
                let _ = tx.send(ScanEvent::Finished(finished));
            },
        );

        Self {
            rows: Vec::new(),
            selected: None,
            ids: RowIds::default(),
            status: ScanStatus::Scanning,
            started: Instant::now(),
            duration,
            events: rx,
            cancel,
        }
    }

    /// Apply every event the scan has posted since the last call.
    pub fn poll(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(ScanEvent::PeerFound(peer)) => {
                    debug!("Listing Bluetooth peer {}", peer.address);
                    let id = self.ids.next();
                    self.rows.push(PeerRow { id, peer });
                }
                Ok(ScanEvent::Finished(Ok(()))) => {
                    info!("Bluetooth scan complete, {} peer(s) found", self.rows.len());
                    self.status = ScanStatus::Complete;
                }
                Ok(ScanEvent::Finished(Err(reason))) => {
                    warn!("Bluetooth scan failed: {}", reason);
                    self.status = ScanStatus::Failed(reason);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.status == ScanStatus::Scanning {
                        self.status = ScanStatus::Failed("scan stopped unexpectedly".to_string());
                    }
                    break;
                }
            }
        }
    }

    /// Ask a running scan to stop.
    pub fn stop_scan(&mut self) {
        if self.status == ScanStatus::Scanning && !self.cancel.is_cancelled() {
            debug!("Cancelling Bluetooth scan");
            self.cancel.cancel();
        }
    }

    pub fn rows(&self) -> &[PeerRow] {
        &self.rows
    }

    pub fn status(&self) -> &ScanStatus {
        &self.status
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
        Some(ConnectionTarget::Ble {
            address: row.peer.address.clone(),
            name: row.peer.name.clone(),
        })
    }

    /// Fraction of the scan window that has elapsed.
    fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.started.elapsed().as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        match &self.status {
            ScanStatus::Scanning => {
                ui.add(egui::ProgressBar::new(self.progress()).animate(true));
                ui.label("scanning...");
            }
            ScanStatus::Complete => {
                ui.label("Scan Complete");
            }
            ScanStatus::Failed(reason) => {
                ui.colored_label(ui.visuals().warn_fg_color, format!("Scan failed: {reason}"));
            }
        }
        ui.separator();

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Grid::new("ble_peers")
                    .num_columns(2)
                    .striped(true)
                    .show(ui, |ui| {
                        ui.strong("Device");
                        ui.strong("RSSI");
                        ui.end_row();

                        for row in &self.rows {
                            let selected = self.selected == Some(row.id);
                            if ui
                                .selectable_label(selected, row.peer.display_name())
                                .clicked()
                            {
                                clicked = Some(row.id);
                            }
                            ui.label(
                                row.peer
                                    .rssi
                                    .map(|rssi| format!("{rssi} dBm"))
                                    .unwrap_or_else(|| "N/A".to_string()),
                            );
                            ui.end_row();
                        }
                    });
            });

        if let Some(id) = clicked {
            self.select(id);
        }
    }
}

impl Drop for BlePicker {
    fn drop(&mut self) {
        self.stop_scan();
    }
}
