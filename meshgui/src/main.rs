mod app;
mod cli;
mod connect_dialog;
mod context;
mod device_list;
mod device_panel;
mod output;
mod transports;


use anyhow::Result;
use clap::Parser;
use eframe::egui;
use meshgui_core::IoRunner;
use meshgui_core::discovery::SystemPorts;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::app::MeshtasticApp;
use crate::cli::Cli;
use crate::context::AppContext;
use crate::output::print_error;

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Set up logging
    setup_logging(&cli);

    if cli.list_ports {
        return output::print_port_report(&SystemPorts, cli.json);
    }

    // The I/O runner must exist before any window does
    let mut runner = IoRunner::start()?;
    let context = AppContext::system(runner.handle(), &cli);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Meshtastic")
            .with_inner_size([960.0, 600.0])
            .with_min_inner_size([640.0, 400.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Meshtastic",
        options,
        Box::new(move |_cc| Ok(Box::new(MeshtasticApp::new(context)))),
    );

    info!("Window closed, stopping I/O runner");
    runner.shutdown();

    result.map_err(|e| {
        print_error(&e.to_string());
        anyhow::anyhow!("GUI exited with an error: {e}")
    })
}

fn setup_logging(cli: &Cli) {
    let filter_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    // Keep packet resync chatter from the stream buffer out of debug output
    let default_filter = format!("{filter_level},meshtastic::connections::stream_buffer=warn");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
