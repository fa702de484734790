use clap::Parser;
use meshgui_core::transport::{DEFAULT_TCP_HOST, DEFAULT_TCP_PORT};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "meshgui")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Host pre-filled in the TCP connection form
    #[arg(long, env = "MESHGUI_TCP_HOST", default_value = DEFAULT_TCP_HOST)]
    pub tcp_host: String,

    /// Port pre-filled in the TCP connection form
    #[arg(long, env = "MESHGUI_TCP_PORT", default_value_t = DEFAULT_TCP_PORT)]
    pub tcp_port: u16,

    /// How long a Bluetooth scan runs (e.g. 30s, 2m)
    #[arg(
        long,
        env = "MESHGUI_SCAN_DURATION",
        default_value = "100s",
        value_parser = humantime::parse_duration
    )]
    pub scan_duration: Duration,

    /// Print detected serial devices and ports, then exit
    #[arg(long)]
    pub list_ports: bool,

    /// Print --list-ports output as JSON
    #[arg(short = 'j', long, requires = "list_ports")]
    pub json: bool,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
