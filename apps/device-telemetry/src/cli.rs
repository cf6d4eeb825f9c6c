use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "device-telemetry",
    version,
    about = "Edge device heartbeat and upload-duration aggregation service"
)]
pub struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    /// CSV device list used to seed the registry (overrides DEVICE_TELEMETRY_DEVICES_CSV).
    #[arg(long)]
    pub devices_csv: Option<PathBuf>,
}
