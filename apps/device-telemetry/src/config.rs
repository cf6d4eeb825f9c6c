use anyhow::Result;
use dotenvy::dotenv;
use std::path::PathBuf;

use crate::cli::Args;

const DEFAULT_DEVICES_CSV: &str = "etc/devices.csv";

#[derive(Debug, Clone)]
pub struct Config {
    pub http_bind: String,
    pub devices_csv: PathBuf,
}

impl Config {
    pub fn from_env(args: &Args) -> Result<Self> {
        dotenv().ok();

        let devices_csv = match args.devices_csv.clone() {
            Some(path) => path,
            None => env_path("DEVICE_TELEMETRY_DEVICES_CSV", DEFAULT_DEVICES_CSV)?,
        };

        Ok(Self {
            http_bind: format!("{}:{}", args.host, args.port),
            devices_csv,
        })
    }
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_path(key: &str, default: &str) -> Result<PathBuf> {
    let value = env_optional_string(key).unwrap_or_else(|| default.to_string());
    let path = PathBuf::from(value);
    if path.as_os_str().is_empty() {
        anyhow::bail!("{key} resolved to an empty path");
    }
    Ok(path)
}
