use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use crate::devices::DeviceRegistry;

/// Reads device ids from the first column of a CSV device list. The first row
/// is a header; blank rows and blank ids are skipped.
pub fn read_device_ids<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = 0usize;
    let mut ids = Vec::new();
    for record in csv_reader.records() {
        let record = record.context("read devices csv")?;
        rows += 1;
        if rows == 1 {
            continue;
        }
        let Some(device_id) = record.get(0).map(str::trim) else {
            continue;
        };
        if device_id.is_empty() {
            continue;
        }
        ids.push(device_id.to_string());
    }

    if rows == 0 {
        anyhow::bail!("devices csv: empty file");
    }
    Ok(ids)
}

pub async fn seed_registry<I>(registry: &DeviceRegistry, device_ids: I) -> usize
where
    I: IntoIterator<Item = String>,
{
    let mut created = 0;
    for device_id in device_ids {
        if registry.insert_if_absent(&device_id).await {
            created += 1;
        }
    }
    created
}

pub async fn load_registry(path: &Path) -> Result<DeviceRegistry> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("open devices csv at {}", path.display()))?;
    let ids = read_device_ids(file)
        .with_context(|| format!("load devices csv at {}", path.display()))?;

    let registry = DeviceRegistry::new();
    let created = seed_registry(&registry, ids).await;
    if created == 0 {
        anyhow::bail!("devices csv at {} lists no devices", path.display());
    }
    Ok(registry)
}
