//! JSON cache files and CSV export.
//!
//! Cache files under `cache/` serve two jobs: admin CLI state across
//! invocations, and best-effort fallbacks when a live backend fetch fails.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::utils::slips::Slip;

pub fn save_to_cache<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache dir {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("Failed to serialize cache data")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_from_cache<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let json =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Export active slips for the admin's records.
pub fn save_slips_to_csv(slips: &[Slip], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    writer.write_record([
        "deadline",
        "booking_code",
        "fixture",
        "prediction",
        "odds",
        "status",
    ])?;
    for slip in slips {
        for game in &slip.games {
            writer.write_record([
                slip.deadline.to_rfc3339(),
                slip.booking_code.clone(),
                game.fixture(),
                game.prediction.clone(),
                format!("{:.2}", game.odds),
                game.status.to_string(),
            ])?;
        }
    }
    writer.flush().context("Failed to flush CSV")?;
    Ok(())
}
