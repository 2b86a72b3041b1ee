//! Export of the controller history to a CSV file

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thermal_control::{export, ControlLoopHandle};

/// Resolve the target path: an explicit path wins, else a timestamped name in `dir`
pub fn target_path(explicit: Option<PathBuf>, dir: &Path) -> PathBuf {
    explicit.unwrap_or_else(|| dir.join(export::default_file_name(Local::now())))
}

/// Write the handle's history to `path`, returning the row count
pub fn export_to(handle: &ControlLoopHandle, path: &Path) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("Failed to create export file {}", path.display()))?;
    let rows = handle
        .export_csv(BufWriter::new(file))
        .with_context(|| format!("Failed to write export file {}", path.display()))?;
    tracing::info!("Exported {} samples to {}", rows, path.display());
    Ok(rows)
}
