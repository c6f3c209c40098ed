//! Filesystem checks run once at startup

use anyhow::{bail, Context};
use log::info;
use std::{fs, path::Path};

/// Creates the data directory on first run. Fails if `path` names a file or
/// can not be created.
pub fn ensure_dir_exists(path: &str) -> anyhow::Result<()> {
    let dir = Path::new(path);

    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        bail!("{} exists but is not a directory", dir.display());
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;
    info!("Created directory: {}", dir.display());
    Ok(())
}

pub fn path_exists(path: &str) -> bool {
    Path::new(path).exists()
}
