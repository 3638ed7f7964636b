use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

const APP_DIR: &str = "southpark-dl";

pub fn catalog_file_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join(APP_DIR).join("catalog.db"))
}

pub fn config_file_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("unable to resolve config directory")?;
    Ok(base.join(APP_DIR).join("config.json"))
}

pub fn default_download_folder() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join(APP_DIR)
        .join("downloads")
}

pub fn default_tmp_folder() -> PathBuf {
    env::temp_dir().join(APP_DIR)
}

pub fn default_output_folder() -> PathBuf {
    dirs::video_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
