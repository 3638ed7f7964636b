use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::paths::{
    config_file_path, default_download_folder, default_output_folder, default_tmp_folder,
};

/// Settings that stay fixed for a whole invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub download_folder: PathBuf,
    pub tmp_folder: PathBuf,
    pub output_folder: PathBuf,
    pub rtmpdump: PathBuf,
    pub ffmpeg: PathBuf,
    pub mkvmerge: PathBuf,
    /// Identifies the player record the streaming client authenticates with.
    pub player_url: String,
    pub resolution: String,
    pub remove_temp_files: bool,
    pub remove_downloaded_files: bool,
    pub verify_checksums: bool,
    /// Resume attempts allowed per act; unbounded when unset.
    pub max_resume_attempts: Option<u32>,
    /// Prefix for the renamed, final file.
    pub product_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_folder: default_download_folder(),
            tmp_folder: default_tmp_folder(),
            output_folder: default_output_folder(),
            rtmpdump: PathBuf::from("rtmpdump"),
            ffmpeg: PathBuf::from("ffmpeg"),
            mkvmerge: PathBuf::from("mkvmerge"),
            player_url: String::new(),
            resolution: "high".to_string(),
            remove_temp_files: true,
            remove_downloaded_files: true,
            verify_checksums: true,
            max_resume_attempts: None,
            product_label: "South Park".to_string(),
        }
    }
}

impl Config {
    /// Reads the config file, falling back to defaults when the default
    /// location has none. An explicitly named file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = config_file_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(config.with_env_overrides(|key| env::var_os(key)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub(crate) fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let overrides = [
            ("SOUTHPARK_DL_RTMPDUMP_BIN", &mut self.rtmpdump),
            ("SOUTHPARK_DL_FFMPEG_BIN", &mut self.ffmpeg),
            ("SOUTHPARK_DL_MKVMERGE_BIN", &mut self.mkvmerge),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|value| !value.is_empty()) {
                *slot = PathBuf::from(value);
            }
        }
        self
    }

    pub fn ensure_folders(&self) -> Result<()> {
        for folder in [&self.download_folder, &self.tmp_folder, &self.output_folder] {
            fs::create_dir_all(folder)
                .with_context(|| format!("failed to create folder {}", folder.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "player_url": "http://media.example/player.swf", "remove_temp_files": false }"#,
        )
        .expect("write config");

        let config = Config::from_file(&path).expect("config should parse");
        assert_eq!(config.player_url, "http://media.example/player.swf");
        assert!(!config.remove_temp_files);
        assert!(config.remove_downloaded_files);
        assert_eq!(config.resolution, "high");
        assert_eq!(config.max_resume_attempts, None);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "remove_tmp": true }"#).expect("write config");
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(Config::load(Some(&dir.path().join("absent.json"))).is_err());
    }

    #[test]
    fn env_overrides_tool_binaries_when_non_empty() {
        let config = Config::default().with_env_overrides(|key| match key {
            "SOUTHPARK_DL_FFMPEG_BIN" => Some(OsString::from("/opt/ffmpeg/bin/ffmpeg")),
            "SOUTHPARK_DL_MKVMERGE_BIN" => Some(OsString::new()),
            _ => None,
        });
        assert_eq!(config.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.mkvmerge, PathBuf::from("mkvmerge"));
        assert_eq!(config.rtmpdump, PathBuf::from("rtmpdump"));
    }
}
