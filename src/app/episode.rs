use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::catalog::{ActRef, EpisodeCatalog};
use crate::config::Config;
use crate::error::{PipelineError, Result};

use super::naming::file_name;

/// Ordered, non-empty set of language codes. The first one is the main
/// language: its act list and video stream drive the assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Languages(Vec<String>);

impl Languages {
    pub(crate) fn new<I, S>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        if codes.is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "No language parameter given.".to_string(),
            ));
        }
        if let Some(position) = codes.iter().position(|code| code.trim().is_empty()) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "Language #{} is empty.",
                position + 1
            )));
        }
        // Artifact names upper-case the codes, so `de` and `DE` collide.
        let mut seen = HashSet::new();
        if let Some(repeated) = codes.iter().find(|code| !seen.insert(code.to_lowercase())) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "Language \"{repeated}\" is given more than once."
            )));
        }
        Ok(Self(codes))
    }

    pub(crate) fn main(&self) -> &str {
        &self.0[0]
    }

    pub(crate) fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// What a single invocation was asked to assemble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selection {
    pub(crate) season: u32,
    /// `None` means every episode of the season.
    pub(crate) episode: Option<u32>,
    pub(crate) languages: Languages,
}

/// Everything a stage needs to know about the episode being assembled,
/// and the one place artifact paths are derived.
pub(crate) struct EpisodeContext<'a> {
    pub(crate) config: &'a Config,
    pub(crate) catalog: &'a dyn EpisodeCatalog,
    pub(crate) season: u32,
    pub(crate) episode: u32,
    pub(crate) languages: &'a Languages,
}

impl<'a> EpisodeContext<'a> {
    pub(crate) fn act_ref<'b>(&self, language: &'b str, act: &'b str) -> ActRef<'b> {
        ActRef {
            season: self.season,
            episode: self.episode,
            language,
            act,
        }
    }

    pub(crate) fn acts(&self, language: &str) -> Result<Vec<String>> {
        self.catalog.acts(self.season, self.episode, language)
    }

    pub(crate) fn main_acts(&self) -> Result<Vec<String>> {
        self.acts(self.languages.main())
    }

    /// Raw per-language download of one act.
    pub(crate) fn download_path(&self, language: &str, act: &str) -> PathBuf {
        self.config.download_folder.join(file_name(
            self.season,
            self.episode,
            &[language],
            Some("mp4"),
            Some(act),
            None,
        ))
    }

    /// Video-only stream of one act, carrying no language tag.
    pub(crate) fn video_path(&self, act: &str) -> PathBuf {
        let none: [&str; 0] = [];
        self.config.tmp_folder.join(file_name(
            self.season,
            self.episode,
            &none,
            Some("mkv"),
            Some(act),
            None,
        ))
    }

    pub(crate) fn audio_path(&self, language: &str, act: &str) -> PathBuf {
        self.config.tmp_folder.join(file_name(
            self.season,
            self.episode,
            &[language],
            Some("aac"),
            Some(act),
            None,
        ))
    }

    /// One act with all languages' audio muxed in.
    pub(crate) fn act_merge_path(&self, act: &str) -> PathBuf {
        self.config.tmp_folder.join(file_name(
            self.season,
            self.episode,
            self.languages.as_slice(),
            Some("mkv"),
            Some(act),
            None,
        ))
    }

    /// All acts concatenated, before the rename.
    pub(crate) fn merged_path(&self) -> PathBuf {
        self.config.output_folder.join(file_name(
            self.season,
            self.episode,
            self.languages.as_slice(),
            Some("mkv"),
            None,
            None,
        ))
    }

    pub(crate) fn final_path(&self, title: &str) -> PathBuf {
        let name = file_name(
            self.season,
            self.episode,
            self.languages.as_slice(),
            Some("mkv"),
            None,
            Some(title),
        );
        let label = self.config.product_label.trim();
        if label.is_empty() {
            self.config.output_folder.join(name)
        } else {
            self.config.output_folder.join(format!("{label} {name}"))
        }
    }
}

pub(crate) fn require_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::FileDoesNotExist(path.to_path_buf()))
    }
}

pub(crate) fn require_absent(path: &Path) -> Result<()> {
    if path.exists() {
        Err(PipelineError::FileAlreadyExists(path.to_path_buf()))
    } else {
        Ok(())
    }
}
