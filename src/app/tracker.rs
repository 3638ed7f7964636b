use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Files produced while assembling one episode.
///
/// Intermediates in the scratch folder and raw downloads are kept apart
/// so each group can be removed on its own switch.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    temp_files: Vec<PathBuf>,
    downloaded_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CleanupReport {
    pub(crate) removed: usize,
    pub(crate) missing: usize,
    pub(crate) failed: usize,
}

impl RunState {
    pub(crate) fn track_temp(&mut self, path: &Path) {
        self.temp_files.push(path.to_path_buf());
    }

    pub(crate) fn track_download(&mut self, path: &Path) {
        self.downloaded_files.push(path.to_path_buf());
    }

    #[cfg(test)]
    pub(crate) fn temp_files(&self) -> &[PathBuf] {
        &self.temp_files
    }

    #[cfg(test)]
    pub(crate) fn downloaded_files(&self) -> &[PathBuf] {
        &self.downloaded_files
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.temp_files.is_empty() && self.downloaded_files.is_empty()
    }

    /// Deletes whichever groups are switched on, then forgets both lists.
    ///
    /// A file that cannot be removed is logged and skipped; the lists are
    /// cleared either way.
    pub(crate) fn clean_up(&mut self, remove_temp: bool, remove_downloads: bool) -> CleanupReport {
        let mut report = CleanupReport::default();

        if remove_temp {
            remove_all(&self.temp_files, &mut report);
        }
        self.temp_files.clear();

        if remove_downloads {
            remove_all(&self.downloaded_files, &mut report);
        }
        self.downloaded_files.clear();

        report
    }
}

fn remove_all(paths: &[PathBuf], report: &mut CleanupReport) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed");
                report.removed += 1;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                report.missing += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to remove tracked file");
                report.failed += 1;
            }
        }
    }
}
