use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Everything that can abort an assembly run.
///
/// None of these are retried. The only retry in the pipeline is the
/// resume loop of the download stage, which never surfaces here unless
/// a resume cap is configured and exhausted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unknown {kind} \"{value}\" (consulted {source_name})")]
    UnknownReference {
        kind: &'static str,
        value: String,
        source_name: String,
    },

    #[error("file already exists: {}", .0.display())]
    FileAlreadyExists(PathBuf),

    #[error("file does not exist: {}", .0.display())]
    FileDoesNotExist(PathBuf),

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("{tool} exited with status {status}")]
    ExternalToolFailure { tool: String, status: i32 },

    #[error("failed to launch {program}: {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("gave up resuming {} after {attempts} attempt(s)", .path.display())]
    ResumeLimitReached { path: PathBuf, attempts: u32 },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("malformed catalog document: {0}")]
    Catalog(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
