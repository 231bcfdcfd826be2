//! Error types for the transcript toolkit.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the transcript toolkit.
///
/// Segmentation itself never fails: anomalies inside a transcript (dropped
/// lines, broken chains) are tallied in the run report instead. These
/// variants cover the I/O and serialization edges around it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan {path}: {source}")]
    ScanDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
