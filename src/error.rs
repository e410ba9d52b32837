use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or decoding a release dump.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read release dump {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("release dump is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid release on line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported release dump layout: {0}")]
    Layout(String),

    #[error("release dump {0} contains no releases")]
    Empty(PathBuf),
}
