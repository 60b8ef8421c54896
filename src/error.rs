// Error types for loading and exporting the PDI dataset.
//
// Only startup ingestion and the host shell's file output can fail. Row-level
// problems (bad delimiters, missing codes, unparseable numbers) are recovered
// where they happen and never show up here.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdiError {
    /// A resource could not be read at all.
    #[error("failed to fetch {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The fetch capability answered, but not with a success status.
    #[error("failed to fetch {path}: status {status}")]
    Status { path: String, status: u16 },

    /// A previous startup load failed; the dataset is unusable for this session.
    #[error("data load failed: {0}")]
    LoadFailed(String),

    /// A query was issued before `DataStore::load` succeeded.
    #[error("dataset not loaded")]
    NotLoaded,

    #[error("failed to read config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PdiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PdiError::Status {
            path: "pdi.csv".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "failed to fetch pdi.csv: status 404");
    }

    #[test]
    fn test_load_failed_display() {
        let err = PdiError::LoadFailed("failed to fetch a.csv: gone".to_string());
        assert_eq!(err.to_string(), "data load failed: failed to fetch a.csv: gone");
    }
}
