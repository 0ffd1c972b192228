use std::path::PathBuf;

/// Failures reading or writing the persisted state document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("accessing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serializing state document: {0}")]
    Serialize(#[from] serde_json::Error),
}
