use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("failed to scan retrieval directory: {path}")]
    ScanDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read document: {path}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse notebook: {path}")]
    ParseNotebook {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to load embedding model")]
    LoadEmbeddingModel {
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to embed text")]
    Embed {
        #[source]
        source: anyhow::Error,
    },

    #[error("embedding dimension mismatch: collection holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
