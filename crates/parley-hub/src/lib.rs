//! Model-hub client: download-and-cache of weight, tokenizer, and embedding
//! model files.
//!
//! All caching (resume, etag checks, shared cache directory) is delegated to
//! `hf-hub`; a file that is already present in the local cache is returned
//! without touching the network.

mod error;

use std::path::PathBuf;

use hf_hub::api::tokio::{Api, ApiBuilder};
use parley_types::QuantizationEncoding;
use tracing::info;

pub use error::HubError;

/// Hub repository holding the Llama 3.1 8B instruct GGUF builds.
pub const DEFAULT_WEIGHTS_REPO: &str = "modularai/llama-3.1";

/// Hub repository holding the sentence-embedding model used for retrieval.
pub const DEFAULT_EMBEDDING_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Tokenizer file name, shared by both repositories above.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Local paths of a downloaded sentence-embedding model.
#[derive(Debug, Clone)]
pub struct EmbeddingModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

/// Thin wrapper over the `hf-hub` async client.
#[derive(Clone)]
pub struct ModelHub {
    api: Api,
}

impl std::fmt::Debug for ModelHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHub").finish_non_exhaustive()
    }
}

impl ModelHub {
    /// Client using the default hub cache location (`$HF_HOME` aware).
    pub fn new() -> Result<Self, HubError> {
        let api = ApiBuilder::new()
            .with_progress(true)
            .build()
            .map_err(|source| HubError::InitClient { source })?;
        Ok(Self { api })
    }

    /// Client caching into an explicit directory instead of the default one.
    pub fn with_cache_dir(cache_dir: PathBuf) -> Result<Self, HubError> {
        let api = ApiBuilder::new()
            .with_progress(true)
            .with_cache_dir(cache_dir)
            .build()
            .map_err(|source| HubError::InitClient { source })?;
        Ok(Self { api })
    }

    /// Download `file_name` from `repo_id`, returning the cached local path.
    pub async fn fetch(&self, repo_id: &str, file_name: &str) -> Result<PathBuf, HubError> {
        info!(repo = repo_id, file = file_name, "fetching from model hub");
        let path = self
            .api
            .model(repo_id.to_owned())
            .get(file_name)
            .await
            .map_err(|source| HubError::Fetch {
                repo_id: repo_id.to_owned(),
                file_name: file_name.to_owned(),
                source,
            })?;
        info!(repo = repo_id, file = file_name, path = %path.display(), "hub file ready");
        Ok(path)
    }

    /// Download the GGUF weight file for `encoding` from `repo_id`.
    pub async fn fetch_weights(
        &self,
        repo_id: &str,
        encoding: QuantizationEncoding,
    ) -> Result<PathBuf, HubError> {
        self.fetch(repo_id, encoding.weights_file_name()).await
    }

    /// Download the `tokenizer.json` of `repo_id`.
    pub async fn fetch_tokenizer(&self, repo_id: &str) -> Result<PathBuf, HubError> {
        self.fetch(repo_id, TOKENIZER_FILE).await
    }

    /// Download config, tokenizer, and safetensors weights of a
    /// sentence-embedding model.
    pub async fn fetch_embedding_model(
        &self,
        repo_id: &str,
    ) -> Result<EmbeddingModelFiles, HubError> {
        let config = self.fetch(repo_id, "config.json").await?;
        let tokenizer = self.fetch(repo_id, TOKENIZER_FILE).await?;
        let weights = self.fetch(repo_id, "model.safetensors").await?;
        Ok(EmbeddingModelFiles {
            config,
            tokenizer,
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_against_a_scratch_cache() {
        let cache = std::env::temp_dir().join("parley-hub-test-cache");
        assert!(ModelHub::with_cache_dir(cache).is_ok());
    }

    /// Pulls a small real file from the hub; needs network access.
    #[tokio::test]
    #[ignore = "downloads from the model hub"]
    async fn fetches_embedding_tokenizer() {
        let hub = ModelHub::new().unwrap();
        let path = hub
            .fetch_tokenizer(DEFAULT_EMBEDDING_REPO)
            .await
            .expect("tokenizer download failed");
        assert!(path.exists());
    }
}
