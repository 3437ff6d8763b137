use std::path::Path;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

use crate::error::RagError;

/// Sentence-embedding model (BERT-family, safetensors weights).
///
/// Embeddings are attention-masked mean pools of the final hidden states,
/// L2-normalized so cosine similarity reduces to a dot product downstream.
pub struct TextEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimensions: usize,
}

impl std::fmt::Debug for TextEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEmbedder")
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl TextEmbedder {
    /// Load model config, tokenizer, and weights from local files
    /// (typically hub-cache paths). Blocking.
    pub fn load(
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
    ) -> Result<Self, RagError> {
        let device = Device::Cpu;

        let config_text = std::fs::read_to_string(config_path).map_err(|source| {
            RagError::LoadEmbeddingModel {
                source: anyhow::Error::from(source),
            }
        })?;
        let config: BertConfig =
            serde_json::from_str(&config_text).map_err(|source| RagError::LoadEmbeddingModel {
                source: anyhow::Error::from(source),
            })?;

        let mut tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(|source| RagError::LoadEmbeddingModel {
                source: anyhow::Error::msg(source),
            })?;
        // The position table is finite; overlong chunks get truncated rather
        // than rejected.
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_position_embeddings,
                ..Default::default()
            }))
            .map_err(|source| RagError::LoadEmbeddingModel {
                source: anyhow::Error::msg(source),
            })?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.to_path_buf()], DTYPE, &device)
        }
        .map_err(|source| RagError::LoadEmbeddingModel {
            source: anyhow::Error::from(source),
        })?;
        let dimensions = config.hidden_size;
        let model = BertModel::load(vb, &config).map_err(|source| RagError::LoadEmbeddingModel {
            source: anyhow::Error::from(source),
        })?;

        info!(dimensions, "embedding model loaded");
        Ok(Self {
            model,
            tokenizer,
            device,
            dimensions,
        })
    }

    /// Output vector length (384 for `all-MiniLM-L6-v2`).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text. CPU-bound; callers on async runtimes should wrap
    /// this in a blocking task.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|source| RagError::Embed {
                source: anyhow::Error::msg(source),
            })?;

        let token_ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(embed_error)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(embed_error)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(embed_error)?;

        // [1, seq_len, hidden]
        let hidden = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))
            .map_err(embed_error)?;

        // Mean-pool over the sequence, masked so padding contributes nothing.
        let mask = attention_mask
            .to_dtype(DTYPE)
            .and_then(|m| m.unsqueeze(2))
            .map_err(embed_error)?;
        let summed = hidden
            .broadcast_mul(&mask)
            .and_then(|h| h.sum(1))
            .map_err(embed_error)?;
        let counts = mask.sum(1).map_err(embed_error)?;
        let mean = summed.broadcast_div(&counts).map_err(embed_error)?;

        // L2 normalize.
        let norm = mean
            .sqr()
            .and_then(|m| m.sum_keepdim(1))
            .and_then(|m| m.sqrt())
            .map_err(embed_error)?;
        let normalized = mean.broadcast_div(&norm).map_err(embed_error)?;

        normalized
            .squeeze(0)
            .and_then(|v| v.to_vec1::<f32>())
            .map_err(embed_error)
    }

    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

fn embed_error(source: candle_core::Error) -> RagError {
    RagError::Embed {
        source: source.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pulls the real MiniLM files through the hub cache; needs network on
    /// first run.
    #[tokio::test]
    #[ignore = "downloads the embedding model from the hub"]
    async fn related_sentences_score_closer() {
        let api = hf_hub::api::tokio::Api::new().unwrap();
        let repo = api.model("sentence-transformers/all-MiniLM-L6-v2".to_string());
        let config = repo.get("config.json").await.unwrap();
        let tokenizer = repo.get("tokenizer.json").await.unwrap();
        let weights = repo.get("model.safetensors").await.unwrap();

        let embedder = tokio::task::spawn_blocking(move || {
            TextEmbedder::load(&config, &tokenizer, &weights)
        })
        .await
        .unwrap()
        .expect("embedder load failed");

        assert_eq!(embedder.dimensions(), 384);

        let cat = embedder.embed("A cat sits on the mat.").unwrap();
        let kitten = embedder.embed("A kitten rests on a rug.").unwrap();
        let tax = embedder.embed("Quarterly tax filings are due in April.").unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        assert!(dot(&cat, &kitten) > dot(&cat, &tax));

        // Normalized output: unit magnitude.
        let magnitude: f32 = cat.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-3);
    }
}
