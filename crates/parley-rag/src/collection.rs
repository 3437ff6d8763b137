use std::cmp::Ordering;

use crate::error::RagError;

/// One embedded chunk plus its retrieval metadata.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub text: String,
    /// Source file name, surfaced to the model alongside the text.
    pub file_name: String,
    pub chunk_index: usize,
}

/// A chunk returned from a nearest-neighbour query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub chunk: DocumentChunk,
    /// Cosine similarity against the query embedding.
    pub score: f32,
}

/// In-memory vector collection over document chunks.
///
/// Inserts are append-only; queries are a full cosine scan, which is the
/// right trade-off for a per-session index of one document directory.
#[derive(Debug, Default)]
pub struct DocumentCollection {
    dimensions: usize,
    embeddings: Vec<Vec<f32>>,
    chunks: Vec<DocumentChunk>,
}

impl DocumentCollection {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            embeddings: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn add(&mut self, chunk: DocumentChunk, embedding: Vec<f32>) -> Result<(), RagError> {
        if embedding.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        self.embeddings.push(embedding);
        self.chunks.push(chunk);
        Ok(())
    }

    /// Top `n_results` chunks by cosine similarity, best first.
    pub fn query(&self, embedding: &[f32], n_results: usize) -> Result<Vec<QueryResult>, RagError> {
        if embedding.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        let mut results: Vec<QueryResult> = self
            .embeddings
            .iter()
            .zip(&self.chunks)
            .map(|(candidate, chunk)| QueryResult {
                chunk: chunk.clone(),
                score: cosine_similarity(embedding, candidate),
            })
            .collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(n_results);
        Ok(results)
    }
}

/// Cosine similarity; zero-magnitude vectors score 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> DocumentChunk {
        DocumentChunk {
            text: text.to_owned(),
            file_name: "doc.txt".to_owned(),
            chunk_index: 0,
        }
    }

    #[test]
    fn query_orders_by_similarity() {
        let mut collection = DocumentCollection::new(2);
        collection.add(chunk("east"), vec![1.0, 0.0]).unwrap();
        collection.add(chunk("north"), vec![0.0, 1.0]).unwrap();
        collection.add(chunk("northeast"), vec![1.0, 1.0]).unwrap();

        let results = collection.query(&[1.0, 0.1], 3).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, ["east", "northeast", "north"]);
        assert!(results[0].score > results[1].score);
        assert!(results[1].score > results[2].score);
    }

    #[test]
    fn query_truncates_to_n_results() {
        let mut collection = DocumentCollection::new(2);
        for i in 0..10 {
            collection
                .add(chunk(&format!("c{i}")), vec![1.0, i as f32])
                .unwrap();
        }
        assert_eq!(collection.query(&[1.0, 0.0], 3).unwrap().len(), 3);
    }

    #[test]
    fn empty_collection_returns_no_results() {
        let collection = DocumentCollection::new(4);
        assert!(collection.query(&[0.0; 4], 5).unwrap().is_empty());
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut collection = DocumentCollection::new(3);
        assert!(matches!(
            collection.add(chunk("bad"), vec![1.0, 2.0]),
            Err(RagError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(collection.query(&[1.0, 2.0], 1).is_err());
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        let same = cosine_similarity(&[0.5, 0.5], &[0.5, 0.5]);
        assert!((same - 1.0).abs() < 1e-6);
    }
}
