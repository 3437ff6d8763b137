use std::path::Path;

use tracing::{debug, info};

use crate::chunk::Chunker;
use crate::collection::{DocumentChunk, DocumentCollection};
use crate::embedder::TextEmbedder;
use crate::error::RagError;
use crate::loader::{load_directory, scan_file_names};

/// A built retrieval index plus the directory listing it was built from.
#[derive(Debug)]
pub struct DirectoryIndex {
    pub collection: DocumentCollection,
    /// All file names observed at indexing time (including unsupported
    /// ones); compare against a fresh [`scan_file_names`] listing to decide
    /// whether the index is stale.
    pub files: Vec<String>,
}

/// Load, chunk, and embed every supported document directly inside `dir`.
pub fn index_directory(
    dir: &Path,
    embedder: &TextEmbedder,
    chunker: &Chunker,
) -> Result<DirectoryIndex, RagError> {
    let files = scan_file_names(dir)?;
    let documents = load_directory(dir)?;

    let mut collection = DocumentCollection::new(embedder.dimensions());
    for document in &documents {
        let chunks = chunker.split(&document.text);
        let count = chunks.len();
        for (chunk_index, text) in chunks.into_iter().enumerate() {
            let embedding = embedder.embed(&text)?;
            collection.add(
                DocumentChunk {
                    text,
                    file_name: document.name.clone(),
                    chunk_index,
                },
                embedding,
            )?;
        }
        debug!(file = %document.name, chunks = count, "indexed document");
    }

    info!(
        dir = %dir.display(),
        files = files.len(),
        documents = documents.len(),
        chunks = collection.len(),
        "retrieval index built"
    );
    Ok(DirectoryIndex { collection, files })
}
