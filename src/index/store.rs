//! In-memory vector store for one session.

use super::embeddings::Embedding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Absolute path of the source file
    pub source: String,
    /// File name without directories
    pub file_name: String,
    /// Detected language
    pub language: String,
    /// Path relative to the workspace root
    pub rel_path: String,
    /// Position of the chunk within its file
    pub chunk_id: usize,
}

/// A stored chunk with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    /// Chunk text
    pub content: String,
    /// Provenance
    pub metadata: ChunkMetadata,
    /// Vector for the chunk text
    pub embedding: Embedding,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Chunk text
    pub content: String,
    /// Cosine similarity to the query
    pub score: f32,
    /// Relative path of the file the chunk came from
    pub file: String,
    /// Provenance
    pub metadata: ChunkMetadata,
}

/// Chunks and embeddings for one session's workspace.
#[derive(Debug, Clone, Default)]
pub struct CodeIndex {
    chunks: Vec<IndexedChunk>,
}

impl CodeIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the number of stored chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the distinct relative paths present in the index.
    #[must_use]
    pub fn files(&self) -> Vec<String> {
        self.chunks
            .iter()
            .map(|c| c.metadata.rel_path.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Replaces every chunk of `rel_path` with `chunks`.
    ///
    /// Re-indexing a file never leaves stale chunks behind.
    pub fn replace_file(&mut self, rel_path: &str, chunks: Vec<IndexedChunk>) {
        self.chunks.retain(|c| c.metadata.rel_path != rel_path);
        self.chunks.extend(chunks);
    }

    /// Drops every chunk.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Ranks chunks accepted by `filter` against `query`.
    ///
    /// Chunks whose embedding dimension differs from the query (left over
    /// from a different provider) are skipped.
    #[must_use]
    pub fn search<F>(&self, query: &Embedding, top_k: usize, filter: F) -> Vec<SearchHit>
    where
        F: Fn(&ChunkMetadata) -> bool,
    {
        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .filter(|chunk| filter(&chunk.metadata))
            .filter_map(|chunk| {
                query
                    .cosine_similarity(&chunk.embedding)
                    .ok()
                    .map(|score| (score, chunk))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(top_k)
            .map(|(score, chunk)| SearchHit {
                content: chunk.content.clone(),
                score,
                file: chunk.metadata.rel_path.clone(),
                metadata: chunk.metadata.clone(),
            })
            .collect()
    }
}
