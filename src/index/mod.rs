//! Semantic code index.
//!
//! Files are split into overlapping character chunks, each chunk is
//! embedded, and queries are ranked by cosine similarity against the
//! stored vectors. Every session owns its own [`CodeIndex`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use code_workbench::index::{chunk_text, EmbeddingProvider, LocalEmbeddingProvider};
//!
//! let provider = LocalEmbeddingProvider::default();
//! for chunk in chunk_text(&source, 1000, 200) {
//!     let embedding = provider.embed(&chunk).await?;
//! }
//! ```

mod chunker;
mod embeddings;
mod store;

pub use chunker::chunk_text;
pub use embeddings::{
    provider_from_config, Embedding, EmbeddingError, EmbeddingProvider, LocalEmbeddingProvider,
    OpenAIEmbeddingProvider,
};
pub use store::{ChunkMetadata, CodeIndex, IndexedChunk, SearchHit};
