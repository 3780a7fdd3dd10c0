//! Optional context retrieval: chunking, embedding, similarity search, and
//! context assembly. The pipeline consumes this through `ContextRetriever`
//! and runs correctly when the capability is absent.

pub mod chunker;
pub mod embedder;
pub mod store;

pub use chunker::chunk_text;
pub use embedder::{cosine_similarity, EmbeddingModel, HashingEmbedder, EMBEDDING_DIM};
pub use store::SqliteContextRetriever;

use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("storage error: {0}")]
    Database(#[from] DatabaseError),

    #[error("stored embedding is corrupt: {0}")]
    CorruptEmbedding(String),
}

/// One retrieved snippet with its relevance score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: Uuid,
    pub input_id: Uuid,
    pub content: String,
    pub source_label: String,
    pub relevance_score: f32,
}

/// Context assembled for prompt enrichment.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub context_text: String,
    pub chunks: Vec<ScoredChunk>,
}

/// Pluggable "retrieve relevant context for a query" capability.
pub trait ContextRetriever: Send + Sync {
    fn get_relevant_context(
        &self,
        conn: &Connection,
        query: &str,
        program_id: Option<&Uuid>,
        max_chunks: usize,
        min_relevance: f32,
    ) -> Result<RetrievedContext, RagError>;
}
