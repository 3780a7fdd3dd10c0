//! Chunk persistence and similarity search over SQLite.

use std::str::FromStr;
use std::sync::Arc;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::models::InputRecord;

use super::chunker::chunk_text;
use super::embedder::{cosine_similarity, EmbeddingModel};
use super::{ContextRetriever, RagError, RetrievedContext, ScoredChunk};

/// Character budget for assembled context.
pub const MAX_CONTEXT_CHARS: usize = 4000;

/// SQLite-backed retriever: chunks are embedded at index time and scored
/// with cosine similarity at query time.
pub struct SqliteContextRetriever {
    embedder: Arc<dyn EmbeddingModel>,
}

impl SqliteContextRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self { embedder }
    }

    /// Chunk, embed, and store an input's analysis content. Returns the
    /// number of chunks stored.
    pub fn index_input(
        &self,
        conn: &Connection,
        input: &InputRecord,
    ) -> Result<usize, RagError> {
        self.clear_input(conn, &input.id)?;

        let source_label = input
            .filename
            .clone()
            .unwrap_or_else(|| format!("{} input", input.format.as_str()));

        let chunks = chunk_text(input.analysis_content());
        let now = chrono::Utc::now().naive_utc().to_string();

        for (index, content) in chunks.iter().enumerate() {
            let embedding = self.embedder.embed(content)?;
            let encoded = serde_json::to_string(&embedding)
                .map_err(|e| RagError::Embedding(e.to_string()))?;

            conn.execute(
                "INSERT INTO context_chunks (id, input_id, program_id, chunk_index,
                 content, embedding, source_label, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    Uuid::new_v4().to_string(),
                    input.id.to_string(),
                    input.program_id.to_string(),
                    index as i64,
                    content,
                    encoded,
                    source_label,
                    now,
                ],
            )
            .map_err(|e| RagError::Database(e.into()))?;
        }

        tracing::debug!(input_id = %input.id, chunks = chunks.len(), "Indexed input for retrieval");
        Ok(chunks.len())
    }

    /// Remove an input's chunks from the index.
    pub fn clear_input(&self, conn: &Connection, input_id: &Uuid) -> Result<usize, RagError> {
        let removed = conn
            .execute(
                "DELETE FROM context_chunks WHERE input_id = ?1",
                params![input_id.to_string()],
            )
            .map_err(|e| RagError::Database(e.into()))?;
        Ok(removed)
    }

    /// Remove every chunk indexed for a program.
    pub fn clear_program(&self, conn: &Connection, program_id: &Uuid) -> Result<usize, RagError> {
        let removed = conn
            .execute(
                "DELETE FROM context_chunks WHERE program_id = ?1",
                params![program_id.to_string()],
            )
            .map_err(|e| RagError::Database(e.into()))?;
        Ok(removed)
    }

    pub fn chunk_count(&self, conn: &Connection) -> Result<i64, RagError> {
        let count = conn
            .query_row("SELECT COUNT(*) FROM context_chunks", [], |row| row.get(0))
            .map_err(|e| RagError::Database(e.into()))?;
        Ok(count)
    }
}

impl ContextRetriever for SqliteContextRetriever {
    fn get_relevant_context(
        &self,
        conn: &Connection,
        query: &str,
        program_id: Option<&Uuid>,
        max_chunks: usize,
        min_relevance: f32,
    ) -> Result<RetrievedContext, RagError> {
        let query_embedding = self.embedder.embed(query)?;

        let mut stmt = conn
            .prepare(
                "SELECT id, input_id, content, embedding, source_label
                 FROM context_chunks
                 WHERE (?1 IS NULL OR program_id = ?1)",
            )
            .map_err(|e| RagError::Database(e.into()))?;

        let rows = stmt
            .query_map(params![program_id.map(|id| id.to_string())], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .map_err(|e| RagError::Database(e.into()))?;

        let mut scored = Vec::new();
        for row in rows {
            let (chunk_id, input_id, content, encoded, source_label) =
                row.map_err(|e| RagError::Database(e.into()))?;
            let embedding: Vec<f32> = serde_json::from_str(&encoded)
                .map_err(|e| RagError::CorruptEmbedding(e.to_string()))?;

            let score = cosine_similarity(&query_embedding, &embedding);
            if score >= min_relevance {
                scored.push(ScoredChunk {
                    chunk_id: Uuid::from_str(&chunk_id)
                        .map_err(|e| RagError::CorruptEmbedding(e.to_string()))?,
                    input_id: Uuid::from_str(&input_id)
                        .map_err(|e| RagError::CorruptEmbedding(e.to_string()))?,
                    content,
                    source_label,
                    relevance_score: score,
                });
            }
        }

        scored.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(max_chunks);

        Ok(RetrievedContext {
            context_text: assemble_context(&scored),
            chunks: scored,
        })
    }
}

/// Concatenate chunk contents, each prefixed with its source label, stopping
/// before the character budget is exceeded.
fn assemble_context(chunks: &[ScoredChunk]) -> String {
    let mut parts = Vec::new();
    let mut total_chars = 0;

    for chunk in chunks {
        if total_chars + chunk.content.len() > MAX_CONTEXT_CHARS {
            break;
        }
        parts.push(format!("[Source: {}]\n{}", chunk.source_label, chunk.content));
        total_chars += chunk.content.len();
    }

    parts.join("\n\n---\n\n")
}
