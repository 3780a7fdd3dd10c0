pub mod sanitize;
pub mod normalize;
pub mod prompt;
pub mod parser;
pub mod fallback;
pub mod gateway;
pub mod orchestrator;
pub mod rag;

pub use normalize::InputNormalizer;
pub use orchestrator::SignalEngine;

use thiserror::Error;

use crate::db::DatabaseError;

/// Pipeline-level failures. LLM faults, malformed output, and validation
/// misses all degrade inside the pipeline; the only error that escapes is a
/// persistence fault, which the caller must see to decide on rollback.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("persistence failed: {0}")]
    Persistence(#[from] DatabaseError),
}
