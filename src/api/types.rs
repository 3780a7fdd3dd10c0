//! Shared state for the API layer.

use std::sync::{Arc, MutexGuard};

use rusqlite::Connection;

use crate::config::Settings;
use crate::db::Db;
use crate::pipeline::gateway::{LlmGateway, TextGenerator};
use crate::pipeline::rag::{ContextRetriever, HashingEmbedder, SqliteContextRetriever};
use crate::pipeline::SignalEngine;

use super::error::ApiError;

/// Shared context for all routes: settings, the database handle, and the
/// explicitly constructed pipeline services. No process-wide singletons —
/// everything a handler needs is injected through this struct.
#[derive(Clone)]
pub struct ApiContext {
    pub settings: Arc<Settings>,
    pub db: Db,
    pub engine: Arc<SignalEngine>,
    pub gateway: Arc<LlmGateway>,
    pub retriever: Option<Arc<SqliteContextRetriever>>,
}

impl ApiContext {
    pub fn new(settings: Settings, db: Db) -> Self {
        let settings = Arc::new(settings);
        let gateway = Arc::new(LlmGateway::new(&settings));

        let retriever = settings.retrieval_enabled.then(|| {
            Arc::new(SqliteContextRetriever::new(Arc::new(HashingEmbedder::new())))
        });

        let engine = Arc::new(SignalEngine::new(
            gateway.clone() as Arc<dyn TextGenerator>,
            retriever
                .clone()
                .map(|r| r as Arc<dyn ContextRetriever>),
        ));

        Self { settings, db, engine, gateway, retriever }
    }

    /// Short-lived connection lock. Handlers must drop the guard before any
    /// await point.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))
    }
}
