//! Signal generation orchestration: decides which signal types apply to an
//! input, drives prompt → gateway → parse → validate with a bounded
//! correction loop, and persists each Signal with its CostMetric atomically.
//!
//! LLM faults and validation misses degrade rather than fail — the one error
//! that escapes is a persistence fault.

use std::sync::Arc;

use uuid::Uuid;

use crate::db::repository::insert_signal_with_cost;
use crate::db::{Db, DatabaseError};
use crate::models::enums::{ContentType, SignalStatus, SignalType};
use crate::models::{CostMetric, InputRecord, Signal};

use super::gateway::{TextGenerator, DEFAULT_MAX_OUTPUT_TOKENS};
use super::parser::{parse_signal_response, validate_signal, ParsedSignal};
use super::prompt::{append_correction, build_signal_prompt, with_retrieved_context};
use super::rag::ContextRetriever;
use super::PipelineError;

/// Validation retries per signal type (3 attempts total). The final attempt
/// is accepted regardless of validation outcome.
pub const MAX_VALIDATION_RETRIES: usize = 2;

/// Retrieval query is the head of the analysis content.
const CONTEXT_QUERY_CHARS: usize = 500;
const CONTEXT_MAX_CHUNKS: usize = 3;
const CONTEXT_MIN_RELEVANCE: f32 = 0.25;

pub struct SignalEngine {
    generator: Arc<dyn TextGenerator>,
    retriever: Option<Arc<dyn ContextRetriever>>,
}

impl SignalEngine {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        retriever: Option<Arc<dyn ContextRetriever>>,
    ) -> Self {
        Self { generator, retriever }
    }

    /// Map an input's content classification to the signal types to
    /// generate. Every input yields at least delivery_risk.
    pub fn applicable_signal_types(input: &InputRecord) -> Vec<SignalType> {
        match input.metadata.as_ref().map(|m| m.content_type()) {
            Some(ContentType::CostSummary) => vec![SignalType::CostRisk],
            Some(ContentType::AiUsage) => vec![SignalType::AiEfficiency],
            // risk_register, status_report, milestones, and everything
            // unclassified all assess delivery risk
            _ => vec![SignalType::DeliveryRisk],
        }
    }

    /// Generate and persist all applicable signals for one input.
    pub async fn analyze_input(
        &self,
        db: &Db,
        input: &InputRecord,
    ) -> Result<Vec<Signal>, PipelineError> {
        let signal_types = Self::applicable_signal_types(input);
        tracing::info!(
            input_id = %input.id,
            types = ?signal_types.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
            "Generating signals"
        );

        let mut signals = Vec::new();
        for signal_type in signal_types {
            signals.push(self.generate_one(db, input, signal_type).await?);
        }
        Ok(signals)
    }

    async fn generate_one(
        &self,
        db: &Db,
        input: &InputRecord,
        signal_type: SignalType,
    ) -> Result<Signal, PipelineError> {
        let content = self.enriched_content(db, input);
        let metadata_json = input
            .metadata
            .as_ref()
            .and_then(|meta| serde_json::to_string(meta).ok())
            .unwrap_or_else(|| "{}".to_string());

        let mut prompt = build_signal_prompt(signal_type, &content, &metadata_json);

        let mut parsed: ParsedSignal;
        let mut usage;
        let mut validated = false;

        let mut attempt = 0;
        loop {
            let (response, attempt_usage) =
                self.generator.generate(&prompt, DEFAULT_MAX_OUTPUT_TOKENS).await;
            parsed = parse_signal_response(&response);
            usage = attempt_usage;

            match validate_signal(&parsed, signal_type) {
                Ok(()) => {
                    validated = true;
                    break;
                }
                Err(issue) if attempt < MAX_VALIDATION_RETRIES => {
                    tracing::warn!(
                        input_id = %input.id,
                        signal_type = signal_type.as_str(),
                        attempt = attempt + 1,
                        issue = %issue,
                        "Signal response failed validation, re-prompting"
                    );
                    prompt = append_correction(&prompt, &issue);
                    attempt += 1;
                }
                Err(issue) => {
                    // Best-effort acceptance: availability over strictness
                    tracing::warn!(
                        input_id = %input.id,
                        signal_type = signal_type.as_str(),
                        issue = %issue,
                        "Validation retries exhausted, accepting best-effort signal"
                    );
                    break;
                }
            }
        }

        let now = chrono::Utc::now().naive_utc();
        let signal = Signal {
            id: Uuid::new_v4(),
            input_id: input.id,
            program_id: input.program_id,
            signal_type,
            signal_value: parsed.value,
            confidence_score: parsed.confidence,
            explanation: parsed.explanation,
            model_used: Some(usage.model_name.clone()),
            status: if validated { SignalStatus::Active } else { SignalStatus::Unverified },
            created_at: now,
        };
        let cost = CostMetric {
            id: Uuid::new_v4(),
            signal_id: signal.id,
            tokens_input: usage.tokens_input,
            tokens_output: usage.tokens_output,
            tokens_total: usage.tokens_total,
            estimated_cost_usd: usage.estimated_cost_usd,
            model_name: usage.model_name,
            latency_ms: Some(usage.latency_ms),
            created_at: now,
        };

        {
            let conn = db.lock().map_err(|_| DatabaseError::LockPoisoned)?;
            insert_signal_with_cost(&conn, &signal, &cost)?;
        }

        tracing::info!(
            signal_id = %signal.id,
            signal_type = signal_type.as_str(),
            value = %signal.signal_value,
            status = signal.status.as_str(),
            "Signal persisted"
        );
        Ok(signal)
    }

    /// Prefix the analysis content with retrieved context when the retriever
    /// is present and finds something. Retrieval failures are logged and
    /// swallowed — enrichment is never fatal.
    fn enriched_content(&self, db: &Db, input: &InputRecord) -> String {
        let content = input.analysis_content();
        let Some(retriever) = &self.retriever else {
            return content.to_string();
        };

        let query: String = content.chars().take(CONTEXT_QUERY_CHARS).collect();
        let retrieved = {
            let Ok(conn) = db.lock() else {
                tracing::warn!(input_id = %input.id, "Context retrieval skipped: database lock poisoned");
                return content.to_string();
            };
            retriever.get_relevant_context(
                &conn,
                &query,
                Some(&input.program_id),
                CONTEXT_MAX_CHUNKS,
                CONTEXT_MIN_RELEVANCE,
            )
        };

        match retrieved {
            Ok(context) if !context.context_text.is_empty() => {
                tracing::debug!(
                    input_id = %input.id,
                    chunks = context.chunks.len(),
                    "Prompt enriched with retrieved context"
                );
                with_retrieved_context(&context.context_text, content)
            }
            Ok(_) => content.to_string(),
            Err(e) => {
                tracing::warn!(input_id = %input.id, error = %e, "Context retrieval failed, continuing without enrichment");
                content.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::db::repository::input::tests::{sample_input, setup_program};
    use crate::db::repository::{cost_for_signal, insert_input};
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::{ContentType, InputFormat, InputStatus};
    use crate::models::InputMetadata;
    use crate::pipeline::gateway::{estimate_tokens, TokenUsage, FALLBACK_MODEL_NAME};
    use crate::pipeline::rag::{RagError, RetrievedContext};

    /// Returns scripted responses in order, recording every prompt.
    struct ScriptedGenerator {
        responses: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(responses: &[&str]) -> Self {
            let mut queued: Vec<String> = responses.iter().map(|s| s.to_string()).collect();
            queued.reverse();
            Self {
                responses: Mutex::new(queued),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, _max_output_tokens: u32) -> (String, TokenUsage) {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut responses = self.responses.lock().unwrap();
            let response = responses.pop().unwrap_or_else(|| "SIGNAL_VALUE: LOW\nCONFIDENCE: 0.7\nEXPLANATION: Nothing notable was found in the provided content.".into());
            let usage = TokenUsage {
                tokens_input: estimate_tokens(prompt),
                tokens_output: estimate_tokens(&response),
                tokens_total: estimate_tokens(prompt) + estimate_tokens(&response),
                estimated_cost_usd: 0.001,
                model_name: "mock-model".into(),
                latency_ms: 3,
            };
            (response, usage)
        }
    }

    struct StaticRetriever {
        context: String,
    }

    impl ContextRetriever for StaticRetriever {
        fn get_relevant_context(
            &self,
            _conn: &rusqlite::Connection,
            _query: &str,
            _program_id: Option<&Uuid>,
            _max_chunks: usize,
            _min_relevance: f32,
        ) -> Result<RetrievedContext, RagError> {
            Ok(RetrievedContext {
                context_text: self.context.clone(),
                chunks: Vec::new(),
            })
        }
    }

    struct FailingRetriever;

    impl ContextRetriever for FailingRetriever {
        fn get_relevant_context(
            &self,
            _conn: &rusqlite::Connection,
            _query: &str,
            _program_id: Option<&Uuid>,
            _max_chunks: usize,
            _min_relevance: f32,
        ) -> Result<RetrievedContext, RagError> {
            Err(RagError::Embedding("index offline".into()))
        }
    }

    fn seeded_db() -> (Db, InputRecord) {
        let conn = open_memory_database().unwrap();
        let program_id = setup_program(&conn);
        let input = sample_input(program_id);
        insert_input(&conn, &input).unwrap();
        (crate::db::shared(conn), input)
    }

    const VALID_RESPONSE: &str = "SIGNAL_VALUE: HIGH\nCONFIDENCE: 0.9\nEXPLANATION: Two missed milestones and an unresolved vendor dependency.";

    #[test]
    fn applicability_follows_content_classification() {
        let (_, mut input) = seeded_db();

        assert_eq!(
            SignalEngine::applicable_signal_types(&input),
            vec![SignalType::DeliveryRisk]
        );

        input.metadata = Some(InputMetadata::Csv {
            row_count: 1,
            columns: vec![],
            content_type: ContentType::CostSummary,
            filename: None,
            parse_error: None,
        });
        assert_eq!(
            SignalEngine::applicable_signal_types(&input),
            vec![SignalType::CostRisk]
        );

        input.metadata = Some(InputMetadata::Csv {
            row_count: 1,
            columns: vec![],
            content_type: ContentType::AiUsage,
            filename: None,
            parse_error: None,
        });
        assert_eq!(
            SignalEngine::applicable_signal_types(&input),
            vec![SignalType::AiEfficiency]
        );

        // No metadata at all still yields a delivery risk attempt
        input.metadata = None;
        assert_eq!(
            SignalEngine::applicable_signal_types(&input),
            vec![SignalType::DeliveryRisk]
        );
    }

    #[tokio::test]
    async fn valid_response_persists_active_signal_with_cost() {
        let (db, input) = seeded_db();
        let generator = Arc::new(ScriptedGenerator::new(&[VALID_RESPONSE]));
        let engine = SignalEngine::new(generator.clone(), None);

        let signals = engine.analyze_input(&db, &input).await.unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_value, "HIGH");
        assert_eq!(signals[0].status, SignalStatus::Active);
        assert_eq!(generator.prompts().len(), 1);

        let conn = db.lock().unwrap();
        let cost = cost_for_signal(&conn, &signals[0].id).unwrap().unwrap();
        assert_eq!(cost.model_name, "mock-model");
        assert!(cost.tokens_total > 0);
    }

    #[tokio::test]
    async fn invalid_response_triggers_correction_retry() {
        let (db, input) = seeded_db();
        let generator = Arc::new(ScriptedGenerator::new(&[
            "SIGNAL_VALUE: HIGH\nCONFIDENCE: 0.9\nEXPLANATION: too short",
            VALID_RESPONSE,
        ]));
        let engine = SignalEngine::new(generator.clone(), None);

        let signals = engine.analyze_input(&db, &input).await.unwrap();
        assert_eq!(signals[0].status, SignalStatus::Active);

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 2);
        // The re-prompt names the validation failure
        assert!(prompts[1].contains("previous response was rejected"));
        assert!(prompts[1].contains("too short"));
    }

    #[tokio::test]
    async fn exhausted_retries_accept_best_effort_as_unverified() {
        let (db, input) = seeded_db();
        let generator = Arc::new(ScriptedGenerator::new(&[
            "garbage with no tags",
            "garbage with no tags",
            "garbage with no tags",
        ]));
        let engine = SignalEngine::new(generator.clone(), None);

        let signals = engine.analyze_input(&db, &input).await.unwrap();
        assert_eq!(generator.prompts().len(), 1 + MAX_VALIDATION_RETRIES);
        assert_eq!(signals[0].status, SignalStatus::Unverified);
        // Parser defaults survive into the persisted best-effort signal
        assert_eq!(signals[0].signal_value, "MEDIUM");
        assert!((signals[0].confidence_score - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn wrong_value_for_type_is_corrected() {
        let (db, mut input) = seeded_db();
        input.metadata = Some(InputMetadata::Csv {
            row_count: 1,
            columns: vec!["cost".into()],
            content_type: ContentType::CostSummary,
            filename: Some("burn.csv".into()),
            parse_error: None,
        });

        let generator = Arc::new(ScriptedGenerator::new(&[
            // HIGH is not in cost_risk's allowed set
            "SIGNAL_VALUE: HIGH\nCONFIDENCE: 0.8\nEXPLANATION: Spending is far above the approved baseline this quarter.",
            "SIGNAL_VALUE: ANOMALOUS\nCONFIDENCE: 0.8\nEXPLANATION: Spending is far above the approved baseline this quarter.",
        ]));
        let engine = SignalEngine::new(generator.clone(), None);

        let signals = engine.analyze_input(&db, &input).await.unwrap();
        assert_eq!(signals[0].signal_type, SignalType::CostRisk);
        assert_eq!(signals[0].signal_value, "ANOMALOUS");
        assert_eq!(signals[0].status, SignalStatus::Active);
    }

    #[tokio::test]
    async fn retrieved_context_reaches_the_prompt() {
        let (db, input) = seeded_db();
        let generator = Arc::new(ScriptedGenerator::new(&[VALID_RESPONSE]));
        let retriever = Arc::new(StaticRetriever {
            context: "[Source: status.txt]\nVendor slipped twice before.".into(),
        });
        let engine =
            SignalEngine::new(generator.clone(), Some(retriever as Arc<dyn ContextRetriever>));

        engine.analyze_input(&db, &input).await.unwrap();
        let prompts = generator.prompts();
        assert!(prompts[0].contains("retrieved context from program documents"));
        assert!(prompts[0].contains("Vendor slipped twice before."));
    }

    #[tokio::test]
    async fn retrieval_failure_is_not_fatal() {
        let (db, input) = seeded_db();
        let generator = Arc::new(ScriptedGenerator::new(&[VALID_RESPONSE]));
        let engine = SignalEngine::new(
            generator.clone(),
            Some(Arc::new(FailingRetriever) as Arc<dyn ContextRetriever>),
        );

        let signals = engine.analyze_input(&db, &input).await.unwrap();
        assert_eq!(signals.len(), 1);
        assert!(!generator.prompts()[0].contains("retrieved context"));
    }

    #[tokio::test]
    async fn fallback_gateway_end_to_end_scenario() {
        // No credential configured: a delivery-risk input carrying critical,
        // delay, and blocked keywords scores HIGH at 0.85 on the rule-based path.
        let conn = open_memory_database().unwrap();
        let program_id = setup_program(&conn);
        let raw = "Row 1 is fine\nCRITICAL: major schedule delay, blocked on vendor approval";
        let input = InputRecord {
            id: Uuid::new_v4(),
            program_id,
            format: InputFormat::Manual,
            filename: None,
            raw_content: raw.into(),
            normalized_content: Some(raw.into()),
            metadata: None,
            status: InputStatus::Processed,
            error_message: None,
            created_at: chrono::Utc::now().naive_utc(),
        };
        insert_input(&conn, &input).unwrap();
        let db = crate::db::shared(conn);

        let gateway = crate::pipeline::gateway::LlmGateway::new(&crate::config::Settings::for_tests());
        let engine = SignalEngine::new(Arc::new(gateway), None);

        let signals = engine.analyze_input(&db, &input).await.unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_value, "HIGH");
        assert!((signals[0].confidence_score - 0.85).abs() < 1e-9);
        assert_eq!(signals[0].model_used.as_deref(), Some(FALLBACK_MODEL_NAME));

        let conn = db.lock().unwrap();
        let cost = cost_for_signal(&conn, &signals[0].id).unwrap().unwrap();
        assert_eq!(cost.estimated_cost_usd, 0.0);
    }
}
