//! Tolerant parsing and validation of LLM responses.
//!
//! Extraction never fails — missing or garbled fields fall back to defaults,
//! and validation decides afterwards whether the triple is usable.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::enums::SignalType;

pub const DEFAULT_SIGNAL_VALUE: &str = "MEDIUM";
pub const DEFAULT_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_EXPLANATION: &str = "Unable to parse response.";

/// Minimum explanation length for a professional assessment.
pub const MIN_EXPLANATION_CHARS: usize = 30;

/// A response parsed into the three grammar fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSignal {
    pub value: String,
    pub confidence: f64,
    pub explanation: String,
}

/// Reasons a parsed response is rejected. The display text is fed back to
/// the model verbatim in the correction note.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("the explanation indicates a parsing failure")]
    ParseFailure,

    #[error("the explanation is too short ({length} chars, minimum {MIN_EXPLANATION_CHARS})")]
    ExplanationTooShort { length: usize },

    #[error("the explanation appears truncated (ends with a colon)")]
    TruncatedExplanation,

    #[error("'{value}' is not a valid {signal_type} value")]
    ValueNotAllowed { value: String, signal_type: String },
}

fn value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)SIGNAL_VALUE\s*:\s*["'\[\(\*`]*([A-Za-z_]+)"#).expect("valid regex")
    })
}

fn confidence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)CONFIDENCE\s*:\s*["'\[\(\*`]*([0-9]+(?:\.[0-9]+)?)"#)
            .expect("valid regex")
    })
}

fn explanation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)EXPLANATION\s*:\s*(.*)").expect("valid regex"))
}

/// A later `WORD:` line delimits the explanation.
fn tag_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*[A-Z][A-Z_]{2,}\s*:").expect("valid regex"))
}

/// Extract the (value, confidence, explanation) triple from free text.
pub fn parse_signal_response(response: &str) -> ParsedSignal {
    let value = value_re()
        .captures(response)
        .map(|caps| caps[1].to_uppercase())
        .unwrap_or_else(|| DEFAULT_SIGNAL_VALUE.to_string());

    let confidence = confidence_re()
        .captures(response)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .map(normalize_confidence)
        .unwrap_or(DEFAULT_CONFIDENCE);

    let explanation = explanation_re()
        .captures(response)
        .map(|caps| {
            let rest = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            // Stop at the next recognizable tag line, if any
            match tag_line_re().find(rest) {
                Some(m) => rest[..m.start()].trim().to_string(),
                None => rest.trim().to_string(),
            }
        })
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string());

    ParsedSignal { value, confidence, explanation }
}

/// Values in (1, 100] are percentages; everything clamps to [0, 1].
fn normalize_confidence(raw: f64) -> f64 {
    let value = if raw > 1.0 && raw <= 100.0 { raw / 100.0 } else { raw };
    value.clamp(0.0, 1.0)
}

/// Validate an extracted triple against the domain rules for its type.
pub fn validate_signal(
    parsed: &ParsedSignal,
    signal_type: SignalType,
) -> Result<(), ValidationIssue> {
    let explanation = parsed.explanation.trim();
    let lowered = explanation.to_lowercase();

    if lowered.contains("unable to parse") || lowered.contains("failed to parse") {
        return Err(ValidationIssue::ParseFailure);
    }

    let length = explanation.chars().count();
    if length < MIN_EXPLANATION_CHARS {
        return Err(ValidationIssue::ExplanationTooShort { length });
    }

    if explanation.ends_with(':') {
        return Err(ValidationIssue::TruncatedExplanation);
    }

    if !signal_type.allowed_values().contains(&parsed.value.as_str()) {
        return Err(ValidationIssue::ValueNotAllowed {
            value: parsed.value.clone(),
            signal_type: signal_type.as_str().to_string(),
        });
    }

    Ok(())
}
