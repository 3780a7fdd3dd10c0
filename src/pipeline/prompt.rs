//! Prompt assembly and the response grammar.
//!
//! The three-field tagged format below is the contract between prompt
//! rendering and response parsing. Both sides consume these constants, and
//! the tests here pin the grammar so a template change cannot silently
//! desynchronize from the parser.

use crate::models::enums::SignalType;

use super::parser::ValidationIssue;

/// Response grammar: three labeled fields, one per line, tag then separator.
pub const FIELD_SIGNAL_VALUE: &str = "SIGNAL_VALUE";
pub const FIELD_CONFIDENCE: &str = "CONFIDENCE";
pub const FIELD_EXPLANATION: &str = "EXPLANATION";
pub const FIELD_SEPARATOR: &str = ":";

/// System instruction fixed at deployment time.
pub const SYSTEM_PROMPT: &str = "You are an expert program analyst. \
Analyze the provided program data and identify risk, cost, or efficiency signals. \
You MUST provide your response in the following exact format:\n\n\
SIGNAL_VALUE: [Value]\n\
CONFIDENCE: [Score]\n\
EXPLANATION: [Detailed Explanation]\n\n\
Ensure the EXPLANATION section is thorough, professional, and addresses specific details from the input.";

const DELIVERY_RISK_TEMPLATE: &str = "You are an expert program analyst assessing delivery risk for government programs.

Analyze the following input and determine the DELIVERY RISK level.

INPUT:
{content}

METADATA:
{metadata}

Based on this information, provide your assessment in the following format:
SIGNAL_VALUE: [LOW, MEDIUM, or HIGH]
CONFIDENCE: [0.0 to 1.0]
EXPLANATION: [2-3 sentence explanation of key risk factors]

Focus on schedule delays, resource constraints, dependency issues, and scope changes.";

const COST_RISK_TEMPLATE: &str = "You are an expert cost analyst reviewing program financials.

Analyze the following input and determine if there are COST ANOMALIES.

INPUT:
{content}

METADATA:
{metadata}

Based on this information, provide your assessment in the following format:
SIGNAL_VALUE: [NORMAL or ANOMALOUS]
CONFIDENCE: [0.0 to 1.0]
EXPLANATION: [2-3 sentence explanation of cost indicators]

Focus on budget variances, burn rate issues, and unexpected expenditures.";

const AI_EFFICIENCY_TEMPLATE: &str = "You are an AI operations analyst evaluating AI usage efficiency.

Analyze the following input related to AI/ML usage.

INPUT:
{content}

METADATA:
{metadata}

Based on this information, provide your assessment in the following format:
SIGNAL_VALUE: [LOW, MODERATE, or HIGH]
CONFIDENCE: [0.0 to 1.0]
EXPLANATION: [2-3 sentence explanation of efficiency factors]

Focus on token utilization, model selection appropriateness, and cost-effectiveness.";

fn template_for(signal_type: SignalType) -> &'static str {
    match signal_type {
        SignalType::DeliveryRisk => DELIVERY_RISK_TEMPLATE,
        SignalType::CostRisk => COST_RISK_TEMPLATE,
        SignalType::AiEfficiency => AI_EFFICIENCY_TEMPLATE,
    }
}

/// Render the instruction prompt for one signal type.
pub fn build_signal_prompt(signal_type: SignalType, content: &str, metadata_json: &str) -> String {
    template_for(signal_type)
        .replace("{content}", content)
        .replace("{metadata}", metadata_json)
}

/// Prefix analysis content with retrieved context snippets.
pub fn with_retrieved_context(context: &str, content: &str) -> String {
    format!(
        "Based on the following retrieved context from program documents:\n\n\
         {context}\n\n---\n\n\
         Please analyze the above context together with the following input:\n\n{content}"
    )
}

/// Correction note appended when a response fails validation; names the
/// failure and restates the required format.
pub fn append_correction(prompt: &str, issue: &ValidationIssue) -> String {
    format!(
        "{prompt}\n\nIMPORTANT: Your previous response was rejected: {issue}. \
         Respond again using exactly the required format:\n\
         {FIELD_SIGNAL_VALUE}{FIELD_SEPARATOR} [value]\n\
         {FIELD_CONFIDENCE}{FIELD_SEPARATOR} [0.0 to 1.0]\n\
         {FIELD_EXPLANATION}{FIELD_SEPARATOR} [detailed explanation]"
    )
}

/// Render a (value, confidence, explanation) triple into the response
/// grammar. The fallback generator uses this so its output parses exactly
/// like a remote response.
pub fn format_response(value: &str, confidence: f64, explanation: &str) -> String {
    format!(
        "{FIELD_SIGNAL_VALUE}{FIELD_SEPARATOR} {value}\n\
         {FIELD_CONFIDENCE}{FIELD_SEPARATOR} {confidence}\n\
         {FIELD_EXPLANATION}{FIELD_SEPARATOR} {explanation}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_content_and_metadata() {
        let prompt = build_signal_prompt(
            SignalType::DeliveryRisk,
            "Row 1: risk: vendor delay",
            r#"{"format":"csv"}"#,
        );
        assert!(prompt.contains("Row 1: risk: vendor delay"));
        assert!(prompt.contains(r#"{"format":"csv"}"#));
        assert!(prompt.contains("DELIVERY RISK"));
    }

    #[test]
    fn each_type_names_its_allowed_values() {
        let delivery = build_signal_prompt(SignalType::DeliveryRisk, "x", "{}");
        assert!(delivery.contains("[LOW, MEDIUM, or HIGH]"));

        let cost = build_signal_prompt(SignalType::CostRisk, "x", "{}");
        assert!(cost.contains("[NORMAL or ANOMALOUS]"));

        let efficiency = build_signal_prompt(SignalType::AiEfficiency, "x", "{}");
        assert!(efficiency.contains("[LOW, MODERATE, or HIGH]"));
    }

    #[test]
    fn grammar_tags_are_pinned() {
        // The parser keys off these exact tags; changing them is a protocol
        // change and must be made in lock-step with the parser.
        assert_eq!(FIELD_SIGNAL_VALUE, "SIGNAL_VALUE");
        assert_eq!(FIELD_CONFIDENCE, "CONFIDENCE");
        assert_eq!(FIELD_EXPLANATION, "EXPLANATION");
        assert_eq!(FIELD_SEPARATOR, ":");

        for ty in SignalType::all() {
            let prompt = build_signal_prompt(*ty, "x", "{}");
            assert!(prompt.contains("SIGNAL_VALUE:"));
            assert!(prompt.contains("CONFIDENCE:"));
            assert!(prompt.contains("EXPLANATION:"));
        }
        assert!(SYSTEM_PROMPT.contains("SIGNAL_VALUE:"));
    }

    #[test]
    fn formatted_response_follows_grammar() {
        let text = format_response("HIGH", 0.85, "Two blockers and a slipped milestone.");
        assert_eq!(
            text,
            "SIGNAL_VALUE: HIGH\nCONFIDENCE: 0.85\nEXPLANATION: Two blockers and a slipped milestone."
        );
    }

    #[test]
    fn correction_note_names_the_failure() {
        let base = build_signal_prompt(SignalType::CostRisk, "x", "{}");
        let corrected = append_correction(&base, &ValidationIssue::ExplanationTooShort { length: 12 });
        assert!(corrected.starts_with(&base));
        assert!(corrected.contains("previous response was rejected"));
        assert!(corrected.contains("12"));
    }

    #[test]
    fn retrieved_context_is_prefixed() {
        let enriched = with_retrieved_context("[Source: risks.csv]\nvendor delay", "current input");
        assert!(enriched.starts_with("Based on the following retrieved context"));
        assert!(enriched.contains("[Source: risks.csv]"));
        assert!(enriched.ends_with("current input"));
    }
}
