// Sanitize raw text before normalization and prompt assembly.
// Bounds prompt size and keeps stray control bytes out of the LLM input.

/// Maximum input length to carry into prompts (characters).
pub const MAX_INPUT_CHARS: usize = 50_000;

/// Appended when input exceeds the maximum length.
pub const TRUNCATION_MARKER: &str = "\n[content truncated]";

/// Sanitize text: trim, strip null bytes and non-whitespace control
/// characters, and hard-truncate to `MAX_INPUT_CHARS` with a marker.
///
/// Idempotent — sanitizing already-sanitized text is a no-op. Truncation
/// reserves room for the marker so the output never exceeds the limit.
pub fn sanitize_input(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c == '\n' || *c == '\t' || *c == '\r' || !c.is_control())
        .collect();
    let trimmed = cleaned.trim();

    if trimmed.chars().count() <= MAX_INPUT_CHARS {
        return trimmed.to_string();
    }

    let keep = MAX_INPUT_CHARS - TRUNCATION_MARKER.chars().count();
    let mut truncated: String = trimmed.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
