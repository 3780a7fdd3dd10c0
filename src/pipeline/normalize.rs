//! Input normalization: turns raw uploaded or typed text into a normalized
//! text projection plus structured metadata. Never fails — malformed input
//! degrades to raw passthrough with an error annotation in the metadata.

use crate::models::enums::{ContentType, InputFormat};
use crate::models::InputMetadata;

use super::sanitize::sanitize_input;

/// Rows summarized in a normalized CSV projection.
const CSV_SUMMARY_ROWS: usize = 20;

/// Page break marker emitted by upstream PDF text extraction.
const PDF_PAGE_MARKER: &str = "--- Page ";

pub struct InputNormalizer;

impl InputNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize input content based on format. Sanitizes first, then applies
    /// format-specific parsing and content classification.
    pub fn normalize(
        &self,
        raw_content: &str,
        format: InputFormat,
        filename: Option<&str>,
    ) -> (String, InputMetadata) {
        let sanitized = sanitize_input(raw_content);
        match format {
            InputFormat::Csv => normalize_csv(&sanitized, filename),
            InputFormat::Txt => normalize_txt(&sanitized, filename),
            InputFormat::Pdf => normalize_pdf(&sanitized, filename),
            InputFormat::Manual => normalize_manual(&sanitized),
        }
    }
}

impl Default for InputNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_csv(content: &str, filename: Option<&str>) -> (String, InputMetadata) {
    match parse_csv(content) {
        Ok((headers, rows)) => {
            let mut summary_parts = Vec::new();
            for (i, row) in rows.iter().take(CSV_SUMMARY_ROWS).enumerate() {
                let row_summary = headers
                    .iter()
                    .zip(row.iter())
                    .filter(|(_, value)| !value.trim().is_empty())
                    .map(|(header, value)| format!("{header}: {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                summary_parts.push(format!("Row {}: {row_summary}", i + 1));
            }

            let metadata = InputMetadata::Csv {
                row_count: rows.len(),
                columns: headers.clone(),
                content_type: detect_csv_type(filename, &headers),
                filename: filename.map(String::from),
                parse_error: None,
            };

            (summary_parts.join("\n"), metadata)
        }
        Err(reason) => {
            tracing::warn!(filename = ?filename, reason = %reason, "CSV parse failed, passing raw content through");
            let metadata = InputMetadata::Csv {
                row_count: 0,
                columns: Vec::new(),
                content_type: ContentType::GeneralData,
                filename: filename.map(String::from),
                parse_error: Some(reason),
            };
            (content.to_string(), metadata)
        }
    }
}

fn normalize_txt(content: &str, filename: Option<&str>) -> (String, InputMetadata) {
    let sections = extract_sections(content);
    let metadata = InputMetadata::Txt {
        line_count: content.lines().count(),
        word_count: content.split_whitespace().count(),
        content_type: detect_txt_type(content, filename),
        sections,
        filename: filename.map(String::from),
    };
    (content.to_string(), metadata)
}

/// PDF inputs arrive as pre-extracted text with `--- Page N ---` markers;
/// otherwise they normalize like plain text.
fn normalize_pdf(content: &str, filename: Option<&str>) -> (String, InputMetadata) {
    let page_count = content
        .lines()
        .filter(|line| line.trim_start().starts_with(PDF_PAGE_MARKER))
        .count()
        .max(1);

    let sections = extract_sections(content);
    let metadata = InputMetadata::Pdf {
        page_count,
        line_count: content.lines().count(),
        word_count: content.split_whitespace().count(),
        content_type: detect_txt_type(content, filename),
        sections,
        filename: filename.map(String::from),
    };
    (content.to_string(), metadata)
}

fn normalize_manual(content: &str) -> (String, InputMetadata) {
    let metadata = InputMetadata::Manual {
        line_count: content.lines().count(),
        word_count: content.split_whitespace().count(),
        content_type: ContentType::AnalystInput,
    };
    (content.to_string(), metadata)
}

/// Minimal CSV parsing: first line is the header row, double quotes delimit
/// fields containing commas, `""` escapes a quote.
fn parse_csv(content: &str) -> Result<(Vec<String>, Vec<Vec<String>>), String> {
    let mut lines = content.lines();
    let header_line = lines.next().ok_or_else(|| "no header row".to_string())?;
    if header_line.trim().is_empty() {
        return Err("no header row".to_string());
    }

    let headers = split_csv_line(header_line)?;
    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = split_csv_line(line)?;
        fields.resize(headers.len(), String::new());
        rows.push(fields);
    }

    Ok((headers, rows))
}

fn split_csv_line(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current.trim().to_string());
    Ok(fields)
}

/// Classify CSV content by keyword families in the filename, then headers.
fn detect_csv_type(filename: Option<&str>, headers: &[String]) -> ContentType {
    if let Some(name) = filename {
        let name = name.to_lowercase();
        if name.contains("risk") {
            return ContentType::RiskRegister;
        }
        if name.contains("cost") || name.contains("spend") || name.contains("burn") {
            return ContentType::CostSummary;
        }
        if name.contains("milestone") {
            return ContentType::Milestones;
        }
        if name.contains("ai") || name.contains("usage") {
            return ContentType::AiUsage;
        }
    }

    let headers: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    if headers.iter().any(|h| h.contains("risk")) {
        return ContentType::RiskRegister;
    }
    if headers.iter().any(|h| h.contains("cost") || h.contains("spend")) {
        return ContentType::CostSummary;
    }
    if headers.iter().any(|h| h.contains("milestone")) {
        return ContentType::Milestones;
    }
    if headers.iter().any(|h| h.contains("ai") || h.contains("usage")) {
        return ContentType::AiUsage;
    }

    ContentType::GeneralData
}

fn detect_txt_type(content: &str, filename: Option<&str>) -> ContentType {
    if let Some(name) = filename {
        let name = name.to_lowercase();
        if name.contains("status") {
            return ContentType::StatusReport;
        }
        if name.contains("note") {
            return ContentType::AnalystNotes;
        }
    }

    let content = content.to_lowercase();
    if content.contains("weekly") && content.contains("status") {
        return ContentType::StatusReport;
    }
    if content.contains("analyst") || content.contains("observation") {
        return ContentType::AnalystNotes;
    }

    ContentType::GeneralDocument
}

/// Segment text into named sections. A line opens a section when it is
/// all-uppercase, ends with a colon, or starts with a heading marker; the
/// following lines accumulate as that section's body until the next boundary.
fn extract_sections(content: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current_section = "introduction".to_string();
    let mut current_has_content = false;

    for line in content.lines() {
        let stripped = line.trim();
        if !stripped.is_empty() && is_section_boundary(stripped) {
            if current_has_content {
                sections.push(current_section.clone());
            }
            current_section = stripped
                .to_lowercase()
                .replace([':', '#', '*'], "")
                .trim()
                .to_string();
            current_has_content = false;
        } else if !stripped.is_empty() {
            current_has_content = true;
        }
    }

    if current_has_content {
        sections.push(current_section);
    }
    sections
}

fn is_section_boundary(stripped: &str) -> bool {
    is_all_uppercase(stripped)
        || stripped.ends_with(':')
        || stripped.starts_with("##")
        || stripped.starts_with("**")
}

/// At least one letter, and every letter uppercase.
fn is_all_uppercase(text: &str) -> bool {
    let mut has_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            has_alpha = true;
            if c.is_lowercase() {
                return false;
            }
        }
    }
    has_alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_summarized_with_headers() {
        let csv = "risk,owner,severity\nvendor delay,PMO,high\nscope change,,medium";
        let (normalized, metadata) =
            InputNormalizer::new().normalize(csv, InputFormat::Csv, Some("risk_register.csv"));

        assert!(normalized.starts_with("Row 1: risk: vendor delay, owner: PMO, severity: high"));
        // Empty cells are skipped
        assert!(normalized.contains("Row 2: risk: scope change, severity: medium"));
        assert!(!normalized.contains("owner: ,"));

        match metadata {
            InputMetadata::Csv { row_count, columns, content_type, parse_error, .. } => {
                assert_eq!(row_count, 2);
                assert_eq!(columns, vec!["risk", "owner", "severity"]);
                assert_eq!(content_type, ContentType::RiskRegister);
                assert!(parse_error.is_none());
            }
            other => panic!("expected csv metadata, got {other:?}"),
        }
    }

    #[test]
    fn csv_summary_caps_at_twenty_rows() {
        let mut csv = String::from("metric,value\n");
        for i in 0..30 {
            csv.push_str(&format!("m{i},{i}\n"));
        }
        let (normalized, metadata) =
            InputNormalizer::new().normalize(&csv, InputFormat::Csv, None);

        assert_eq!(normalized.lines().count(), 20);
        match metadata {
            InputMetadata::Csv { row_count, .. } => assert_eq!(row_count, 30),
            other => panic!("expected csv metadata, got {other:?}"),
        }
    }

    #[test]
    fn quoted_fields_keep_embedded_commas() {
        let csv = "item,note\nwidget,\"delayed, pending review\"";
        let (normalized, _) = InputNormalizer::new().normalize(csv, InputFormat::Csv, None);
        assert!(normalized.contains("note: delayed, pending review"));
    }

    #[test]
    fn malformed_csv_degrades_to_raw_passthrough() {
        let csv = "risk,owner\n\"unterminated,quote";
        let (normalized, metadata) =
            InputNormalizer::new().normalize(csv, InputFormat::Csv, Some("risks.csv"));

        assert_eq!(normalized, csv);
        match metadata {
            InputMetadata::Csv { parse_error, content_type, .. } => {
                assert!(parse_error.unwrap().contains("unterminated"));
                assert_eq!(content_type, ContentType::GeneralData);
            }
            other => panic!("expected csv metadata, got {other:?}"),
        }
    }

    #[test]
    fn empty_csv_reports_missing_header() {
        let (_, metadata) = InputNormalizer::new().normalize("", InputFormat::Csv, None);
        match metadata {
            InputMetadata::Csv { parse_error, .. } => {
                assert_eq!(parse_error.unwrap(), "no header row");
            }
            other => panic!("expected csv metadata, got {other:?}"),
        }
    }

    #[test]
    fn csv_type_detection_by_filename_and_headers() {
        assert_eq!(detect_csv_type(Some("burn_rate.csv"), &[]), ContentType::CostSummary);
        assert_eq!(detect_csv_type(Some("ai_usage_log.csv"), &[]), ContentType::AiUsage);
        assert_eq!(
            detect_csv_type(None, &["milestone".into(), "date".into()]),
            ContentType::Milestones
        );
        assert_eq!(
            detect_csv_type(None, &["monthly spend".into()]),
            ContentType::CostSummary
        );
        assert_eq!(detect_csv_type(None, &["name".into()]), ContentType::GeneralData);
    }

    #[test]
    fn normalization_is_deterministic() {
        let csv = "risk,owner\nvendor delay,PMO\nscope change,CO";
        let normalizer = InputNormalizer::new();
        let first = normalizer.normalize(csv, InputFormat::Csv, Some("risks.csv"));
        let second = normalizer.normalize(csv, InputFormat::Csv, Some("risks.csv"));
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn txt_sections_split_on_boundaries() {
        let text = "WEEKLY STATUS\nAll milestones on track.\n\nRisks:\nVendor approval pending.\n\n## Next Steps\nFinalize contract.";
        let (_, metadata) = InputNormalizer::new().normalize(text, InputFormat::Txt, None);

        match metadata {
            InputMetadata::Txt { sections, content_type, .. } => {
                assert_eq!(sections, vec!["weekly status", "risks", "next steps"]);
                assert_eq!(content_type, ContentType::StatusReport);
            }
            other => panic!("expected txt metadata, got {other:?}"),
        }
    }

    #[test]
    fn txt_type_from_filename_beats_content() {
        let (_, metadata) = InputNormalizer::new().normalize(
            "nothing notable here",
            InputFormat::Txt,
            Some("analyst_notes_week3.txt"),
        );
        match metadata {
            InputMetadata::Txt { content_type, .. } => {
                assert_eq!(content_type, ContentType::AnalystNotes);
            }
            other => panic!("expected txt metadata, got {other:?}"),
        }
    }

    #[test]
    fn txt_counts_lines_and_words() {
        let (_, metadata) =
            InputNormalizer::new().normalize("one two\nthree", InputFormat::Txt, None);
        match metadata {
            InputMetadata::Txt { line_count, word_count, .. } => {
                assert_eq!(line_count, 2);
                assert_eq!(word_count, 3);
            }
            other => panic!("expected txt metadata, got {other:?}"),
        }
    }

    #[test]
    fn manual_input_is_analyst_classified() {
        let (normalized, metadata) = InputNormalizer::new().normalize(
            "  Observed slipping velocity this sprint.  ",
            InputFormat::Manual,
            None,
        );
        assert_eq!(normalized, "Observed slipping velocity this sprint.");
        match metadata {
            InputMetadata::Manual { content_type, word_count, .. } => {
                assert_eq!(content_type, ContentType::AnalystInput);
                assert_eq!(word_count, 5);
            }
            other => panic!("expected manual metadata, got {other:?}"),
        }
    }

    #[test]
    fn pdf_pages_counted_from_markers() {
        let text = "--- Page 1 ---\nBudget overview.\n--- Page 2 ---\nSpend detail.";
        let (_, metadata) = InputNormalizer::new().normalize(text, InputFormat::Pdf, Some("budget.pdf"));
        match metadata {
            InputMetadata::Pdf { page_count, .. } => assert_eq!(page_count, 2),
            other => panic!("expected pdf metadata, got {other:?}"),
        }
    }

    #[test]
    fn pdf_without_markers_is_one_page() {
        let (_, metadata) =
            InputNormalizer::new().normalize("plain extracted text", InputFormat::Pdf, None);
        match metadata {
            InputMetadata::Pdf { page_count, .. } => assert_eq!(page_count, 1),
            other => panic!("expected pdf metadata, got {other:?}"),
        }
    }

    #[test]
    fn all_uppercase_requires_a_letter() {
        assert!(is_all_uppercase("RISKS AND ISSUES"));
        assert!(!is_all_uppercase("Risks"));
        assert!(!is_all_uppercase("2024-01"));
    }
}
