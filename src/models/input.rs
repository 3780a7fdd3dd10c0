use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ContentType, InputFormat, InputStatus};

/// An ingested document (CSV, text, extracted-PDF text, or typed analyst
/// notes) owned by a program. Immutable once normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputRecord {
    pub id: Uuid,
    pub program_id: Uuid,
    pub format: InputFormat,
    pub filename: Option<String>,
    pub raw_content: String,
    pub normalized_content: Option<String>,
    pub metadata: Option<InputMetadata>,
    pub status: InputStatus,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
}

impl InputRecord {
    /// The text the pipeline analyzes: normalized projection when present,
    /// raw content otherwise.
    pub fn analysis_content(&self) -> &str {
        self.normalized_content.as_deref().unwrap_or(&self.raw_content)
    }
}

/// Normalization metadata as a closed tagged union — one variant per input
/// format, rather than an open-ended dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum InputMetadata {
    Csv {
        row_count: usize,
        columns: Vec<String>,
        content_type: ContentType,
        filename: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parse_error: Option<String>,
    },
    Txt {
        line_count: usize,
        word_count: usize,
        content_type: ContentType,
        sections: Vec<String>,
        filename: Option<String>,
    },
    Pdf {
        page_count: usize,
        line_count: usize,
        word_count: usize,
        content_type: ContentType,
        sections: Vec<String>,
        filename: Option<String>,
    },
    Manual {
        line_count: usize,
        word_count: usize,
        content_type: ContentType,
    },
}

impl InputMetadata {
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Csv { content_type, .. }
            | Self::Txt { content_type, .. }
            | Self::Pdf { content_type, .. }
            | Self::Manual { content_type, .. } => *content_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_serializes_with_format_tag() {
        let meta = InputMetadata::Csv {
            row_count: 3,
            columns: vec!["risk".into(), "owner".into()],
            content_type: ContentType::RiskRegister,
            filename: Some("risks.csv".into()),
            parse_error: None,
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["format"], "csv");
        assert_eq!(json["content_type"], "risk_register");
        assert!(json.get("parse_error").is_none());

        let back: InputMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn manual_metadata_has_fixed_content_type() {
        let meta = InputMetadata::Manual {
            line_count: 2,
            word_count: 12,
            content_type: ContentType::AnalystInput,
        };
        assert_eq!(meta.content_type(), ContentType::AnalystInput);
    }
}
