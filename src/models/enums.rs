use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(SignalType {
    DeliveryRisk => "delivery_risk",
    CostRisk => "cost_risk",
    AiEfficiency => "ai_efficiency",
});

impl SignalType {
    /// The closed value set a signal of this type may carry.
    pub fn allowed_values(&self) -> &'static [&'static str] {
        match self {
            Self::DeliveryRisk => &["LOW", "MEDIUM", "HIGH"],
            Self::CostRisk => &["NORMAL", "ANOMALOUS"],
            Self::AiEfficiency => &["LOW", "MODERATE", "HIGH"],
        }
    }

    pub fn all() -> &'static [SignalType] {
        &[Self::DeliveryRisk, Self::CostRisk, Self::AiEfficiency]
    }
}

str_enum!(SignalStatus {
    Active => "active",
    Unverified => "unverified",
    Overridden => "overridden",
});

str_enum!(InputFormat {
    Csv => "csv",
    Txt => "txt",
    Pdf => "pdf",
    Manual => "manual",
});

str_enum!(InputStatus {
    Pending => "pending",
    Processed => "processed",
    Error => "error",
});

str_enum!(ProgramStatus {
    Active => "active",
    Archived => "archived",
});

str_enum!(ContentType {
    RiskRegister => "risk_register",
    CostSummary => "cost_summary",
    Milestones => "milestones",
    AiUsage => "ai_usage",
    GeneralData => "general_data",
    StatusReport => "status_report",
    AnalystNotes => "analyst_notes",
    GeneralDocument => "general_document",
    AnalystInput => "analyst_input",
});
