pub mod enums;
pub mod program;
pub mod input;
pub mod signal;
pub mod cost_metric;
pub mod analyst_override;

pub use program::Program;
pub use input::{InputMetadata, InputRecord};
pub use signal::Signal;
pub use cost_metric::CostMetric;
pub use analyst_override::{AnalystOverride, MIN_JUSTIFICATION_CHARS};
