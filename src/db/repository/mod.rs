pub mod program;
pub mod input;
pub mod signal;
pub mod cost;
pub mod analyst_override;

pub use program::*;
pub use input::*;
pub use signal::*;
pub use cost::*;
pub use analyst_override::*;
