pub mod error;
pub mod types;
pub mod router;
pub mod endpoints;

pub use error::ApiError;
pub use router::build_router;
pub use types::ApiContext;
