//! Vector retrieval against the configured knowledge bases

mod service;
mod types;
mod validation;


pub use service::VectorService;
pub use types::{VectorQuery, VectorResult, VectorSlice};
pub use validation::validate_vector_query;
