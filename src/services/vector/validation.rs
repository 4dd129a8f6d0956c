//! Pre-flight validation for vector queries

use super::types::VectorQuery;
use crate::error::ValidationError;

/// Validate a query before anything touches the network.
pub fn validate_vector_query(query: &VectorQuery) -> Result<(), ValidationError> {
    if query.keywords.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "keywords".to_string(),
        });
    }
    if query.knowledge_ids.is_empty() {
        return Err(ValidationError::Required {
            field: "knowledge_ids".to_string(),
        });
    }
    if query.topk == 0 {
        return Err(ValidationError::OutOfRange {
            field: "topk".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&query.similarity) {
        return Err(ValidationError::OutOfRange {
            field: "similarity".to_string(),
            reason: "must be between 0.0 and 1.0".to_string(),
        });
    }
    Ok(())
}
