//! Request and response types for vector retrieval

use serde::{Deserialize, Serialize};

/// A similarity search over one or more knowledge bases.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorQuery {
    /// Search text matched against indexed slices
    pub keywords: String,
    /// Knowledge bases to search
    pub knowledge_ids: Vec<String>,
    /// Maximum number of slices to return
    pub topk: u32,
    /// Minimum similarity score, `0.0..=1.0`
    pub similarity: f32,
    /// Optional tag filters
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl VectorQuery {
    /// A query with the service defaults: top 5 slices at similarity 0.5.
    pub fn new(keywords: impl Into<String>, knowledge_ids: Vec<String>) -> Self {
        Self {
            keywords: keywords.into(),
            knowledge_ids,
            topk: 5,
            similarity: 0.5,
            tags: Vec::new(),
        }
    }

    /// Cap the number of returned slices
    pub fn with_topk(mut self, topk: u32) -> Self {
        self.topk = topk;
        self
    }

    /// Set the similarity floor
    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = similarity;
        self
    }

    /// Restrict matches to slices carrying the given tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Result of a vector query.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VectorResult {
    /// Number of matching slices
    #[serde(default)]
    pub count: u32,
    /// Matching slices, best first
    #[serde(default)]
    pub slices: Vec<VectorSlice>,
}

/// One retrieved document slice.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VectorSlice {
    /// Slice identifier within its file
    pub slice_id: String,
    /// Slice text
    pub slice_content: String,
    /// Similarity score against the query
    pub similarity: f32,
    /// Source file identifier
    #[serde(default)]
    pub file_id: Option<String>,
    /// Source file display name
    #[serde(default)]
    pub file_name: Option<String>,
    /// Download URL for the source file
    #[serde(default)]
    pub file_url: Option<String>,
    /// Owning knowledge base identifier
    #[serde(default)]
    pub knowledge_id: Option<String>,
    /// Owning knowledge base display name
    #[serde(default)]
    pub knowledge_name: Option<String>,
}
