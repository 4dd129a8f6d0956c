//! SQL service: per-view field discovery and whitelisted execution

use super::builder::{build_select, check_destructive, check_view_name, Condition, WILDCARD};
use crate::error::{KnowledgeError, KnowledgeResult, ValidationError};
use crate::executor::RequestExecutor;
use crate::logging::LogGate;
use http::{HeaderMap, Method};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Rows and column names returned by the table API.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SqlResultSet {
    /// Column names, in select order
    #[serde(default)]
    pub columns: Vec<String>,
    /// Row values, one vector per row
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

/// Queries against the fixed-host table API.
///
/// Column sets are discovered lazily with a zero-row probe and cached
/// per view for the lifetime of the service. The cache has no
/// coalescing: concurrent first lookups of one view may probe twice,
/// which is harmless because every valid probe yields the same columns.
pub struct SqlService {
    executor: Arc<RequestExecutor>,
    gate: Arc<LogGate>,
    endpoint: Url,
    fields: Mutex<HashMap<String, Vec<String>>>,
}

impl std::fmt::Debug for SqlService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlService")
            .field("endpoint", &self.endpoint.as_str())
            .field("cached_views", &self.fields.lock().len())
            .finish()
    }
}

impl SqlService {
    pub(crate) fn new(executor: Arc<RequestExecutor>, gate: Arc<LogGate>, endpoint: Url) -> Self {
        Self {
            executor,
            gate,
            endpoint,
            fields: Mutex::new(HashMap::new()),
        }
    }

    /// Column names of the given view, probing on first use.
    pub async fn get_fields(&self, view: &str) -> KnowledgeResult<Vec<String>> {
        check_view_name(view)?;
        if let Some(cached) = self.fields.lock().get(view) {
            return Ok(cached.clone());
        }

        let probe = format!("SELECT * FROM {} WHERE 1=0", view);
        let result = self.execute_raw(&probe).await?;
        if result.columns.is_empty() {
            return Err(KnowledgeError::Sql(format!(
                "probe of view '{}' returned no columns",
                view
            )));
        }
        self.gate.debug(&format!(
            "cached {} field(s) for view '{}'",
            result.columns.len(),
            view
        ));
        self.fields
            .lock()
            .insert(view.to_string(), result.columns.clone());
        Ok(result.columns)
    }

    /// Select the given fields from a view, optionally filtered.
    ///
    /// The singleton `["*"]` selects every column; any other field list
    /// is checked against the view's cached whitelist and rejected with
    /// the offending names if it does not fit.
    pub async fn query(
        &self,
        view: &str,
        fields: &[String],
        conditions: &[Condition],
    ) -> KnowledgeResult<SqlResultSet> {
        check_view_name(view)?;
        if fields.is_empty() {
            return Err(ValidationError::Required {
                field: "fields".to_string(),
            }
            .into());
        }

        let wildcard = fields.len() == 1 && fields[0] == WILDCARD;
        if !wildcard {
            let allowed = self.get_fields(view).await?;
            let invalid: Vec<String> = fields
                .iter()
                .filter(|f| !allowed.contains(f))
                .cloned()
                .collect();
            if !invalid.is_empty() {
                return Err(ValidationError::InvalidFields {
                    view: view.to_string(),
                    fields: invalid,
                }
                .into());
            }
        }

        let sql = build_select(view, fields, conditions);
        self.execute_raw(&sql).await
    }

    /// Execute raw SQL text through the table API.
    ///
    /// Destructive statements are rejected before anything is sent.
    pub async fn execute_raw(&self, sql: &str) -> KnowledgeResult<SqlResultSet> {
        check_destructive(sql)?;

        let form = format!("sql={}", urlencoding::encode(sql));
        let payload = self
            .executor
            .execute_envelope_form(Method::POST, self.endpoint.clone(), HeaderMap::new(), form)
            .await?;

        serde_json::from_value(payload.clone()).map_err(|_| {
            KnowledgeError::Sql(format!("unexpected table-API payload: {}", payload))
        })
    }
}
