//! SQL text assembly: value escaping, conjunctive filters, and the
//! destructive-keyword guard.

use crate::error::{KnowledgeError, ValidationError};

/// Field list meaning "select every column"
pub const WILDCARD: &str = "*";

/// Statements containing any of these (uppercased substring match) are
/// rejected before they reach the network. A coarse first filter, not a
/// parser and not a security boundary.
const DESTRUCTIVE_KEYWORDS: [&str; 3] = ["DROP", "DELETE", "UPDATE"];

/// A literal value bound into a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer, rendered verbatim
    Int(i64),
    /// Float, rendered verbatim
    Float(f64),
    /// Text, single-quoted with internal quotes doubled; the exact
    /// string `NULL` renders bare
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

/// One `field operator value` triple of a conjunctive WHERE clause.
#[derive(Debug, Clone)]
pub struct Condition {
    /// Column the condition applies to
    pub field: String,
    /// Comparison operator, written into the statement as given
    pub op: String,
    /// Right-hand literal, escaped on render
    pub value: SqlValue,
}

impl Condition {
    /// Build a condition triple
    pub fn new(field: impl Into<String>, op: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            field: field.into(),
            op: op.into(),
            value: value.into(),
        }
    }

    fn render(&self) -> String {
        format!("{} {} {}", self.field, self.op, escape_value(&self.value))
    }
}

/// Render a literal for inclusion in SQL text.
///
/// Numbers pass through verbatim, as does the exact text `NULL`; every
/// other string is single-quoted with embedded quotes doubled.
pub fn escape_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Int(n) => n.to_string(),
        SqlValue::Float(n) => n.to_string(),
        SqlValue::Text(s) if s == "NULL" => s.clone(),
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Assemble a SELECT over the given view.
///
/// Field whitelisting happens in the service before this runs; here the
/// field list is taken as already validated.
pub fn build_select(view: &str, fields: &[String], conditions: &[Condition]) -> String {
    let columns = if fields.len() == 1 && fields[0] == WILDCARD {
        WILDCARD.to_string()
    } else {
        fields.join(", ")
    };
    let mut sql = format!("SELECT {} FROM {}", columns, view);
    if !conditions.is_empty() {
        let clauses: Vec<String> = conditions.iter().map(Condition::render).collect();
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql
}

/// Reject statements that name a destructive operation.
pub(crate) fn check_destructive(sql: &str) -> Result<(), KnowledgeError> {
    let upper = sql.to_uppercase();
    for keyword in DESTRUCTIVE_KEYWORDS {
        if upper.contains(keyword) {
            return Err(KnowledgeError::Sql(format!(
                "statement rejected: contains destructive keyword {}",
                keyword
            )));
        }
    }
    Ok(())
}

/// Reject view names that are not plain identifiers; they end up inside
/// raw SQL text, so only `[A-Za-z0-9_.]` is allowed.
pub(crate) fn check_view_name(view: &str) -> Result<(), ValidationError> {
    if view.is_empty() {
        return Err(ValidationError::Required {
            field: "view".to_string(),
        });
    }
    if !view
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(ValidationError::Invalid {
            field: "view".to_string(),
            reason: format!("'{}' is not a plain identifier", view),
        });
    }
    Ok(())
}
