//! Field-whitelisted queries through the table-API endpoint

mod builder;
mod service;


pub use builder::{build_select, escape_value, Condition, SqlValue, WILDCARD};
pub use service::{SqlResultSet, SqlService};
