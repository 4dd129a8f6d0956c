//! Level-filtered, redaction-aware logging gate.
//!
//! Every diagnostic line the crate emits flows through [`LogGate`], which
//! resolves a numeric threshold (0 = silent .. 5 = verbose), filters by
//! severity, stamps and prefixes the message, and hands it to an injected
//! [`LogSink`]. The gate performs no I/O itself.

use serde_json::Value;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Prefix attached to every emitted line
const LOG_PREFIX: &str = "knowledge-api";

/// Severity rank reserved for raw-body logging decisions. Never passed to
/// a sink; [`LogGate::verbose_enabled`] is how callers consult it.
pub const VERBOSE_RANK: u8 = 5;

/// Callback-visible log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Failures; always emitted unless the gate is silent
    Error,
    /// Recoverable problems; always emitted unless the gate is silent
    Warn,
    /// Lifecycle events
    Info,
    /// Per-request diagnostics
    Debug,
}

impl LogLevel {
    fn rank(self) -> u8 {
        match self {
            LogLevel::Error => 1,
            LogLevel::Warn => 2,
            LogLevel::Info => 3,
            LogLevel::Debug => 4,
        }
    }

    /// Label used in the emitted message prefix
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Resolved logging threshold in the range `0..=5`.
///
/// `0` is silent, `1..=4` map to error/warn/info/debug, `5` additionally
/// enables raw-body (verbose) logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogThreshold(u8);

impl LogThreshold {
    /// Default threshold (info)
    pub const INFO: LogThreshold = LogThreshold(3);
    /// Everything suppressed
    pub const SILENT: LogThreshold = LogThreshold(0);
    /// Raw bodies included
    pub const VERBOSE: LogThreshold = LogThreshold(VERBOSE_RANK);

    /// Resolve from a numeric input, clamped to `0..=5`.
    pub fn from_numeric(value: u8) -> Self {
        LogThreshold(value.min(VERBOSE_RANK))
    }

    /// Resolve from a case-insensitive name. Unrecognized names
    /// normalize to info.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "silent" | "none" | "off" => LogThreshold(0),
            "error" => LogThreshold(1),
            "warn" | "warning" => LogThreshold(2),
            "info" => LogThreshold(3),
            "debug" => LogThreshold(4),
            "verbose" => LogThreshold(VERBOSE_RANK),
            _ => LogThreshold::INFO,
        }
    }

    /// The resolved numeric rank
    pub fn rank(self) -> u8 {
        self.0
    }
}

impl Default for LogThreshold {
    fn default() -> Self {
        LogThreshold::INFO
    }
}

impl From<u8> for LogThreshold {
    fn from(value: u8) -> Self {
        LogThreshold::from_numeric(value)
    }
}

impl From<&str> for LogThreshold {
    fn from(value: &str) -> Self {
        LogThreshold::from_name(value)
    }
}

/// Sink receiving filtered, formatted log lines.
pub trait LogSink: Send + Sync {
    /// Deliver one formatted message at the given level
    fn write(&self, level: LogLevel, message: &str);
}

/// Default sink: forwards to the `tracing` macros.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => tracing::error!(target: "integrations_knowledge", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "integrations_knowledge", "{}", message),
            LogLevel::Info => tracing::info!(target: "integrations_knowledge", "{}", message),
            LogLevel::Debug => tracing::debug!(target: "integrations_knowledge", "{}", message),
        }
    }
}

/// Level-filtered gate in front of a [`LogSink`].
///
/// The threshold is atomic: the client registry retunes it when an
/// existing client is reused with a different logging configuration.
pub struct LogGate {
    threshold: AtomicU8,
    sink: Arc<dyn LogSink>,
}

impl LogGate {
    /// Create a gate with the given threshold and sink
    pub fn new(threshold: LogThreshold, sink: Arc<dyn LogSink>) -> Self {
        Self {
            threshold: AtomicU8::new(threshold.rank()),
            sink,
        }
    }

    /// Replace the threshold at runtime
    pub fn set_threshold(&self, threshold: LogThreshold) {
        self.threshold.store(threshold.rank(), Ordering::Relaxed);
    }

    /// The current threshold
    pub fn threshold(&self) -> LogThreshold {
        LogThreshold(self.threshold.load(Ordering::Relaxed))
    }

    /// Whether a message at `level` would pass the filter.
    ///
    /// Error and warn pass any non-silent threshold; info and debug pass
    /// only when their rank is within it.
    pub fn enabled(&self, level: LogLevel) -> bool {
        let threshold = self.threshold.load(Ordering::Relaxed);
        if threshold == 0 {
            return false;
        }
        match level {
            LogLevel::Error | LogLevel::Warn => true,
            _ => level.rank() <= threshold,
        }
    }

    /// Whether raw bodies may be logged
    pub fn verbose_enabled(&self) -> bool {
        self.threshold.load(Ordering::Relaxed) >= VERBOSE_RANK
    }

    /// Filter, format and deliver one message
    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let stamped = format!(
            "[{}] [{}] [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            LOG_PREFIX,
            level.label(),
            message
        );
        self.sink.write(level, &stamped);
    }

    /// Emit at error level
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Emit at warn level
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Emit at info level
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Emit at debug level
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
}

/// Mask an application identifier, keeping the first 3 characters.
///
/// Truncation is by character, not byte; identifiers are not required to
/// be ASCII.
pub fn mask_app_id(app_id: &str) -> String {
    if app_id.chars().count() <= 3 {
        app_id.to_string()
    } else {
        let prefix: String = app_id.chars().take(3).collect();
        format!("{}***", prefix)
    }
}

/// Mask a credential to a 4-character prefix plus placeholder.
pub fn mask_key(key: &str) -> String {
    if key.chars().count() <= 4 {
        "****".to_string()
    } else {
        let prefix: String = key.chars().take(4).collect();
        format!("{}****", prefix)
    }
}

/// Recursively replace secret-bearing fields in a JSON body.
///
/// `password`, `token` and `appSecret` values become a placeholder; other
/// values pass through unchanged.
pub fn redact_body(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                if matches!(key.as_str(), "password" | "token" | "appSecret") {
                    out.insert(key.clone(), Value::String("[REDACTED]".to_string()));
                } else {
                    out.insert(key.clone(), redact_body(val));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_body).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::CaptureSink;
    use serde_json::json;

    #[test]
    fn threshold_from_name_is_case_insensitive() {
        assert_eq!(LogThreshold::from_name("WARN"), LogThreshold(2));
        assert_eq!(LogThreshold::from_name("Verbose"), LogThreshold(5));
        assert_eq!(LogThreshold::from_name("silent"), LogThreshold(0));
    }

    #[test]
    fn unrecognized_name_normalizes_to_info() {
        assert_eq!(LogThreshold::from_name("chatty"), LogThreshold::INFO);
    }

    #[test]
    fn numeric_threshold_is_clamped() {
        assert_eq!(LogThreshold::from_numeric(99), LogThreshold::VERBOSE);
    }

    #[test]
    fn warn_threshold_suppresses_info_but_passes_error() {
        let sink = CaptureSink::new();
        let gate = LogGate::new(LogThreshold::from_name("warn"), sink.clone());

        gate.info("hidden");
        gate.error("shown");
        gate.warn("also shown");

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, LogLevel::Error);
        assert_eq!(lines[1].0, LogLevel::Warn);
    }

    #[test]
    fn silent_threshold_suppresses_even_errors() {
        let sink = CaptureSink::new();
        let gate = LogGate::new(LogThreshold::SILENT, sink.clone());

        gate.error("nope");
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn emitted_lines_are_stamped_and_prefixed() {
        let sink = CaptureSink::new();
        let gate = LogGate::new(LogThreshold::INFO, sink.clone());

        gate.info("hello");
        let lines = sink.lines();
        assert!(lines[0].1.contains("[knowledge-api]"));
        assert!(lines[0].1.contains("[INFO]"));
        assert!(lines[0].1.ends_with("hello"));
    }

    #[test]
    fn threshold_can_be_retuned_at_runtime() {
        let sink = CaptureSink::new();
        let gate = LogGate::new(LogThreshold::SILENT, sink.clone());

        gate.debug("dropped");
        gate.set_threshold(LogThreshold::from_numeric(4));
        gate.debug("kept");

        assert_eq!(sink.lines().len(), 1);
    }

    #[test]
    fn verbose_rank_gates_body_logging_only() {
        let sink = CaptureSink::new();
        let gate = LogGate::new(LogThreshold::from_numeric(4), sink);
        assert!(!gate.verbose_enabled());
        gate.set_threshold(LogThreshold::VERBOSE);
        assert!(gate.verbose_enabled());
    }

    #[test]
    fn mask_helpers() {
        assert_eq!(mask_app_id("console-admin"), "con***");
        assert_eq!(mask_app_id("ab"), "ab");
        assert_eq!(mask_key("ak-1234567890"), "ak-1****");
        assert_eq!(mask_key("ab"), "****");
    }

    #[test]
    fn mask_helpers_cut_on_character_boundaries() {
        // Identifiers may carry multi-byte characters; the cut must not
        // land inside one.
        assert_eq!(mask_app_id("知识库管理员"), "知识库***");
        assert_eq!(mask_app_id("ab€cd"), "ab€***");
        assert_eq!(mask_key("abc€f"), "abc€****");
        assert_eq!(mask_key("密钥"), "****");
    }

    #[test]
    fn redact_body_masks_nested_secret_fields() {
        let body = json!({
            "appId": "console-admin",
            "password": "hunter2",
            "nested": {"token": "abc", "keep": 1},
            "list": [{"appSecret": "s"}]
        });
        let redacted = redact_body(&body);
        assert_eq!(redacted["password"], "[REDACTED]");
        assert_eq!(redacted["nested"]["token"], "[REDACTED]");
        assert_eq!(redacted["nested"]["keep"], 1);
        assert_eq!(redacted["list"][0]["appSecret"], "[REDACTED]");
        assert_eq!(redacted["appId"], "console-admin");
    }
}
