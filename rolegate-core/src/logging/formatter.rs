//! Log line formatting

use chrono::{DateTime, Utc};

/// One record, captured at the time it was logged
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: log::Level,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: log::Level, message: impl Into<String>, target: impl Into<String>) -> Self {
        Self { timestamp: Utc::now(), level, target: target.into(), message: message.into() }
    }

    pub fn from_log_record(record: &log::Record) -> Self {
        Self::new(record.level(), record.args().to_string(), record.target())
    }
}

/// How log lines are written
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON, one object per line
    /// Example: {"timestamp":"2024-01-15T10:30:00Z","level":"INFO","target":"rolegate_core::matrix","message":"Matrix loaded"}
    Json,

    /// Human-readable
    /// Example: 2024-01-15 10:30:00.000 INFO  [rolegate_core::matrix] Matrix loaded
    #[default]
    Human,
}

impl LogFormat {
    /// Maps the `logging.format` config value ("text" or "json")
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "json" => Some(LogFormat::Json),
            "text" => Some(LogFormat::Human),
            _ => None,
        }
    }

    pub fn format_entry(&self, entry: &LogEntry) -> String {
        match self {
            LogFormat::Json => format_json(entry),
            LogFormat::Human => format_human(entry),
        }
    }
}

fn format_json(entry: &LogEntry) -> String {
    let json = serde_json::json!({
        "timestamp": entry.timestamp.to_rfc3339(),
        "level": entry.level.as_str(),
        "target": entry.target,
        "message": entry.message,
    });
    json.to_string()
}

fn format_human(entry: &LogEntry) -> String {
    let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
    format!("{} {:5} [{}] {}", timestamp, entry.level.as_str(), entry.target, entry.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format() {
        let entry = LogEntry::new(log::Level::Info, "Matrix loaded", "rolegate_core::matrix");

        let formatted = LogFormat::Json.format_entry(&entry);

        let parsed: serde_json::Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["message"], "Matrix loaded");
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["target"], "rolegate_core::matrix");
    }

    #[test]
    fn test_human_format() {
        let entry = LogEntry::new(log::Level::Warn, "Cell busy", "rolegate_core::matrix");

        let formatted = LogFormat::Human.format_entry(&entry);

        assert!(formatted.contains("WARN "));
        assert!(formatted.contains("[rolegate_core::matrix]"));
        assert!(formatted.ends_with("Cell busy"));
    }

    #[test]
    fn test_config_values() {
        assert_eq!(LogFormat::from_config("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::from_config("text"), Some(LogFormat::Human));
        assert_eq!(LogFormat::from_config("xml"), None);
    }
}
