use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

/// Environment variable read by [`init_from_env`]
pub const LOG_ENV_VAR: &str = "PIPEWRIGHT_LOG";

const DEFAULT_CAPACITY: usize = 1000;

/// Log level enum for type-safe logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse a level name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// A single recorded log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub source: String, // e.g. "pipeline", "stage::switch"
}

/// Simple circular buffer for fixed-size log storage
struct CircularBuffer {
    buffer: Vec<LogEntry>,
    head: usize,
    capacity: usize,
}

impl CircularBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            head: 0,
            capacity: capacity.max(1),
        }
    }

    fn push(&mut self, item: LogEntry) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(item);
        } else {
            self.buffer[self.head] = item;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    fn to_vec(&self) -> Vec<LogEntry> {
        // Return items in chronological order
        let mut result = Vec::with_capacity(self.buffer.len());
        result.extend_from_slice(&self.buffer[self.head..]);
        result.extend_from_slice(&self.buffer[..self.head]);
        result
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.head = 0;
    }
}

/// In-memory logger keeping the most recent entries
///
/// Every record is forwarded to `tracing` whatever the minimum level, so an
/// installed subscriber applies its own filter. The minimum level only
/// governs what is kept in the buffer.
pub struct Logger {
    entries: Mutex<CircularBuffer>,
    min_level: AtomicU8,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(CircularBuffer::new(capacity)),
            min_level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// Whether a record at `level` would be kept in the buffer
    pub fn enabled(&self, level: LogLevel) -> bool {
        (level as u8) >= self.min_level.load(Ordering::Relaxed)
    }

    /// Whether a record at `level` goes anywhere: the buffer or a `tracing` subscriber
    pub fn wants(&self, level: LogLevel) -> bool {
        self.enabled(level) || tracing_enabled(level)
    }

    pub fn log(&self, level: LogLevel, message: &str, source: &str) {
        match level {
            LogLevel::Error => tracing::error!(source, "{}", message),
            LogLevel::Warn => tracing::warn!(source, "{}", message),
            LogLevel::Info => tracing::info!(source, "{}", message),
            LogLevel::Debug => tracing::debug!(source, "{}", message),
        }

        if !self.enabled(level) {
            return;
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            source: source.to_string(),
        };

        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    /// Set minimum log level (runtime filtering)
    pub fn set_min_level(&self, level: LogLevel) {
        self.min_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_min_level(&self) -> LogLevel {
        LogLevel::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    pub fn get_logs(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.to_vec(),
            Err(_) => Vec::new(),
        }
    }

    pub fn clear_logs(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

fn tracing_enabled(level: LogLevel) -> bool {
    match level {
        LogLevel::Error => tracing::enabled!(tracing::Level::ERROR),
        LogLevel::Warn => tracing::enabled!(tracing::Level::WARN),
        LogLevel::Info => tracing::enabled!(tracing::Level::INFO),
        LogLevel::Debug => tracing::enabled!(tracing::Level::DEBUG),
    }
}

// Global logger instance
lazy_static::lazy_static! {
    pub static ref LOGGER: Logger = Logger::new();
}

thread_local! {
    // Set once the failure currently unwinding through nested stages has been logged
    static FAILURE_REPORTED: Cell<bool> = Cell::new(false);
}

/// Log a failure at Error the first time it is seen on this thread, at Debug
/// as it propagates through enclosing stages
pub(crate) fn log_failure(source: &str, message: &str) {
    let first = FAILURE_REPORTED.with(|reported| !reported.replace(true));
    let level = if first { LogLevel::Error } else { LogLevel::Debug };
    LOGGER.log(level, message, source);
}

/// Mark that no failure is propagating on this thread
pub(crate) fn clear_failure() {
    FAILURE_REPORTED.with(|reported| reported.set(false));
}

/// Apply the level named by `PIPEWRIGHT_LOG` to the global logger
///
/// Returns the level that was applied, or `None` when the variable is unset
/// or unparseable (the current level is then left untouched).
pub fn init_from_env() -> Option<LogLevel> {
    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|value| LogLevel::parse(&value))?;
    LOGGER.set_min_level(level);
    Some(level)
}

// Macro for easy logging
#[macro_export]
macro_rules! pipeline_log {
    ($level:expr, $source:expr, $($arg:tt)*) => {
        {
            let level = $level;
            if $crate::logger::LOGGER.wants(level) {
                let message = format!($($arg)*);
                $crate::logger::LOGGER.log(level, &message, $source);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse(" WARN "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogLevel::Error.as_str(), "error");
    }

    #[test]
    fn test_min_level_filters() {
        let logger = Logger::with_capacity(10);
        assert_eq!(logger.get_min_level(), LogLevel::Info);

        logger.log(LogLevel::Debug, "hidden", "test");
        logger.log(LogLevel::Warn, "kept", "test");

        let logs = logger.get_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "kept");
        assert_eq!(logs[0].source, "test");

        logger.set_min_level(LogLevel::Debug);
        logger.log(LogLevel::Debug, "now visible", "test");
        assert_eq!(logger.get_logs().len(), 2);
    }

    #[test]
    fn test_buffer_keeps_most_recent_in_order() {
        let logger = Logger::with_capacity(3);
        for i in 0..5 {
            logger.log(LogLevel::Info, &format!("entry {}", i), "test");
        }

        let messages: Vec<String> = logger.get_logs().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["entry 2", "entry 3", "entry 4"]);
    }

    #[test]
    fn test_clear_logs() {
        let logger = Logger::with_capacity(3);
        logger.log(LogLevel::Error, "failure", "test");
        logger.clear_logs();
        assert!(logger.get_logs().is_empty());

        logger.log(LogLevel::Error, "after clear", "test");
        assert_eq!(logger.get_logs().len(), 1);
    }

    #[test]
    fn test_min_level_does_not_gate_tracing() {
        let logger = Logger::with_capacity(4);
        logger.set_min_level(LogLevel::Error);

        assert!(!logger.enabled(LogLevel::Debug));
        // no subscriber is installed for this thread, so nothing wants Debug
        assert!(!logger.wants(LogLevel::Debug));
        assert!(logger.wants(LogLevel::Error));
    }

    #[test]
    fn test_failure_logged_at_error_once_until_cleared() {
        clear_failure();
        log_failure("failure-test", "first report of failure-once-marker");
        log_failure("failure-test", "second report of failure-once-marker");
        clear_failure();
        log_failure("failure-test", "third report of failure-once-marker");
        clear_failure();

        let errors: Vec<String> = LOGGER
            .get_logs()
            .into_iter()
            .filter(|e| e.source == "failure-test" && e.level == LogLevel::Error)
            .map(|e| e.message)
            .collect();
        assert_eq!(
            errors,
            vec![
                "first report of failure-once-marker",
                "third report of failure-once-marker"
            ]
        );
    }

    #[test]
    fn test_init_from_env() {
        let previous = LOGGER.get_min_level();

        std::env::set_var(LOG_ENV_VAR, "bogus");
        assert_eq!(init_from_env(), None);
        assert_eq!(LOGGER.get_min_level(), previous);

        std::env::set_var(LOG_ENV_VAR, "Error");
        assert_eq!(init_from_env(), Some(LogLevel::Error));
        assert_eq!(LOGGER.get_min_level(), LogLevel::Error);

        std::env::remove_var(LOG_ENV_VAR);
        LOGGER.set_min_level(previous);
    }

    #[test]
    fn test_entry_serializes_lowercase_level() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Warn,
            message: "m".to_string(),
            source: "pipeline".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "warn");
        assert_eq!(json["source"], "pipeline");
    }
}
