//! Log capture for tests.
//!
//! [`capture_logs`] installs a subscriber for the duration of one closure on
//! the current thread only, so tests running in parallel never see each
//! other's events.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tracing::Level;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer};

const MAX_ENTRIES: usize = 1000;

/// A captured log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: Level, target: &str, message: &str) -> Self {
        Self {
            level,
            target: target.to_string(),
            message: message.to_string(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    /// Value of a structured field, if recorded.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        json!({
            "level": self.level.to_string(),
            "target": self.target,
            "message": self.message,
            "fields": fields,
        })
    }
}

/// Bounded buffer of captured entries; the oldest entry is dropped first.
#[derive(Debug, Default)]
pub struct LogStorage {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
}

impl LogStorage {
    #[must_use]
    pub const fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries.into()
    }
}

/// Captured events of one [`capture_logs`] call.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Vec<LogEntry>);

impl CapturedLogs {
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.0
    }

    #[must_use]
    pub fn at_level(&self, level: Level) -> Vec<&LogEntry> {
        self.0.iter().filter(|e| e.level == level).collect()
    }

    #[must_use]
    pub fn contains(&self, level: Level, message: &str) -> bool {
        self.0
            .iter()
            .any(|e| e.level == level && e.message.contains(message))
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|e| e.level == Level::ERROR)
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.0.iter().any(|e| e.level == Level::WARN)
    }

    /// Human-readable dump for assertion messages.
    #[must_use]
    pub fn display(&self) -> String {
        if self.0.is_empty() {
            return String::from("No logs captured");
        }
        let mut output = format!("Captured {} log entries:\n", self.0.len());
        for entry in &self.0 {
            let _ = writeln!(output, "[{}] {}: {}", entry.level, entry.target, entry.message);
            for (key, value) in &entry.fields {
                let _ = writeln!(output, "    {key} = {value}");
            }
        }
        output
    }
}

struct EntryVisitor<'a> {
    message: &'a mut String,
    fields: &'a mut Vec<(String, String)>,
}

impl Visit for EntryVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let value = format!("{value:?}");
        if field.name() == "message" {
            *self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

/// Layer pushing every event into a shared [`LogStorage`].
pub struct CaptureLayer {
    storage: Arc<Mutex<LogStorage>>,
}

impl CaptureLayer {
    #[must_use]
    pub const fn new(storage: Arc<Mutex<LogStorage>>) -> Self {
        Self { storage }
    }
}

impl<S: tracing::Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut message = String::new();
        let mut fields = Vec::new();
        event.record(&mut EntryVisitor {
            message: &mut message,
            fields: &mut fields,
        });

        let mut entry = LogEntry::new(*metadata.level(), metadata.target(), &message);
        entry.fields = fields;
        self.storage.lock().push(entry);
    }
}

/// Run `f` with a capturing subscriber at `level` (`RUST_LOG` wins when set).
pub fn capture_logs_at<T>(level: &str, f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    let storage = Arc::new(Mutex::new(LogStorage::new(MAX_ENTRIES)));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(CaptureLayer::new(Arc::clone(&storage)));

    let value = tracing::subscriber::with_default(subscriber, f);
    let entries = std::mem::take(&mut *storage.lock()).into_entries();
    (value, CapturedLogs(entries))
}

/// [`capture_logs_at`] with `debug`.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    capture_logs_at("debug", f)
}

/// Assert that `logs` holds an entry at `level` whose message contains `message`.
#[macro_export]
macro_rules! assert_log_contains {
    ($logs:expr, $level:expr, $message:expr) => {{
        let logs = &$logs;
        assert!(
            logs.contains($level, $message),
            "Expected log with level {} containing '{}'\n{}",
            $level,
            $message,
            logs.display()
        );
    }};
}

/// Assert that `logs` holds no error entries.
#[macro_export]
macro_rules! assert_no_errors {
    ($logs:expr) => {{
        let logs = &$logs;
        assert!(
            !logs.has_errors(),
            "Expected no errors but found some:\n{}",
            logs.display()
        );
    }};
}
