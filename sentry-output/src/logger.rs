use std::time::SystemTime;

use log::kv::{self, VisitSource};
use sentry_core::sentry_debug;

use crate::record::{Record, Value, KEY_FILE, KEY_LEVEL, KEY_MESSAGE, KEY_TIME};
use crate::{SentryOutput, Severity};

/// Key of the emitting module path.
pub const KEY_MODULE: &str = "module";

/// Targets whose records are never forwarded, they are emitted while
/// events are being delivered.
const IGNORED_TARGETS: &[&str] = &["sentry", "reqwest", "hyper", "ureq", "rustls"];

/// Logger that discards all log records.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl log::Log for NoopLogger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        false
    }

    fn log(&self, _: &log::Record<'_>) {}

    fn flush(&self) {}
}

/// A [`log::Log`] that forwards records to a [`SentryOutput`].
///
/// Records are passed on to a destination logger afterwards.
///
/// # Examples
///
/// ```
/// use sentry_output::{CurrentHub, OutputLogger, SentryOutput, Severity};
///
/// let output = SentryOutput::with_sink(CurrentHub).with_level(Severity::Warn);
/// let logger = OutputLogger::new(output);
///
/// log::set_boxed_logger(Box::new(logger)).unwrap();
/// log::set_max_level(log::LevelFilter::Info);
///
/// log::warn!(disk = "/var"; "disk almost full");
/// ```
#[derive(Debug)]
pub struct OutputLogger<L: log::Log = NoopLogger> {
    output: SentryOutput,
    dest: L,
}

impl OutputLogger<NoopLogger> {
    /// Creates a logger that only forwards to the output.
    pub fn new(output: SentryOutput) -> Self {
        Self {
            output,
            dest: NoopLogger,
        }
    }
}

impl<L: log::Log> OutputLogger<L> {
    /// Creates a logger that forwards to the output and then to `dest`.
    pub fn with_dest(output: SentryOutput, dest: L) -> Self {
        Self { output, dest }
    }

    /// The wrapped output.
    pub fn output(&self) -> &SentryOutput {
        &self.output
    }
}

impl<L: log::Log> log::Log for OutputLogger<L> {
    fn enabled(&self, md: &log::Metadata<'_>) -> bool {
        self.output.is_enabled(convert_log_level(md.level())) || self.dest.enabled(md)
    }

    fn log(&self, record: &log::Record<'_>) {
        let forward = self.output.is_enabled(convert_log_level(record.level()))
            && !IGNORED_TARGETS
                .iter()
                .any(|target| is_target_or_child(record.target(), target));
        if forward {
            if let Err(err) = self.output.write(&record_from_log(record)) {
                sentry_debug!("[OutputLogger] dropping log record: {err}");
            }
        }
        if self.dest.enabled(record.metadata()) {
            self.dest.log(record);
        }
    }

    fn flush(&self) {
        self.dest.flush()
    }
}

fn is_target_or_child(target: &str, parent: &str) -> bool {
    target
        .strip_prefix(parent)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::") || rest.starts_with('_'))
}

/// Converts a [`log::Level`] to a [`Severity`].
pub fn convert_log_level(level: log::Level) -> Severity {
    match level {
        log::Level::Error => Severity::Error,
        log::Level::Warn => Severity::Warn,
        log::Level::Info => Severity::Info,
        log::Level::Debug | log::Level::Trace => Severity::Debug,
    }
}

/// Creates a [`Record`] from a [`log::Record`], including its key/value pairs.
///
/// The time of the record is the time of the call.
pub fn record_from_log(record: &log::Record<'_>) -> Record {
    let mut fields = Record::new();
    if let Some(module) = record.module_path() {
        fields.insert(KEY_MODULE, module);
    }
    let _ = record
        .key_values()
        .visit(&mut FieldVisitor { fields: &mut fields });

    fields.insert(KEY_MESSAGE, record.args().to_string());
    fields.insert(KEY_TIME, SystemTime::now());
    fields.insert(KEY_LEVEL, convert_log_level(record.level()).as_str());
    if let Some(file) = record.file() {
        fields.insert(KEY_FILE, file);
    }
    fields
}

struct FieldVisitor<'a> {
    fields: &'a mut Record,
}

impl<'kvs> VisitSource<'kvs> for FieldVisitor<'_> {
    fn visit_pair(&mut self, key: kv::Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        self.fields.insert(key.as_str(), convert_kv_value(&value));
        Ok(())
    }
}

fn convert_kv_value(value: &kv::Value<'_>) -> Value {
    if let Some(s) = value.to_borrowed_str() {
        return s.into();
    }
    if let Some(b) = value.to_bool() {
        return b.into();
    }
    if let Some(n) = value.to_u64() {
        return n.into();
    }
    if let Some(n) = value.to_i64() {
        return n.into();
    }
    if let Some(n) = value.to_f64().and_then(serde_json::Number::from_f64) {
        return serde_json::Value::Number(n).into();
    }
    value.to_string().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_log_level() {
        assert_eq!(convert_log_level(log::Level::Trace), Severity::Debug);
        assert_eq!(convert_log_level(log::Level::Debug), Severity::Debug);
        assert_eq!(convert_log_level(log::Level::Info), Severity::Info);
        assert_eq!(convert_log_level(log::Level::Warn), Severity::Warn);
        assert_eq!(convert_log_level(log::Level::Error), Severity::Error);
    }

    #[test]
    fn test_record_from_log() {
        let kvs = vec![
            ("user_id", kv::Value::from(42u64)),
            ("name", kv::Value::from("ann")),
            ("ratio", kv::Value::from(0.5f64)),
            ("ok", kv::Value::from(true)),
            ("message", kv::Value::from("shadowed")),
        ];
        let fields = record_from_log(
            &log::Record::builder()
                .args(format_args!("hello {}", "world"))
                .level(log::Level::Warn)
                .target("app")
                .module_path(Some("app::db"))
                .file(Some("src/db.rs"))
                .key_values(&kvs)
                .build(),
        );

        assert_eq!(fields.get(KEY_MESSAGE), Some(&Value::from("hello world")));
        assert_eq!(fields.get(KEY_LEVEL), Some(&Value::from("warn")));
        assert_eq!(fields.get(KEY_FILE), Some(&Value::from("src/db.rs")));
        assert_eq!(fields.get(KEY_MODULE), Some(&Value::from("app::db")));
        assert!(fields.get(KEY_TIME).and_then(Value::as_time).is_some());
        assert_eq!(fields.get("user_id"), Some(&Value::from(42u64)));
        assert_eq!(fields.get("name"), Some(&Value::from("ann")));
        assert_eq!(fields.get("ratio"), Some(&Value::from(0.5)));
        assert_eq!(fields.get("ok"), Some(&Value::from(true)));
    }

    #[test]
    fn test_ignored_targets() {
        assert!(is_target_or_child("reqwest", "reqwest"));
        assert!(is_target_or_child("reqwest::connect", "reqwest"));
        assert!(is_target_or_child("sentry_core::client", "sentry"));
        assert!(!is_target_or_child("reqwester", "reqwest"));
        assert!(!is_target_or_child("app", "sentry"));
    }
}
