use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sentry_core::protocol::{Event, Map};
use sentry_core::{sentry_debug, Client, ClientOptions};

use crate::converters::{convert_severity, record_to_json, request_from_http};
use crate::record::{Record, KEY_FILE, KEY_LEVEL, KEY_MESSAGE, KEY_TIME};
use crate::stacktrace::{capture_stacktrace, StackTraceConfiguration};
use crate::{runtime, utils, Error, EventSink, Severity};

/// The logger name set on every event.
pub const LOGGER_NAME: &str = "sentry-output";

/// Key of the remaining record fields in the event's extra data.
pub const EXTRA_FIELDS: &str = "fields";
/// Key of the captured stack trace in the event's extra data.
pub const EXTRA_STACKTRACE: &str = "stacktrace";

/// Upper bound for the flush after each forwarded event.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Forwards structured log records to Sentry.
///
/// Every call to [`write`](Self::write) that passes the severity threshold
/// turns the record into one Sentry event. Well-known fields are mapped onto
/// the event; everything else ends up in `extra["fields"]`.
///
/// The configuration is held in public fields and must not be changed once
/// the output is shared with a logger.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::SystemTime;
/// use sentry_output::{Record, SentryOutput, Severity, KEY_LEVEL, KEY_MESSAGE, KEY_TIME};
///
/// let client = Arc::new(sentry::Client::from_config(sentry::ClientOptions::default()));
/// let mut output = SentryOutput::with_client(client);
/// output.level = Severity::Warn;
///
/// let record = Record::new()
///     .with(KEY_MESSAGE, "payment declined")
///     .with(KEY_TIME, SystemTime::now())
///     .with(KEY_LEVEL, "error")
///     .with("role", "billing");
/// output.write(&record).unwrap();
/// ```
pub struct SentryOutput {
    /// Maximum time to wait for a delivery acknowledgement.
    ///
    /// Delivery is fire-and-forget, so this is currently not waited on.
    pub timeout: Duration,
    /// Records below this severity are dropped.
    pub level: Severity,
    /// When and how to attach stack traces.
    pub stacktrace: StackTraceConfiguration,
    /// Whether to add the `runtime.*` diagnostics to the forwarded fields.
    pub runtime_diagnostics: bool,
    /// Whether cookies and sensitive headers of HTTP requests are sent.
    pub send_default_pii: bool,
    /// Tags attached to every event.
    pub tags: Map<String, String>,

    sink: Arc<dyn EventSink>,
    host: String,
}

impl fmt::Debug for SentryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentryOutput")
            .field("timeout", &self.timeout)
            .field("level", &self.level)
            .field("stacktrace", &self.stacktrace)
            .field("runtime_diagnostics", &self.runtime_diagnostics)
            .field("send_default_pii", &self.send_default_pii)
            .field("tags", &self.tags)
            .field("host", &self.host)
            .finish()
    }
}

impl SentryOutput {
    /// Creates an output with a new client for the given DSN.
    ///
    /// The client is configured with the SDK defaults, so the release and
    /// environment are read from `SENTRY_RELEASE` and `SENTRY_ENVIRONMENT`.
    /// The `tags` are attached to every event.
    pub fn new<I, K, V>(dsn: &str, tags: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let options = ClientOptions {
            dsn: Some(dsn.parse()?),
            ..Default::default()
        };
        let client = Client::from_config(sentry::apply_defaults(options));

        let mut output = Self::with_client(Arc::new(client));
        output.tags = tags
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Ok(output)
    }

    /// Creates an output that sends to an existing client.
    pub fn with_client(client: Arc<Client>) -> Self {
        Self::with_sink(client)
    }

    /// Creates an output that sends to any [`EventSink`].
    ///
    /// Passing [`Hub::current()`](sentry_core::Hub::current) routes events
    /// through the hub, so its scope (tags, user, breadcrumbs) is applied.
    pub fn with_sink<S: EventSink + 'static>(sink: S) -> Self {
        Self {
            timeout: Duration::from_millis(300),
            level: Severity::Debug,
            stacktrace: StackTraceConfiguration::default(),
            runtime_diagnostics: true,
            send_default_pii: false,
            tags: Map::new(),
            sink: Arc::new(sink),
            host: utils::server_name().unwrap_or_default(),
        }
    }

    /// Sets the fallback server name, used when a record names no host.
    #[must_use]
    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the minimum severity of forwarded records.
    #[must_use]
    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    /// Sets the stack trace configuration.
    #[must_use]
    pub fn with_stacktrace(mut self, stacktrace: StackTraceConfiguration) -> Self {
        self.stacktrace = stacktrace;
        self
    }

    /// The fallback server name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns `true` if records of this severity are forwarded.
    pub fn is_enabled(&self, severity: Severity) -> bool {
        severity >= self.level
    }

    /// Forwards a record to Sentry.
    ///
    /// The record must contain `message` (text), `time` (time) and `level`
    /// (text) fields, otherwise a malformed record error is returned and
    /// nothing is sent. Unknown level names are treated as `debug`.
    ///
    /// Delivery problems are not reported: once the record passes the checks
    /// this returns `Ok(())`.
    pub fn write(&self, record: &Record) -> Result<(), Error> {
        let severity = Severity::resolve(record.require_str(KEY_LEVEL)?);
        if !self.is_enabled(severity) {
            return Ok(());
        }

        let event = self.event_from_record(record.clone(), severity)?;
        self.sink.submit(event);

        if !self.sink.flush(FLUSH_TIMEOUT) {
            sentry_debug!("[SentryOutput] flush did not complete within {FLUSH_TIMEOUT:?}");
        }
        Ok(())
    }

    fn event_from_record(
        &self,
        mut fields: Record,
        severity: Severity,
    ) -> Result<Event<'static>, Error> {
        let mut event = Event {
            message: Some(fields.require_str(KEY_MESSAGE)?.to_owned()),
            timestamp: fields.require_time(KEY_TIME)?,
            level: convert_severity(severity),
            logger: Some(LOGGER_NAME.into()),
            ..Default::default()
        };
        for key in [KEY_MESSAGE, KEY_TIME, KEY_LEVEL, KEY_FILE] {
            fields.remove(key);
        }

        let server_name = fields
            .take_str("host")
            .or_else(|| fields.take_str("server_name"))
            .unwrap_or_else(|| self.host.clone());
        event.server_name = Some(server_name.into());
        if let Some(release) = fields.take_str("release") {
            event.release = Some(release.into());
        }
        event.transaction = fields
            .take_str("culprit")
            .or_else(|| fields.take_str("role"));
        if let Some(req) = fields.take_request("http_request") {
            event.request = Some(request_from_http(&req, self.send_default_pii));
        }

        if self.runtime_diagnostics {
            runtime::inject(&mut fields);
        }

        if self.stacktrace.applies_to(severity) {
            match capture_stacktrace(&self.stacktrace) {
                Some(stacktrace) => {
                    let stacktrace = serde_json::to_value(stacktrace).unwrap_or_default();
                    event.extra.insert(EXTRA_STACKTRACE.into(), stacktrace);
                }
                None => sentry_debug!("[SentryOutput] could not capture a stacktrace"),
            }
        }

        event.extra.insert(
            EXTRA_FIELDS.into(),
            record_to_json(fields, self.send_default_pii),
        );
        event.tags.extend(self.tags.clone());
        Ok(event)
    }
}
