//! Sentry output for structured field-map loggers.
//!
//! The [`SentryOutput`] receives one [`Record`] per log line, a map of field
//! names to [`Value`]s, and forwards the records that reach its severity
//! threshold to Sentry as events. The reserved fields `message`, `time`,
//! `level` and `file` become the event message, timestamp and level. A few
//! well-known optional fields are mapped as well:
//!
//! | field                   | event attribute |
//! |-------------------------|-----------------|
//! | `host` / `server_name`  | `server_name`   |
//! | `release`               | `release`       |
//! | `culprit` / `role`      | `transaction`   |
//! | `http_request`          | `request`       |
//!
//! All other fields are attached as `extra["fields"]`.
//!
//! # Examples
//!
//! ```
//! use std::time::SystemTime;
//! use sentry_output::{CurrentHub, Record, SentryOutput, Severity};
//! use sentry_output::{KEY_LEVEL, KEY_MESSAGE, KEY_TIME};
//!
//! let output = SentryOutput::with_sink(CurrentHub).with_level(Severity::Info);
//!
//! # let events = sentry::test::with_captured_events(|| {
//! output
//!     .write(
//!         &Record::new()
//!             .with(KEY_MESSAGE, "cache miss")
//!             .with(KEY_TIME, SystemTime::now())
//!             .with(KEY_LEVEL, "debug"),
//!     )
//!     .unwrap();
//! output
//!     .write(
//!         &Record::new()
//!             .with(KEY_MESSAGE, "upstream timed out")
//!             .with(KEY_TIME, SystemTime::now())
//!             .with(KEY_LEVEL, "error")
//!             .with("upstream", "billing"),
//!     )
//!     .unwrap();
//! # });
//! # assert_eq!(events.len(), 1);
//! # assert_eq!(events[0].message.as_deref(), Some("upstream timed out"));
//! # assert_eq!(events[0].extra["fields"]["upstream"], "billing");
//! ```
//!
//! With the `log` feature, [`OutputLogger`] plugs the output into the `log`
//! crate, turning key/value pairs into record fields.

#![doc(html_favicon_url = "https://sentry-brand.storage.googleapis.com/favicon.ico")]
#![doc(html_logo_url = "https://sentry-brand.storage.googleapis.com/sentry-glyph-black.png")]
#![warn(missing_docs)]

mod converters;
mod error;
#[cfg(feature = "log")]
mod logger;
mod output;
mod record;
pub mod runtime;
mod severity;
mod sink;
mod stacktrace;
mod utils;

pub use converters::{convert_severity, request_from_http};
pub use error::Error;
#[cfg(feature = "log")]
pub use logger::{convert_log_level, record_from_log, NoopLogger, OutputLogger, KEY_MODULE};
pub use output::{SentryOutput, EXTRA_FIELDS, EXTRA_STACKTRACE, LOGGER_NAME};
pub use record::{Record, Value, KEY_FILE, KEY_LEVEL, KEY_MESSAGE, KEY_TIME};
pub use severity::{ParseSeverityError, Severity};
pub use sink::{CurrentHub, EventSink};
pub use stacktrace::{capture_stacktrace, StackTraceConfiguration};
