use sentry_core::types::ParseDsnError;
use thiserror::Error;

/// Errors returned by [`SentryOutput`](crate::SentryOutput).
#[derive(Debug, Error)]
pub enum Error {
    /// A reserved field is missing from the record.
    #[error("malformed record: missing required field `{0}`")]
    MissingField(&'static str),
    /// A reserved field holds a value of the wrong type.
    #[error("malformed record: field `{field}` must be {expected}, found {found}")]
    UnexpectedType {
        /// The offending field.
        field: &'static str,
        /// The kind of value the field must hold.
        expected: &'static str,
        /// The kind of value that was found.
        found: &'static str,
    },
    /// The DSN handed to [`SentryOutput::new`](crate::SentryOutput::new) is invalid.
    #[error("invalid dsn: {0}")]
    InvalidDsn(#[from] ParseDsnError),
}

impl Error {
    /// Returns `true` if the error was caused by a malformed record.
    pub fn is_malformed_record(&self) -> bool {
        matches!(self, Error::MissingField(_) | Error::UnexpectedType { .. })
    }
}
