use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::Error;

/// Key holding the log message (text).
pub const KEY_MESSAGE: &str = "message";
/// Key holding the time the record was emitted (time).
pub const KEY_TIME: &str = "time";
/// Key holding the record severity name (text).
pub const KEY_LEVEL: &str = "level";
/// Key holding the emitting source file (text). Dropped before sending.
pub const KEY_FILE: &str = "file";

/// A single value of a [`Record`] field.
#[derive(Clone)]
pub enum Value {
    /// Plain text.
    Str(String),
    /// A point in time.
    Time(SystemTime),
    /// The head of an incoming HTTP request.
    Request(Arc<http::Request<()>>),
    /// Anything else, kept as JSON.
    Json(serde_json::Value),
}

impl Value {
    /// Captures the head (method, uri, version and headers) of an HTTP request.
    ///
    /// The body is not retained.
    pub fn from_request<B>(request: &http::Request<B>) -> Self {
        let mut head = http::Request::new(());
        *head.method_mut() = request.method().clone();
        *head.uri_mut() = request.uri().clone();
        *head.version_mut() = request.version();
        *head.headers_mut() = request.headers().clone();
        Value::Request(Arc::new(head))
    }

    /// A short name of the kind of value, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "text",
            Value::Time(_) => "a time",
            Value::Request(_) => "an http request",
            Value::Json(_) => "a json value",
        }
    }

    /// Returns the text if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the time if this is a [`Value::Time`].
    pub fn as_time(&self) -> Option<SystemTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns the request head if this is a [`Value::Request`].
    pub fn as_request(&self) -> Option<&http::Request<()>> {
        match self {
            Value::Request(req) => Some(req),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Time(t) => f.debug_tuple("Time").field(t).finish(),
            Value::Request(req) => f
                .debug_struct("Request")
                .field("method", req.method())
                .field("uri", req.uri())
                .finish(),
            Value::Json(v) => f.debug_tuple("Json").field(v).finish(),
        }
    }
}

// Requests compare by identity, they carry no meaningful equality.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Request(a), Value::Request(b)) => Arc::ptr_eq(a, b),
            (Value::Json(a), Value::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<SystemTime> for Value {
    fn from(t: SystemTime) -> Self {
        Value::Time(t)
    }
}

impl From<http::Request<()>> for Value {
    fn from(req: http::Request<()>) -> Self {
        Value::Request(Arc::new(req))
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

macro_rules! impl_from_json {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Json(v.into())
                }
            }
        )*
    };
}

impl_from_json!(bool, i32, i64, u32, u64, usize, f64);

/// One structured log entry: a mapping from field names to [`Value`]s.
///
/// # Examples
///
/// ```
/// use std::time::SystemTime;
/// use sentry_output::{Record, KEY_LEVEL, KEY_MESSAGE, KEY_TIME};
///
/// let record = Record::new()
///     .with(KEY_MESSAGE, "disk almost full")
///     .with(KEY_TIME, SystemTime::now())
///     .with(KEY_LEVEL, "warn")
///     .with("mount", "/var");
///
/// assert_eq!(record.get("mount").and_then(|v| v.as_str()), Some("/var"));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, consuming and returning the record.
    #[must_use]
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a field, returning the previous value.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Returns the value of a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Returns `true` if the field is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over the fields in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    /// Removes and returns a text field. Fields of another type are left alone.
    pub(crate) fn take_str(&mut self, key: &str) -> Option<String> {
        match self.take_if(key, |v| matches!(v, Value::Str(_)))? {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Removes and returns a request field. Fields of another type are left alone.
    pub(crate) fn take_request(&mut self, key: &str) -> Option<Arc<http::Request<()>>> {
        match self.take_if(key, |v| matches!(v, Value::Request(_)))? {
            Value::Request(req) => Some(req),
            _ => None,
        }
    }

    fn take_if<F: Fn(&Value) -> bool>(&mut self, key: &str, f: F) -> Option<Value> {
        if f(self.fields.get(key)?) {
            self.fields.remove(key)
        } else {
            None
        }
    }

    pub(crate) fn require_str(&self, key: &'static str) -> Result<&str, Error> {
        let value = self.fields.get(key).ok_or(Error::MissingField(key))?;
        value.as_str().ok_or(Error::UnexpectedType {
            field: key,
            expected: "text",
            found: value.kind(),
        })
    }

    pub(crate) fn require_time(&self, key: &'static str) -> Result<SystemTime, Error> {
        let value = self.fields.get(key).ok_or(Error::MissingField(key))?;
        value.as_time().ok_or(Error::UnexpectedType {
            field: key,
            expected: "a time",
            found: value.kind(),
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Record {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.fields
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
