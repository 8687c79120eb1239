use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};
use sentry_core::protocol::{Level, Map, Request};

use crate::record::{Record, Value};
use crate::Severity;

/// Headers that are only forwarded when PII may be sent.
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "proxy-authorization",
    "set-cookie",
    "x-forwarded-for",
    "x-real-ip",
];

/// Converts a record [`Severity`] to a Sentry [`Level`].
pub fn convert_severity(severity: Severity) -> Level {
    match severity {
        Severity::Debug => Level::Debug,
        Severity::Info => Level::Info,
        Severity::Warn => Level::Warning,
        Severity::Error => Level::Error,
    }
}

/// Creates a Sentry [`Request`] from the head of an HTTP request.
///
/// Origin-form request targets (`/path?query`) are resolved against the
/// `Host` header. Cookies and sensitive headers are dropped unless
/// `send_default_pii` is set.
pub fn request_from_http(request: &http::Request<()>, send_default_pii: bool) -> Request {
    let uri = request.uri();
    let authority = uri
        .authority()
        .map(|a| a.as_str())
        .or_else(|| {
            request
                .headers()
                .get(http::header::HOST)
                .and_then(|h| h.to_str().ok())
        });
    let url = authority.and_then(|authority| {
        let scheme = uri.scheme_str().unwrap_or("http");
        format!("{}://{}{}", scheme, authority, uri.path()).parse().ok()
    });

    let mut headers: Map<String, String> = Map::new();
    for (name, value) in request.headers() {
        if !send_default_pii && SENSITIVE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        let value = value.to_str().unwrap_or_default();
        headers
            .entry(name.to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_owned());
    }

    let cookies = if send_default_pii {
        let cookies: Vec<&str> = request
            .headers()
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        (!cookies.is_empty()).then(|| cookies.join("; "))
    } else {
        None
    };

    Request {
        url,
        method: Some(request.method().to_string()),
        query_string: uri.query().map(ToOwned::to_owned),
        cookies,
        headers,
        ..Default::default()
    }
}

/// Converts a record [`Value`] to JSON for the event's extra data.
pub fn value_to_json(value: Value, send_default_pii: bool) -> serde_json::Value {
    match value {
        Value::Str(s) => s.into(),
        Value::Time(t) => time_to_json(t),
        Value::Request(req) => {
            serde_json::to_value(request_from_http(&req, send_default_pii)).unwrap_or_default()
        }
        Value::Json(v) => v,
    }
}

/// RFC 3339 text, or the debug form for times chrono cannot represent.
fn time_to_json(t: SystemTime) -> serde_json::Value {
    match to_datetime(t) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true).into(),
        None => format!("{t:?}").into(),
    }
}

fn to_datetime(t: SystemTime) -> Option<DateTime<Utc>> {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => DateTime::from_timestamp(i64::try_from(d.as_secs()).ok()?, d.subsec_nanos()),
        Err(err) => {
            let d = err.duration();
            let secs = i64::try_from(d.as_secs()).ok()?;
            match d.subsec_nanos() {
                0 => DateTime::from_timestamp(-secs, 0),
                nanos => DateTime::from_timestamp(-secs - 1, 1_000_000_000 - nanos),
            }
        }
    }
}

/// Converts all fields of a record into a JSON object.
pub fn record_to_json(record: Record, send_default_pii: bool) -> serde_json::Value {
    serde_json::Value::Object(
        record
            .into_iter()
            .map(|(k, v)| (k, value_to_json(v, send_default_pii)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    #[test]
    fn test_convert_severity() {
        assert_eq!(convert_severity(Severity::Debug), Level::Debug);
        assert_eq!(convert_severity(Severity::Info), Level::Info);
        assert_eq!(convert_severity(Severity::Warn), Level::Warning);
        assert_eq!(convert_severity(Severity::Error), Level::Error);
    }

    #[test]
    fn test_request_from_origin_form() {
        let req = http::Request::get("/orders/17?expand=items")
            .header("host", "shop.example.com")
            .header("accept", "text/html")
            .header("accept", "application/json")
            .header("authorization", "Bearer secret")
            .header("cookie", "session=abc")
            .body(())
            .unwrap();

        let sentry_req = request_from_http(&req, false);
        assert_eq!(
            sentry_req.url.as_ref().map(|u| u.as_str()),
            Some("http://shop.example.com/orders/17")
        );
        assert_eq!(sentry_req.method.as_deref(), Some("GET"));
        assert_eq!(sentry_req.query_string.as_deref(), Some("expand=items"));
        assert_eq!(sentry_req.headers["accept"], "text/html, application/json");
        assert!(!sentry_req.headers.contains_key("authorization"));
        assert!(!sentry_req.headers.contains_key("cookie"));
        assert_eq!(sentry_req.cookies, None);
    }

    #[test]
    fn test_request_with_pii() {
        let req = http::Request::post("https://api.example.com/login")
            .header("authorization", "Bearer secret")
            .header("cookie", "a=1")
            .header("cookie", "b=2")
            .body(())
            .unwrap();

        let sentry_req = request_from_http(&req, true);
        assert_eq!(
            sentry_req.url.as_ref().map(|u| u.as_str()),
            Some("https://api.example.com/login")
        );
        assert_eq!(sentry_req.headers["authorization"], "Bearer secret");
        assert_eq!(sentry_req.cookies.as_deref(), Some("a=1; b=2"));
    }

    #[test]
    fn test_request_without_host() {
        let req = http::Request::get("/").body(()).unwrap();
        assert_eq!(request_from_http(&req, false).url, None);
    }

    #[test]
    fn test_value_to_json() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_483_228_800);
        assert_eq!(
            value_to_json(Value::Time(t), false),
            serde_json::json!("2017-01-01T00:00:00Z")
        );
        assert_eq!(
            value_to_json(Value::from("x"), false),
            serde_json::json!("x")
        );
        assert_eq!(value_to_json(Value::from(3), false), serde_json::json!(3));

        let record = Record::new().with("a", true).with("b", "c");
        assert_eq!(
            record_to_json(record, false),
            serde_json::json!({"a": true, "b": "c"})
        );
    }

    #[test]
    fn test_time_out_of_range() {
        let before = SystemTime::UNIX_EPOCH - Duration::from_millis(1_500);
        assert_eq!(
            value_to_json(Value::Time(before), false),
            serde_json::json!("1969-12-31T23:59:58.500Z")
        );

        let far = SystemTime::UNIX_EPOCH + Duration::from_secs(1 << 50);
        let json = value_to_json(Value::Time(far), false);
        assert!(json.as_str().is_some_and(|s| !s.is_empty()));
    }
}
