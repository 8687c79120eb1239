#![cfg(feature = "log")]

use sentry::Level;
use sentry_output::{CurrentHub, OutputLogger, SentryOutput, Severity, EXTRA_FIELDS};

#[test]
fn test_log() {
    let output = SentryOutput::with_sink(CurrentHub).with_level(Severity::Warn);
    log::set_boxed_logger(Box::new(OutputLogger::new(output)))
        .map(|()| log::set_max_level(log::LevelFilter::Info))
        .unwrap();

    let events = sentry::test::with_captured_events(|| {
        log::info!(user_id = 42; "Hello World!");
        log::error!(error_code = 500, path = "/checkout"; "Payment failed");
        log::warn!(target: "reqwest::connect", "connection reset");
    });

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.level, Level::Error);
    assert_eq!(event.message.as_deref(), Some("Payment failed"));

    let fields = &event.extra[EXTRA_FIELDS];
    assert_eq!(fields["error_code"], 500);
    assert_eq!(fields["path"], "/checkout");
    assert_eq!(fields["module"], "test_log");
    assert!(fields.get("file").is_none());
}
