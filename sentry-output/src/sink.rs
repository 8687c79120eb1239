use std::sync::Arc;
use std::time::Duration;

use sentry_core::protocol::Event;
use sentry_core::{Client, Hub};

/// The destination of the events produced by [`SentryOutput`](crate::SentryOutput).
///
/// Submission is fire-and-forget: a sink owns its own transport, buffering
/// and retry behavior, and reports nothing back about delivery.
pub trait EventSink: Send + Sync {
    /// Hands an event over for delivery.
    fn submit(&self, event: Event<'static>);

    /// Waits up to `timeout` for buffered events to be sent.
    ///
    /// Returns `true` if the queue was drained in time.
    fn flush(&self, timeout: Duration) -> bool;
}

impl EventSink for Client {
    fn submit(&self, event: Event<'static>) {
        self.capture_event(event, None);
    }

    fn flush(&self, timeout: Duration) -> bool {
        Client::flush(self, Some(timeout))
    }
}

/// Events sent through a [`Hub`] have its current scope applied.
impl EventSink for Hub {
    fn submit(&self, event: Event<'static>) {
        self.capture_event(event);
    }

    fn flush(&self, timeout: Duration) -> bool {
        self.client()
            .is_some_and(|client| Client::flush(&client, Some(timeout)))
    }
}

/// Sends to whichever [`Hub`] is active on the calling thread.
///
/// Unlike a captured `Arc<Hub>`, this follows [`Hub::run`] and thread-local
/// hub switches. Nothing is sent when no client is bound.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentHub;

impl EventSink for CurrentHub {
    fn submit(&self, event: Event<'static>) {
        Hub::with_active(|hub| {
            hub.capture_event(event);
        })
    }

    fn flush(&self, timeout: Duration) -> bool {
        Hub::with_active(|hub| EventSink::flush(hub, timeout))
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn submit(&self, event: Event<'static>) {
        (**self).submit(event)
    }

    fn flush(&self, timeout: Duration) -> bool {
        (**self).flush(timeout)
    }
}
