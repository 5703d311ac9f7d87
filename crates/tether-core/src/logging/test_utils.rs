//! Log capture for tests.
//!
//! Dropped frames, unroutable responses and exhausted reconnects surface only
//! as `tracing` events. [`capture_logs`] records them on the current thread so
//! a test can look them up by level and message.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// One recorded event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Level it was emitted at.
    pub level: Level,
    /// Module path of the call site.
    pub target: &'static str,
    /// The event message.
    pub message: String,
    /// Structured fields other than the message, rendered as text.
    pub fields: BTreeMap<&'static str, String>,
}

impl CapturedEvent {
    /// Text of the field `name`, if the event carried it.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn matches(&self, level: Option<Level>, needle: &str) -> bool {
        level.is_none_or(|l| l == self.level) && self.message.contains(needle)
    }
}

/// Fills a [`CapturedEvent`] from an event's fields.
struct Recorder<'a>(&'a mut CapturedEvent);

impl Recorder<'_> {
    fn put(&mut self, field: &Field, text: String) {
        if field.name() == "message" {
            self.0.message = text;
        } else {
            let _ = self.0.fields.insert(field.name(), text);
        }
    }
}

impl Visit for Recorder<'_> {
    // integers and bools fall through to here and render the same as Display
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }
}

/// Events recorded since [`capture_logs`] was called. Clones share storage.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    sink: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.sink.lock().clone()
    }

    /// First event at `level` whose message contains `needle`.
    pub fn find(&self, level: Level, needle: &str) -> Option<CapturedEvent> {
        self.sink
            .lock()
            .iter()
            .find(|e| e.matches(Some(level), needle))
            .cloned()
    }

    /// Whether an event at `level` mentions `needle`.
    pub fn has_event(&self, level: Level, needle: &str) -> bool {
        self.sink.lock().iter().any(|e| e.matches(Some(level), needle))
    }

    /// Whether an event at any level mentions `needle`.
    pub fn has_message(&self, needle: &str) -> bool {
        self.sink.lock().iter().any(|e| e.matches(None, needle))
    }

    /// Number of events at `level`.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.sink.lock().iter().filter(|e| e.level == level).count()
    }

    /// Messages of every `WARN` event, in order.
    pub fn warnings(&self) -> Vec<String> {
        self.sink
            .lock()
            .iter()
            .filter(|e| e.level == Level::WARN)
            .map(|e| e.message.clone())
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut captured = CapturedEvent {
            level: *metadata.level(),
            target: metadata.target(),
            message: String::new(),
            fields: BTreeMap::new(),
        };
        event.record(&mut Recorder(&mut captured));
        self.sink.lock().push(captured);
    }
}

/// Record every event on this thread until the guard drops.
///
/// The subscriber is thread-local (`set_default`), so parallel tests do not
/// see each other's events. Multi-threaded runtimes need the work to stay on
/// the test thread to be captured.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry().with(logs.clone()).set_default();
    (logs, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warn_event_is_found_by_level() {
        let (logs, _guard) = capture_logs();
        tracing::warn!("frame dropped");
        assert!(logs.has_event(Level::WARN, "frame dropped"));
        assert!(!logs.has_event(Level::INFO, "frame dropped"));
    }

    #[test]
    fn counts_and_warnings_by_level() {
        let (logs, _guard) = capture_logs();
        tracing::info!("connected");
        tracing::warn!("backlog full");
        tracing::warn!("attempts exhausted");

        assert_eq!(logs.count_at_level(Level::INFO), 1);
        assert_eq!(logs.count_at_level(Level::WARN), 2);
        assert_eq!(logs.warnings(), ["backlog full", "attempts exhausted"]);
    }

    #[test]
    fn message_search_ignores_level() {
        let (logs, _guard) = capture_logs();
        tracing::debug!("endpoint agent-1 opened");
        assert!(logs.has_message("agent-1"));
        assert!(!logs.has_message("agent-2"));
    }

    #[test]
    fn structured_fields_are_rendered() {
        let (logs, _guard) = capture_logs();
        tracing::warn!(endpoint = "agent", id = 7_i64, open = false, "unroutable response");

        let event = logs.find(Level::WARN, "unroutable").unwrap();
        assert_eq!(event.field("endpoint"), Some("agent"));
        assert_eq!(event.field("id"), Some("7"));
        assert_eq!(event.field("open"), Some("false"));
        assert!(event.field("missing").is_none());
        assert_eq!(logs.events().len(), 1);
    }

    #[test]
    fn events_on_other_threads_are_not_captured() {
        let (logs, _guard) = capture_logs();
        std::thread::spawn(|| tracing::warn!("elsewhere")).join().unwrap();
        assert!(logs.events().is_empty());
    }
}
