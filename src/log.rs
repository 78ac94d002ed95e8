//! Logging side channel for storage events.
//!
//! Every event carries an optional label and a message. The sink decides where
//! it goes; without one, events are printed to stdout.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Destination for `(label, message)` events.
pub trait LogSink: Send + Sync {
    /// Receive one event.
    fn log(&self, label: Option<&str>, message: &str);

    /// Whether this sink already emits every event through `tracing`.
    ///
    /// [`Logger`] mirrors events to `tracing` itself unless this is `true`.
    fn forwards_to_tracing(&self) -> bool {
        false
    }
}

/// Prints every event to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn log(&self, label: Option<&str>, message: &str) {
        match label {
            Some(label) => println!("[{}] {}", label, message),
            None => println!("{}", message),
        }
    }
}

/// Forwards every event to `tracing`, with the label as a field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, label: Option<&str>, message: &str) {
        let label = label.unwrap_or_default();
        if message.starts_with(ERROR_PREFIX) {
            tracing::warn!(label, "{}", message);
        } else {
            tracing::info!(label, "{}", message);
        }
    }

    fn forwards_to_tracing(&self) -> bool {
        true
    }
}

/// Type alias for a caller-supplied log callback.
///
/// The callback receives the label (if any) and the message.
pub type LogCallback = Box<dyn Fn(Option<&str>, &str) + Send + Sync>;

/// Hands every event to a caller closure.
pub struct CallbackSink {
    callback: LogCallback,
}

impl CallbackSink {
    /// Wrap a closure as a sink.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Option<&str>, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl LogSink for CallbackSink {
    fn log(&self, label: Option<&str>, message: &str) {
        (self.callback)(label, message)
    }
}

/// One captured event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Label attached by the logger, if any
    pub label: Option<String>,
    /// Event text
    pub message: String,
}

/// Keeps every event in memory so a best-effort run can be inspected afterwards.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event received so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages only, in arrival order.
    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.message).collect()
    }

    /// Number of error events received.
    pub fn error_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| e.message.starts_with(ERROR_PREFIX))
            .count()
    }

    /// Drop every captured event.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl LogSink for MemorySink {
    fn log(&self, label: Option<&str>, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(LogEvent {
                label: label.map(str::to_string),
                message: message.to_string(),
            });
        }
    }
}

/// Prefix carried by every error event.
pub const ERROR_PREFIX: &str = "ERROR - ";

/// Logging collaborator held by every entry.
///
/// Cloning is cheap; children created from an entry inherit its logger.
#[derive(Clone)]
pub struct Logger {
    label: Option<String>,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Create a logger over the given sink.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { label: None, sink }
    }

    /// Attach a label to every event.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The label attached to events, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Emit an informational event.
    pub fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        if !self.sink.forwards_to_tracing() {
            tracing::debug!(label = self.label().unwrap_or_default(), "{}", message);
        }
        self.sink.log(self.label(), message);
    }

    /// Emit an error event.
    pub fn error(&self, message: impl fmt::Display) {
        let message = format!("{}{}", ERROR_PREFIX, message);
        if !self.sink.forwards_to_tracing() {
            tracing::warn!(label = self.label().unwrap_or_default(), "{}", message);
        }
        self.sink.log(self.label(), &message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Arc::new(StdoutSink))
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    struct CountEvents(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for CountEvents {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Number of `tracing` events emitted for one info and one error.
    fn traced_events(sink: Arc<dyn LogSink>) -> usize {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(CountEvents(count.clone()));
        tracing::subscriber::with_default(subscriber, || {
            let logger = Logger::new(sink).with_label("job-7");
            logger.info("Directory [/tmp/a/] Was Created.");
            logger.error("[/tmp/b/] Does Not Exist.");
        });
        count.load(Ordering::SeqCst)
    }

    #[test]
    fn test_each_event_traced_once() {
        assert_eq!(traced_events(Arc::new(TracingSink)), 2);
        assert_eq!(traced_events(Arc::new(MemorySink::new())), 2);
    }

    #[test]
    fn test_memory_sink_captures_label() {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(sink.clone()).with_label("job-7");

        logger.info("Directory [/tmp/a/] Was Created.");
        logger.error("[/tmp/b/] Does Not Exist.");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].label.as_deref(), Some("job-7"));
        assert_eq!(events[1].message, "ERROR - [/tmp/b/] Does Not Exist.");
        assert_eq!(sink.error_count(), 1);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_callback_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let logger = Logger::new(Arc::new(CallbackSink::new(move |label, message| {
            captured
                .lock()
                .unwrap()
                .push(format!("{:?}:{}", label, message));
        })));

        logger.info("hello");

        assert_eq!(seen.lock().unwrap().as_slice(), ["None:hello"]);
    }

    #[test]
    fn test_default_logger_has_no_label() {
        let logger = Logger::default();
        assert!(logger.label().is_none());
        logger.info("stdout sink does not panic");
    }
}
