//! JSON record layer for `tracing` events.
//!
//! This module converts `tracing` events into single-line JSON records and
//! hands them to a byte sink, typically a
//! [`RotatingWriter`](crate::writer::RotatingWriter). Records carry a fixed
//! key prefix (`time`, `level`, `source`, `msg`), then the event's own
//! fields in declaration order, then the `tid` and optional `stack`
//! annotations.
//!
//! The layer itself never emits `tracing` events. Everything downstream of
//! `on_event` is plain I/O; a log statement inside the write path would
//! re-enter the subscriber.

use std::fmt::{self, Write as _};
use std::io::Write;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::level::Level;
use crate::stack;
use crate::thread_id::thread_id;

/// A [`Layer`] that writes one JSON line per event into `W`.
///
/// The sink sits behind a [`Mutex`], so one layer serializes all threads'
/// records; each record reaches the sink in a single `write_all` call.
/// Events whose level resolves to [`Level::Fatal`] flush the sink and then
/// terminate the process with exit code 1, unless
/// [`exit_on_fatal`](Self::exit_on_fatal) is disabled.
///
/// # Examples
///
/// ```no_run
/// use tracing_subscriber::layer::SubscriberExt;
/// use rotolog::{RecordLayer, writer::RotatingWriter};
///
/// let writer = RotatingWriter::new("/var/log/app/app.log");
/// let subscriber = tracing_subscriber::registry()
///     .with(RecordLayer::new(writer).with_stack(true));
/// tracing::subscriber::set_global_default(subscriber)?;
/// # Ok::<(), tracing::subscriber::SetGlobalDefaultError>(())
/// ```
pub struct RecordLayer<W> {
    sink: Mutex<W>,
    min_level: Level,
    include_source: bool,
    include_stack: bool,
    exit_on_fatal: bool,
}

impl<W: Write> RecordLayer<W> {
    /// Wraps a sink with default settings: all levels pass, source locations
    /// are included, stacks are not, and fatal records exit the process.
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
            min_level: Level::Trace,
            include_source: true,
            include_stack: false,
            exit_on_fatal: true,
        }
    }

    /// Drops records below `level` before their fields are even visited.
    #[must_use]
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Whether records carry a `source` key with the `file:line` of the
    /// logging statement.
    #[must_use]
    pub fn with_source_location(mut self, include: bool) -> Self {
        self.include_source = include;
        self
    }

    /// Whether records carry a `stack` key with a rendered capture of the
    /// logging call site. Capturing and resolving a stack costs orders of
    /// magnitude more than the rest of the record.
    #[must_use]
    pub fn with_stack(mut self, include: bool) -> Self {
        self.include_stack = include;
        self
    }

    /// Whether a fatal record terminates the process after being flushed.
    /// Defaults to `true`; disabling it is mainly useful under test.
    #[must_use]
    pub fn exit_on_fatal(mut self, exit: bool) -> Self {
        self.exit_on_fatal = exit;
        self
    }
}

impl<S, W> Layer<S> for RecordLayer<W>
where
    S: Subscriber,
    W: Write + Send + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let base = Level::from(*metadata.level());
        // Fatal records arrive as error events carrying a marker field, so
        // error events must survive the early check when only fatal passes.
        if base < self.min_level && !(base == Level::Error && self.min_level == Level::Fatal) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let level = if visitor.fatal { Level::Fatal } else { base };
        if level < self.min_level {
            return;
        }

        let mut record = String::with_capacity(256);
        record.push('{');
        push_entry(
            &mut record,
            "time",
            &serde_json::Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        push_entry(&mut record, "level", &serde_json::Value::from(level.as_str()));
        if self.include_source {
            if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
                push_entry(
                    &mut record,
                    "source",
                    &serde_json::Value::from(format!("{file}:{line}")),
                );
            }
        }
        if let Some(message) = &visitor.message {
            push_entry(&mut record, "msg", &serde_json::Value::from(message.as_str()));
        }
        for (name, value) in &visitor.fields {
            push_entry(&mut record, name, value);
        }
        push_entry(&mut record, "tid", &serde_json::Value::from(thread_id()));
        if self.include_stack {
            push_entry(&mut record, "stack", &serde_json::Value::from(stack::render(0)));
        }
        record.push_str("}\n");

        match self.sink.lock() {
            Ok(mut sink) => {
                if let Err(error) = sink.write_all(record.as_bytes()) {
                    eprintln!("rotolog: failed to write record: {error}");
                }
                if level == Level::Fatal {
                    let _ = sink.flush();
                }
            }
            Err(_) => eprintln!("rotolog: record sink poisoned, record lost"),
        }

        if level == Level::Fatal && self.exit_on_fatal {
            std::process::exit(1);
        }
    }
}

impl<W> fmt::Debug for RecordLayer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordLayer")
            .field("min_level", &self.min_level)
            .field("include_source", &self.include_source)
            .field("include_stack", &self.include_stack)
            .field("exit_on_fatal", &self.exit_on_fatal)
            .finish_non_exhaustive()
    }
}

/// Appends one `"key":value` entry, comma-separated after the first.
///
/// The record is assembled by hand because key order is part of the format,
/// and `serde_json`'s maps do not preserve it.
fn push_entry(record: &mut String, key: &str, value: &serde_json::Value) {
    if record.len() > 1 {
        record.push(',');
    }
    // Writing into a String cannot fail.
    let _ = write!(record, "{}:{}", serde_json::Value::from(key), value);
}

/// Collects an event's fields in declaration order.
///
/// The `message` field and the `fatal` marker are control data and get
/// pulled out of the field list.
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fatal: bool,
    fields: Vec<(&'static str, serde_json::Value)>,
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.push((field.name(), serde_json::Value::from(value)));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.push((field.name(), serde_json::Value::from(value)));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.push((field.name(), serde_json::Value::from(value)));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "fatal" {
            self.fatal |= value;
            return;
        }
        self.fields.push((field.name(), serde_json::Value::from(value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
            return;
        }
        self.fields.push((field.name(), serde_json::Value::from(value)));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
            return;
        }
        self.fields.push((field.name(), serde_json::Value::from(rendered)));
    }
}
