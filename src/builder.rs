//! Top-level logger assembly.
//!
//! [`LoggerBuilder`] wires the three pieces of this crate together: a
//! [`RotatingWriter`] as the sink, an [`EnvFilter`] for level filtering, and
//! a [`RecordLayer`] for the record format. `build()` returns the composed
//! subscriber for scoped or manual installation; `init()` installs it as
//! the process-wide default.
//!
//! Installation is deliberately explicit and single-shot. Nothing in this
//! crate installs a subscriber as a side effect, so a host application can
//! compose the layer into its own stack instead.

use std::fmt;
use std::path::PathBuf;

use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::error::Result;
use crate::layer::RecordLayer;
use crate::level::Level;
use crate::writer::{CleanupHook, HeaderHook, RotatingWriter, TimestampFormat};

/// Configures a complete logger.
///
/// Defaults follow operational practice rather than the zero values:
/// missing parent directories are created, filename timestamps use local
/// time, records carry source locations, and the threshold is
/// [`Level::Info`]. Without a path, records go to stderr.
///
/// # Examples
///
/// ```no_run
/// use rotolog::Level;
///
/// rotolog::builder()
///     .path("/var/log/app/app.log")
///     .max_size(64 * 1024 * 1024)
///     .max_backups(7)
///     .level(Level::Debug)
///     .init()?;
///
/// tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");
/// # Ok::<(), rotolog::RotologError>(())
/// ```
pub struct LoggerBuilder {
    writer: crate::writer::RotatingWriterBuilder,
    level: Level,
    source_location: bool,
    stack: bool,
    exit_on_fatal: bool,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            writer: RotatingWriter::builder().ensure_dir(true).local_time(true),
            level: Level::Info,
            source_location: true,
            stack: false,
            exit_on_fatal: true,
        }
    }
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base path of the log file. See
    /// [`RotatingWriterBuilder::path`](crate::writer::RotatingWriterBuilder::path).
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.writer = self.writer.path(path);
        self
    }

    /// Rotation threshold in bytes; zero disables rotation.
    #[must_use]
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.writer = self.writer.max_size(bytes);
        self
    }

    /// Number of rotated backups to retain; zero retains all.
    #[must_use]
    pub fn max_backups(mut self, count: usize) -> Self {
        self.writer = self.writer.max_backups(count);
        self
    }

    /// Unix permission bits for newly created log files.
    #[must_use]
    pub fn mode(mut self, mode: u32) -> Self {
        self.writer = self.writer.mode(mode);
        self
    }

    /// Create missing parent directories before opening files. On by
    /// default.
    #[must_use]
    pub fn ensure_dir(mut self, ensure: bool) -> Self {
        self.writer = self.writer.ensure_dir(ensure);
        self
    }

    /// Render filename timestamps in local time. On by default; record
    /// timestamps are always UTC.
    #[must_use]
    pub fn local_time(mut self, local: bool) -> Self {
        self.writer = self.writer.local_time(local);
        self
    }

    /// Embed the process ID in log file names.
    #[must_use]
    pub fn embed_pid(mut self, embed: bool) -> Self {
        self.writer = self.writer.embed_pid(embed);
        self
    }

    /// Timestamp token used in derived file names.
    #[must_use]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.writer = self.writer.timestamp_format(format);
        self
    }

    /// Banner hook for newly created and freshly rotated files.
    #[must_use]
    pub fn header_hook(mut self, hook: impl HeaderHook + 'static) -> Self {
        self.writer = self.writer.header_hook(hook);
        self
    }

    /// Replaces the default backup pruning policy.
    #[must_use]
    pub fn cleanup_hook(mut self, hook: impl CleanupHook + 'static) -> Self {
        self.writer = self.writer.cleanup_hook(hook);
        self
    }

    /// Minimum level a record needs to be written. `RUST_LOG` overrides
    /// this when set.
    #[must_use]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Minimum level given by name, for configurations that carry the
    /// level as a string.
    ///
    /// # Errors
    ///
    /// Returns [`RotologError::Level`](crate::RotologError::Level) when
    /// `name` is not one of the six lowercase level names.
    pub fn level_name(self, name: &str) -> Result<Self> {
        Ok(self.level(name.parse()?))
    }

    /// Whether records carry the `source` key. On by default.
    #[must_use]
    pub fn source_location(mut self, include: bool) -> Self {
        self.source_location = include;
        self
    }

    /// Whether records carry the `stack` key. Off by default.
    #[must_use]
    pub fn stack(mut self, include: bool) -> Self {
        self.stack = include;
        self
    }

    /// Whether a fatal record terminates the process. On by default.
    #[must_use]
    pub fn exit_on_fatal(mut self, exit: bool) -> Self {
        self.exit_on_fatal = exit;
        self
    }

    /// Composes the subscriber without installing it.
    ///
    /// Useful for scoped installation with
    /// [`tracing::subscriber::with_default`] or for layering into a larger
    /// subscriber stack.
    #[must_use]
    pub fn build(self) -> impl Subscriber + Send + Sync {
        let layer = RecordLayer::new(self.writer.build())
            .with_min_level(self.level)
            .with_source_location(self.source_location)
            .with_stack(self.stack)
            .exit_on_fatal(self.exit_on_fatal);
        // `fatal` is not a directive EnvFilter knows; route through the
        // tracing level it maps to.
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(tracing::Level::from(self.level).to_string()));
        tracing_subscriber::registry().with(filter).with(layer)
    }

    /// Builds the subscriber and installs it as the process-wide default.
    ///
    /// # Errors
    ///
    /// Returns [`RotologError::Subscriber`](crate::RotologError::Subscriber)
    /// when a global subscriber is already installed.
    pub fn init(self) -> Result<()> {
        tracing::subscriber::set_global_default(self.build())?;
        Ok(())
    }
}

impl fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("level", &self.level)
            .field("source_location", &self.source_location)
            .field("stack", &self.stack)
            .field("exit_on_fatal", &self.exit_on_fatal)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn built_subscriber_writes_records_through_the_writer() {
        std::env::remove_var("RUST_LOG");
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");

        let subscriber = LoggerBuilder::new()
            .path(&base)
            .timestamp_format(TimestampFormat::Custom("fixed".into()))
            .build();
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("below default threshold");
            tracing::info!(port = 8080_u64, "listening");
        });

        let contents = fs::read_to_string(dir.path().join("app.fixed.log")).unwrap();
        assert!(contents.contains("listening"));
        assert!(!contents.contains("below default threshold"));

        let record: serde_json::Value = serde_json::from_str(contents.trim_end()).unwrap();
        assert_eq!(record["level"], "info");
        assert_eq!(record["port"], 8080);
    }

    #[test]
    fn level_knob_lowers_the_threshold() {
        std::env::remove_var("RUST_LOG");
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");

        let subscriber = LoggerBuilder::new()
            .path(&base)
            .timestamp_format(TimestampFormat::Custom("fixed".into()))
            .level(Level::Debug)
            .build();
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("verbose now");
        });

        let contents = fs::read_to_string(dir.path().join("app.fixed.log")).unwrap();
        assert!(contents.contains("verbose now"));
    }

    #[test]
    fn fatal_threshold_admits_only_marked_errors() {
        std::env::remove_var("RUST_LOG");
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");

        let subscriber = LoggerBuilder::new()
            .path(&base)
            .timestamp_format(TimestampFormat::Custom("fixed".into()))
            .level(Level::Fatal)
            .exit_on_fatal(false)
            .build();
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("plain error");
            crate::fatal!("halt");
        });

        let contents = fs::read_to_string(dir.path().join("app.fixed.log")).unwrap();
        assert!(!contents.contains("plain error"));
        assert!(contents.contains("halt"));

        let record: serde_json::Value = serde_json::from_str(contents.trim_end()).unwrap();
        assert_eq!(record["level"], "fatal");
    }

    #[test]
    fn level_can_be_given_by_name() {
        let builder = LoggerBuilder::new().level_name("warn").unwrap();
        assert_eq!(builder.level, Level::Warn);

        let err = LoggerBuilder::new().level_name("verbose").unwrap_err();
        assert!(matches!(err, crate::RotologError::Level(_)));
    }

    #[test]
    fn parent_directories_are_created_by_default() {
        std::env::remove_var("RUST_LOG");
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested/deeper/app.log");

        let subscriber = LoggerBuilder::new()
            .path(&base)
            .timestamp_format(TimestampFormat::Custom("fixed".into()))
            .build();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("creates the tree");
        });

        assert!(dir.path().join("nested/deeper/app.fixed.log").is_file());
    }
}
