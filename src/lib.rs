//! Rotolog: a rotating JSON file logger with stack capture.
//!
//! Rotolog turns [`tracing`] events into single-line JSON records and
//! appends them to a size-rotated log file:
//! - Size-triggered rotation with a stable symlink always naming the
//!   current file
//! - Background retention: backup pruning, pointer refresh, ownership
//!   fixup after `sudo`
//! - A six-step level vocabulary ending in `fatal`, which terminates the
//!   process after the record is flushed
//! - Optional call-site stack captures with pooled buffers and lazy
//!   symbol resolution
//! - OS thread IDs on every record, matching what external thread dumps
//!   report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  tracing macros (info!, warn!, fatal!)              │  ← Call sites
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  EnvFilter (tracing-subscriber)                     │  ← Level gate
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  RecordLayer (layer)                                │  ← Record format
//! │  - Field collection in declaration order            │
//! │  - Thread-id and stack annotation                   │
//! │  - Fatal upgrade and process exit                   │
//! └─────────────────────────────────────────────────────┘
//!         │                                │
//! ┌───────────────────┐   ┌───────────────────────────────┐
//! │ Stack subsystem   │   │ RotatingWriter (writer)       │
//! │ (stack)           │   │ - Size-triggered rotation     │
//! │ - Pooled capture  │   │ - Symlink pointer maintenance │
//! │ - Lazy resolution │   │ - Background retention pass   │
//! │ - Text rendering  │   │ - Header and cleanup hooks    │
//! └───────────────────┘   └───────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`writer`]: the size-rotating file writer, usable on its own as an
//!   [`std::io::Write`] sink
//! - [`stack`]: stack capture and rendering, usable without the logger
//!
//! # Record Format
//!
//! One event becomes one line:
//!
//! ```json
//! {"time":"2026-08-25T09:15:02.731842Z","level":"info","source":"src/server.rs:114","msg":"listening","port":8080,"tid":41712}
//! ```
//!
//! Key order is part of the format: `time`, `level`, `source`, `msg`, the
//! event's own fields in declaration order, then `tid` and optionally
//! `stack`. Record timestamps are always UTC; the local-time knob only
//! affects rotated file names.
//!
//! # Examples
//!
//! ```no_run
//! use rotolog::Level;
//!
//! rotolog::builder()
//!     .path("/var/log/app/app.log")
//!     .max_size(64 * 1024 * 1024)
//!     .max_backups(7)
//!     .level(Level::Debug)
//!     .init()?;
//!
//! tracing::info!(port = 8080, "listening");
//! tracing::warn!(attempts = 3, "retrying upstream");
//! # Ok::<(), rotolog::RotologError>(())
//! ```
//!
//! The writer and the stack subsystem also work standalone; see the
//! [`writer`] and [`stack`] module documentation.
//!
//! # Key Design Decisions
//!
//! ## A pointer, never a rename
//!
//! The configured path is a symlink and every generation of the log is a
//! timestamp-named sibling file. Rotation opens the next file and repoints
//! the symlink instead of renaming what a reader might be tailing, and a
//! crashed process resumes into the file the pointer names.
//!
//! ## Lazy frame resolution
//!
//! Stack capture records raw instruction pointers into pooled buffers and
//! defers symbolication to iteration. Call sites pay the cheap walk;
//! only frames actually rendered pay for symbols.
//!
//! ## Fatal as a marker field
//!
//! `tracing` has no level above `error`, so [`fatal!`] emits an error
//! event carrying a marker field. The record layer strips the marker,
//! writes the record as `fatal`, flushes the sink and exits the process.
//!
//! # Platform Support
//!
//! The symlink pointer and `sudo` ownership fixup are Unix-only; on other
//! platforms the writer still rotates and prunes, there is just no stable
//! pointer name. Thread IDs use `gettid` on Linux and
//! `pthread_threadid_np` on macOS, with a process-local counter elsewhere.

#![allow(clippy::multiple_crate_versions)]

pub mod stack;
pub mod writer;

mod builder;
mod error;
mod layer;
mod level;
mod thread_id;

pub use builder::LoggerBuilder;
pub use error::{Result, RotologError};
pub use layer::RecordLayer;
pub use level::Level;
pub use thread_id::thread_id;
pub use writer::RotatingWriter;

/// Re-export of the [`tracing`] crate.
///
/// The [`fatal!`] macro expands to `tracing` macro invocations; the
/// re-export keeps those working without the host crate naming `tracing`
/// in its own dependencies.
pub use tracing;

/// Starts configuring a logger. Equivalent to [`LoggerBuilder::new`].
#[must_use]
pub fn builder() -> LoggerBuilder {
    LoggerBuilder::new()
}

/// Logs a fatal record and, by default, terminates the process.
///
/// Emits an error-level event carrying a marker field that
/// [`RecordLayer`] upgrades to the `fatal` level. After the record is
/// written and flushed the process exits with code 1, unless the layer
/// was built with [`exit_on_fatal(false)`](RecordLayer::exit_on_fatal).
///
/// Accepts the same syntax as [`tracing::error!`].
///
/// # Examples
///
/// ```no_run
/// rotolog::fatal!(code = 12, "database unreachable");
/// ```
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::tracing::error!(fatal = true, $($arg)+)
    };
}
