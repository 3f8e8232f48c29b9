//! Log level vocabulary.
//!
//! Six levels ordered `trace < debug < info < warn < error < fatal`. The
//! first five correspond one-to-one with the levels `tracing` defines;
//! `fatal` extends the vocabulary for records that terminate the process
//! after being written (see [`crate::fatal!`]). For filtering purposes a
//! fatal record travels through `tracing` at `ERROR` severity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RotologError;

/// Severity of a log record.
///
/// The derived ordering runs from least severe (`Trace`) to most severe
/// (`Fatal`). Parsing accepts the six lowercase names; `Display` produces
/// them back.
///
/// # Examples
///
/// ```
/// use rotolog::Level;
///
/// let level: Level = "warn".parse()?;
/// assert_eq!(level, Level::Warn);
/// assert!(Level::Trace < Level::Fatal);
/// # Ok::<(), rotolog::RotologError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Fine-grained diagnostic detail.
    Trace,
    /// Debugging information.
    Debug,
    /// Routine operational records.
    Info,
    /// Unusual but recoverable conditions.
    Warn,
    /// Failures the application should act on.
    Error,
    /// Unrecoverable failures; the process exits once the record is written.
    Fatal,
}

impl Level {
    /// Returns the lowercase name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = RotologError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _ => Err(RotologError::Level(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Self::Error,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::INFO => Self::Info,
            tracing::Level::DEBUG => Self::Debug,
            tracing::Level::TRACE => Self::Trace,
        }
    }
}

impl From<Level> for tracing::Level {
    /// `Fatal` has no native `tracing` counterpart and maps onto `ERROR`.
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => Self::TRACE,
            Level::Debug => Self::DEBUG,
            Level::Info => Self::INFO,
            Level::Warn => Self::WARN,
            Level::Error | Level::Fatal => Self::ERROR,
        }
    }
}
