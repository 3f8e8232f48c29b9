//! Error types for rotolog.
//!
//! This module defines the centralized error type [`RotologError`] and a type
//! alias [`Result`] for convenient error handling at the crate surface. All
//! errors are implemented using the `thiserror` crate for automatic `Error`
//! trait implementation.
//!
//! The low-level writer in [`crate::writer`] speaks `std::io::Result`
//! directly, since it implements [`std::io::Write`]; IO errors convert into
//! [`RotologError`] automatically via `#[from]` wherever they bubble up to
//! this level.

use thiserror::Error;

/// The main error type for rotolog operations.
///
/// This enum consolidates the error conditions a caller of the crate surface
/// can observe: IO failures from the rotating writer, malformed level names,
/// and subscriber installation conflicts.
#[derive(Debug, Error)]
pub enum RotologError {
    /// Filesystem or I/O operation failed.
    ///
    /// Wraps errors from standard library I/O operations. Automatically
    /// converts from `std::io::Error` using the `#[from]` attribute.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A level name could not be parsed.
    ///
    /// Occurs when a string is not one of `trace`, `debug`, `info`, `warn`,
    /// `error` or `fatal`. The string contains the rejected input.
    #[error("unknown log level: {0}")]
    Level(String),

    /// Installing the global tracing subscriber failed.
    ///
    /// Occurs when another subscriber has already been installed for this
    /// process. Automatically converts using the `#[from]` attribute.
    #[error("subscriber error: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// A specialized `Result` type for rotolog operations.
///
/// This is a type alias for `std::result::Result<T, RotologError>` that
/// simplifies function signatures throughout the crate.
pub type Result<T> = std::result::Result<T, RotologError>;
