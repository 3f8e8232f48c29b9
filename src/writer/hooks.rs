//! Rotation hooks.
//!
//! Two seams let callers extend rotation without touching the writer: a
//! header hook that stamps the start of every new file, and a cleanup hook
//! that replaces the default retention policy (for compression, archival to
//! another volume, and similar). Both traits have closure blanket impls, so
//! a plain `Fn` works wherever a hook is expected.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Produces an optional header for each newly opened log file.
///
/// The returned bytes are written before any record lands in the file and
/// count toward the rotation threshold. Returning `None` writes nothing.
///
/// # Examples
///
/// ```
/// use std::fs::Metadata;
/// use std::path::Path;
///
/// let writer = rotolog::RotatingWriter::builder()
///     .path("/tmp/app.log")
///     .header_hook(|path: &Path, _meta: &Metadata| {
///         Some(format!("# opened {}\n", path.display()).into_bytes())
///     })
///     .build();
/// # drop(writer);
/// ```
pub trait HeaderHook: Send + Sync {
    /// Returns the bytes to place at the start of the file at `path`.
    /// `metadata` describes the freshly opened file.
    fn header(&self, path: &Path, metadata: &Metadata) -> Option<Vec<u8>>;
}

impl<F> HeaderHook for F
where
    F: Fn(&Path, &Metadata) -> Option<Vec<u8>> + Send + Sync,
{
    fn header(&self, path: &Path, metadata: &Metadata) -> Option<Vec<u8>> {
        self(path, metadata)
    }
}

/// A backup file considered by the pruning pass.
#[derive(Debug, Clone)]
pub struct BackupCandidate {
    /// Full path of the backup.
    pub path: PathBuf,
    /// Size in bytes at listing time.
    pub size: u64,
    /// Filesystem modification time.
    pub modified: SystemTime,
}

/// Decides the fate of backup files after each rotation.
///
/// When a hook is configured it fully replaces the default policy: nothing
/// is deleted besides what the hook deletes itself, and it is consulted
/// even when the retention count is zero. Without a hook, the writer
/// deletes the oldest candidates until at most `max_backups` remain,
/// retaining everything when `max_backups` is 0.
///
/// The hook runs on the detached pruning thread, never on the thread that
/// triggered rotation.
pub trait CleanupHook: Send + Sync {
    /// Called after each rotation with the writer's base path, the
    /// configured retention count, and the candidate backups sorted by
    /// modification time, oldest first. The active file is never among the
    /// candidates.
    fn clean(&self, base: &Path, max_backups: usize, candidates: &[BackupCandidate]);
}

impl<F> CleanupHook for F
where
    F: Fn(&Path, usize, &[BackupCandidate]) + Send + Sync,
{
    fn clean(&self, base: &Path, max_backups: usize, candidates: &[BackupCandidate]) {
        self(base, max_backups, candidates)
    }
}
