//! Backup retention, pointer maintenance, ownership fixup.
//!
//! Everything in this module is best-effort housekeeping around the writer's
//! primary guarantee. Failures are swallowed, never surfaced to the caller
//! that triggered a rotation: a backup that cannot be deleted or a symlink
//! that cannot be recreated must not turn the logging path into a second
//! point of application failure.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::filename::NamePattern;
use super::hooks::{BackupCandidate, CleanupHook};

/// One post-rotation housekeeping pass.
///
/// Runs detached from the writer: the rotation that spawned it does not
/// wait for it, and two passes from rapid successive rotations may race on
/// the same directory. Both only read-then-delete against the listing they
/// took, so the retention bound is eventual, not instantaneous.
pub(super) struct RetentionPass {
    /// The writer's base path (the stable pointer).
    pub base: PathBuf,
    /// The file the rotation just opened. Never a pruning candidate.
    pub active: PathBuf,
    pub max_backups: usize,
    pub embed_pid: bool,
    pub cleanup: Option<Arc<dyn CleanupHook>>,
}

impl RetentionPass {
    pub(super) fn run(self) {
        refresh_pointer(&self.base, &self.active, self.embed_pid);
        fixup_ownership(&self.base, &self.active);
        self.prune();
    }

    fn prune(&self) {
        let Some(pattern) = NamePattern::derive(&self.base) else {
            return;
        };
        let Some(dir) = self.base.parent() else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };

        let active_name = self.active.file_name().map(std::ffi::OsStr::to_os_string);

        let mut candidates: Vec<BackupCandidate> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                if Some(&name) == active_name.as_ref() {
                    return None;
                }
                if !pattern.matches(name.to_str()?) {
                    return None;
                }
                let metadata = entry.metadata().ok()?;
                Some(BackupCandidate {
                    path: entry.path(),
                    size: metadata.len(),
                    modified: metadata.modified().ok()?,
                })
            })
            .collect();

        candidates.sort_by_key(|candidate| candidate.modified);

        if let Some(cleanup) = &self.cleanup {
            cleanup.clean(&self.base, self.max_backups, &candidates);
            return;
        }

        if self.max_backups == 0 || candidates.len() <= self.max_backups {
            return;
        }
        let excess = candidates.len() - self.max_backups;
        for candidate in &candidates[..excess] {
            // Each deletion stands alone; one failure must not strand the rest.
            let _ = fs::remove_file(&candidate.path);
        }
    }
}

/// Points the base path at the newly opened file.
///
/// A stale pointer (or a leftover regular file) at the base path is removed
/// first. With PID embedding no pointer is maintained, since no single path
/// can safely name the current file across processes sharing a base name.
pub(super) fn refresh_pointer(base: &Path, active: &Path, embed_pid: bool) {
    let _ = fs::remove_file(base);
    if embed_pid {
        return;
    }
    #[cfg(unix)]
    if let Some(target) = active.file_name() {
        // Relative link, so the directory can be moved or mounted elsewhere.
        let _ = std::os::unix::fs::symlink(target, base);
    }
}

/// Hands the new file (and the pointer) to the invoking user when the
/// process runs under sudo. Only meaningful as root.
#[cfg(unix)]
fn fixup_ownership(base: &Path, active: &Path) {
    let (Some(uid), Some(gid)) = (sudo_id("SUDO_UID"), sudo_id("SUDO_GID")) else {
        return;
    };
    // SAFETY: geteuid has no arguments and cannot fail.
    if unsafe { libc::geteuid() } != 0 {
        return;
    }
    let _ = std::os::unix::fs::lchown(base, Some(uid), Some(gid));
    let _ = std::os::unix::fs::chown(active, Some(uid), Some(gid));
}

#[cfg(not(unix))]
fn fixup_ownership(_base: &Path, _active: &Path) {}

#[cfg(unix)]
fn sudo_id(var: &str) -> Option<u32> {
    std::env::var(var).ok()?.parse().ok().filter(|id| *id != 0)
}
