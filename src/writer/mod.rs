//! Size-rotating log file writer.
//!
//! A [`RotatingWriter`] never writes to its configured path directly. Every
//! generation of the log lives in a timestamp-derived sibling file, and the
//! configured path is maintained as a symlink pointing at whichever file is
//! current. Readers can always `tail` the configured path; writers never
//! rename what they are appending to.
//!
//! Rotation is size-triggered and strict: the write that pushes the file
//! past `max_size` lands in the old file, then a fresh file is opened and
//! swapped in. Backup pruning, pointer refresh and ownership fixup run on a
//! short-lived background thread so the write path stays cheap.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use chrono::Utc;

mod filename;
mod hooks;
mod retention;

pub use filename::TimestampFormat;
pub use hooks::{BackupCandidate, CleanupHook, HeaderHook};

const DEFAULT_MODE: u32 = 0o644;

/// Append-only writer that rotates its file once a size threshold is
/// crossed.
///
/// The writer opens lazily: constructing one performs no I/O, and the first
/// file appears on the first write. A `max_size` of zero disables rotation,
/// a `max_backups` of zero retains every backup.
///
/// All methods take `&self`; the writer can be shared across threads behind
/// an [`Arc`] and implements [`Write`] for `&RotatingWriter`.
///
/// # Examples
///
/// ```no_run
/// use std::io::Write;
/// use rotolog::writer::RotatingWriter;
///
/// let writer = RotatingWriter::builder()
///     .path("/var/log/app/app.log")
///     .max_size(64 * 1024 * 1024)
///     .max_backups(7)
///     .ensure_dir(true)
///     .build();
/// (&writer).write_all(b"started\n")?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct RotatingWriter {
    path: Option<PathBuf>,
    max_size: u64,
    max_backups: usize,
    mode: u32,
    ensure_dir: bool,
    local_time: bool,
    embed_pid: bool,
    timestamp_format: TimestampFormat,
    header: Option<Box<dyn HeaderHook>>,
    cleanup: Option<Arc<dyn CleanupHook>>,
    pid: u32,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    file: Option<File>,
    size: u64,
}

impl RotatingWriter {
    /// Starts building a writer. See [`RotatingWriterBuilder`] for the
    /// available knobs and their defaults.
    #[must_use]
    pub fn builder() -> RotatingWriterBuilder {
        RotatingWriterBuilder::default()
    }

    /// Builds a writer for `path` with all options at their defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::builder().path(path).build()
    }

    /// Forces a rotation regardless of the current file size.
    ///
    /// A no-op for a writer without a path. The old file is closed only
    /// after the new one is open, so concurrent writers on other threads
    /// always have a live file to append to.
    ///
    /// # Errors
    ///
    /// Returns the error of opening the replacement file, or of writing the
    /// header into it. In the latter case the new file is already active
    /// and subsequent writes proceed normally.
    pub fn rotate(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut inner = self.lock_inner()?;
        self.rotate_locked(path, &mut inner)
    }

    /// Closes the current file, if any.
    ///
    /// Idempotent. The next write reopens lazily, adopting whatever is on
    /// disk at that point.
    ///
    /// # Errors
    ///
    /// Returns an error only when the internal lock is poisoned.
    pub fn close(&self) -> io::Result<()> {
        let mut inner = self.lock_inner()?;
        // Dropping the handle closes it.
        inner.file = None;
        inner.size = 0;
        Ok(())
    }

    fn write_bytes(&self, buf: &[u8]) -> io::Result<usize> {
        let Some(path) = &self.path else {
            return io::stderr().write(buf);
        };
        let mut inner = self.lock_inner()?;
        if inner.file.is_none() {
            self.open_current(path, &mut inner)?;
        }
        let written = match inner.file.as_mut() {
            Some(file) => file.write(buf)?,
            None => return Err(io::Error::new(io::ErrorKind::Other, "no open log file")),
        };
        inner.size += written as u64;
        if self.max_size > 0 && inner.size > self.max_size {
            self.rotate_locked(path, &mut inner)?;
        }
        Ok(written)
    }

    fn flush_inner(&self) -> io::Result<()> {
        if self.path.is_none() {
            return io::stderr().flush();
        }
        let mut inner = self.lock_inner()?;
        if let Some(file) = inner.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    /// Opens (or adopts) the file the base path should point at, without
    /// rotating anything.
    fn open_current(&self, base: &Path, inner: &mut Inner) -> io::Result<()> {
        let (file, current) = self.open_new(base)?;
        let metadata = file.metadata().ok();
        inner.file = Some(file);
        inner.size = metadata.as_ref().map_or(0, fs::Metadata::len);
        retention::refresh_pointer(base, &current, self.embed_pid);
        // Only a freshly created file gets a header; an adopted one already
        // had its chance.
        if inner.size == 0 {
            if let Some(metadata) = metadata {
                self.apply_header(inner, &current, &metadata)?;
            }
        }
        Ok(())
    }

    fn rotate_locked(&self, base: &Path, inner: &mut Inner) -> io::Result<()> {
        let (file, current) = self.open_new(base)?;
        let metadata = file.metadata();
        // Assigning the new handle drops, and thereby closes, the old one.
        inner.file = Some(file);
        inner.size = 0;
        self.spawn_retention(base, &current);
        self.apply_header(inner, &current, &metadata?)?;
        Ok(())
    }

    fn open_new(&self, base: &Path) -> io::Result<(File, PathBuf)> {
        if self.ensure_dir {
            if let Some(parent) = base.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        let current = filename::backup_path(
            base,
            &self.timestamp_format,
            self.local_time,
            self.embed_pid.then_some(self.pid),
            Utc::now(),
        );
        let file = self.open_options().open(&current)?;
        Ok((file, current))
    }

    fn apply_header(&self, inner: &mut Inner, path: &Path, metadata: &fs::Metadata) -> io::Result<()> {
        let Some(hook) = &self.header else {
            return Ok(());
        };
        let Some(bytes) = hook.header(path, metadata) else {
            return Ok(());
        };
        let file = match inner.file.as_mut() {
            Some(file) => file,
            None => return Err(io::Error::new(io::ErrorKind::Other, "no open log file")),
        };
        file.write_all(&bytes)?;
        inner.size += bytes.len() as u64;
        Ok(())
    }

    fn open_options(&self) -> fs::OpenOptions {
        let mut options = fs::OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.mode);
        }
        options
    }

    fn spawn_retention(&self, base: &Path, active: &Path) {
        let pass = retention::RetentionPass {
            base: base.to_path_buf(),
            active: active.to_path_buf(),
            max_backups: self.max_backups,
            embed_pid: self.embed_pid,
            cleanup: self.cleanup.clone(),
        };
        // Detached on purpose; retention is best-effort and must not block
        // or fail the write that triggered it.
        let _ = thread::Builder::new()
            .name("rotolog-retention".into())
            .spawn(move || pass.run());
    }

    fn lock_inner(&self) -> io::Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer mutex poisoned"))
    }
}

impl Write for &RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_inner()
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_inner()
    }
}

impl fmt::Debug for RotatingWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingWriter")
            .field("path", &self.path)
            .field("max_size", &self.max_size)
            .field("max_backups", &self.max_backups)
            .field("timestamp_format", &self.timestamp_format)
            .finish_non_exhaustive()
    }
}

/// Configures and builds a [`RotatingWriter`].
///
/// Defaults: no path (records go to stderr), rotation and pruning disabled,
/// mode `0o644`, UTC timestamps in file names, no PID embedding, no hooks.
#[derive(Default)]
pub struct RotatingWriterBuilder {
    path: Option<PathBuf>,
    max_size: u64,
    max_backups: usize,
    mode: u32,
    ensure_dir: bool,
    local_time: bool,
    embed_pid: bool,
    timestamp_format: TimestampFormat,
    header: Option<Box<dyn HeaderHook>>,
    cleanup: Option<Arc<dyn CleanupHook>>,
}

impl RotatingWriterBuilder {
    /// Base path of the log. The actual files are timestamp-derived
    /// siblings; this path is kept as a symlink to the current one.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Size threshold in bytes. Rotation triggers once the file size
    /// strictly exceeds it; zero disables rotation.
    #[must_use]
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Number of backups the pruning pass retains. Zero retains all.
    #[must_use]
    pub fn max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    /// Unix permission bits for newly created files. Zero means `0o644`.
    #[must_use]
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Create missing parent directories before opening files.
    #[must_use]
    pub fn ensure_dir(mut self, ensure: bool) -> Self {
        self.ensure_dir = ensure;
        self
    }

    /// Render formatted filename timestamps in local time instead of UTC.
    /// Has no effect on the Unix-epoch formats.
    #[must_use]
    pub fn local_time(mut self, local: bool) -> Self {
        self.local_time = local;
        self
    }

    /// Embed the process ID in file names so several processes can share a
    /// base path. Disables the symlink pointer.
    #[must_use]
    pub fn embed_pid(mut self, embed: bool) -> Self {
        self.embed_pid = embed;
        self
    }

    /// Timestamp token used in derived file names.
    #[must_use]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Hook invoked to produce a banner for new files: on creation when the
    /// file is empty, and unconditionally after every rotation.
    #[must_use]
    pub fn header_hook(mut self, hook: impl HeaderHook + 'static) -> Self {
        self.header = Some(Box::new(hook));
        self
    }

    /// Hook that replaces the default pruning policy. When set, it is
    /// invoked after every rotation with the sorted backup candidates and
    /// owns all deletion decisions.
    #[must_use]
    pub fn cleanup_hook(mut self, hook: impl CleanupHook + 'static) -> Self {
        self.cleanup = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn build(self) -> RotatingWriter {
        RotatingWriter {
            path: self.path,
            max_size: self.max_size,
            max_backups: self.max_backups,
            mode: if self.mode == 0 { DEFAULT_MODE } else { self.mode },
            ensure_dir: self.ensure_dir,
            local_time: self.local_time,
            embed_pid: self.embed_pid,
            timestamp_format: self.timestamp_format,
            header: self.header,
            cleanup: self.cleanup,
            pid: std::process::id(),
            inner: Mutex::new(Inner::default()),
        }
    }
}
