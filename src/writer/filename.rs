//! Rotated-filename derivation.
//!
//! Rotated files are named `<stem>.<timestamp-token>[.<pid>]<ext>`, where
//! the stem and extension come from the writer's base path. The convention
//! is load-bearing: external rotation tooling sorts backups by the embedded
//! timestamp, and the pruning pass rediscovers backups purely by matching
//! names against it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};

const DEFAULT_PATTERN: &str = "%Y-%m-%dT%H-%M-%S";

/// Timestamp token embedded in rotated filenames.
///
/// The default human-readable form sorts lexicographically in chronological
/// order. The Unix variants produce plain integers; `Custom` accepts any
/// `chrono` format string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    /// `%Y-%m-%dT%H-%M-%S`, e.g. `2016-11-04T18-30-00`.
    #[default]
    HumanReadable,
    /// Seconds since the Unix epoch.
    UnixSeconds,
    /// Milliseconds since the Unix epoch.
    UnixMillis,
    /// A caller-supplied `chrono` format string.
    Custom(String),
}

/// Derives the on-disk filename for a file rotated at `now`.
///
/// The local-time flag only affects formatted tokens; the Unix variants are
/// zone-independent.
pub(crate) fn backup_path(
    base: &Path,
    format: &TimestampFormat,
    local_time: bool,
    pid: Option<u32>,
    now: DateTime<Utc>,
) -> PathBuf {
    let token = timestamp_token(format, local_time, now);

    let has_ext = base.extension().is_some();
    let stem = if has_ext {
        base.file_stem()
    } else {
        base.file_name()
    };

    let mut name = OsString::from(stem.unwrap_or_default());
    name.push(format!(".{token}"));
    if let Some(pid) = pid {
        name.push(format!(".{pid}"));
    }
    if let Some(ext) = base.extension() {
        name.push(".");
        name.push(ext);
    }
    base.with_file_name(name)
}

fn timestamp_token(format: &TimestampFormat, local_time: bool, now: DateTime<Utc>) -> String {
    match format {
        TimestampFormat::HumanReadable => format_time(now, local_time, DEFAULT_PATTERN),
        TimestampFormat::UnixSeconds => now.timestamp().to_string(),
        TimestampFormat::UnixMillis => now.timestamp_millis().to_string(),
        TimestampFormat::Custom(pattern) => format_time(now, local_time, pattern),
    }
}

fn format_time(now: DateTime<Utc>, local_time: bool, pattern: &str) -> String {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    // An unparseable custom pattern would make rendering fail; fall back to
    // the default token instead of failing the write path.
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return format_time(now, local_time, DEFAULT_PATTERN);
    }
    if local_time {
        now.with_timezone(&Local)
            .format_with_items(items.into_iter())
            .to_string()
    } else {
        now.format_with_items(items.into_iter()).to_string()
    }
}

/// Name fragments the pruning pass matches directory entries against.
#[derive(Debug, Clone)]
pub(crate) struct NamePattern {
    /// `<stem>.`, shared by every backup of this base path.
    stem_prefix: String,
    /// `.<ext>`, or empty when the base path has no extension.
    suffix: String,
    /// The compressed variant, `.<ext>.gz`.
    gz_suffix: String,
    /// The base path's own file name (the stable pointer).
    base_name: String,
    /// Reserved sibling that is never a pruning candidate.
    reserved: String,
}

impl NamePattern {
    /// Returns `None` when the base path has no UTF-8 file name; pruning is
    /// skipped entirely in that case.
    pub(crate) fn derive(base: &Path) -> Option<Self> {
        let base_name = base.file_name()?.to_str()?.to_string();
        let (stem, suffix) = match base.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => (base.file_stem()?.to_str()?.to_string(), format!(".{ext}")),
            None => (base_name.clone(), String::new()),
        };
        Some(Self {
            stem_prefix: format!("{stem}."),
            gz_suffix: format!("{suffix}.gz"),
            reserved: format!("{stem}.error{suffix}"),
            base_name,
            suffix,
        })
    }

    /// Whether a sibling file name counts as a backup of this base path.
    ///
    /// The base name itself and the reserved `<stem>.error<ext>` sibling
    /// never match.
    pub(crate) fn matches(&self, name: &str) -> bool {
        name != self.base_name
            && name != self.reserved
            && name.starts_with(&self.stem_prefix)
            && (name.ends_with(&self.suffix) || name.ends_with(&self.gz_suffix))
    }
}
