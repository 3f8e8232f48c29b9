//! End-to-end rotation behavior against a real filesystem.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rotolog::writer::{RotatingWriter, TimestampFormat};
use rotolog::Level;

/// Regular files in `dir`, sorted by name. The symlink pointer is not one
/// of them, and millisecond tokens make name order match creation order.
fn regular_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().unwrap().is_file())
        .map(|entry| entry.path())
        .collect();
    files.sort();
    files
}

/// File sizes in `dir`, sorted ascending. Tolerates files vanishing under
/// a concurrent pruning pass.
fn sizes(dir: &Path) -> Vec<u64> {
    let mut sizes: Vec<u64> = regular_files(dir)
        .iter()
        .filter_map(|path| fs::metadata(path).ok())
        .map(|metadata| metadata.len())
        .collect();
    sizes.sort_unstable();
    sizes
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for {what}");
}

/// Millisecond tokens need distinct timestamps per rotation.
fn spaced_write(writer: &RotatingWriter, buf: &[u8]) {
    thread::sleep(Duration::from_millis(5));
    (&mut &*writer).write_all(buf).unwrap();
}

#[test]
fn backups_accumulate_and_converge_to_the_retention_limit() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("server.log");
    let writer = RotatingWriter::builder()
        .path(&base)
        .max_size(100)
        .max_backups(2)
        .timestamp_format(TimestampFormat::UnixMillis)
        .build();

    // Three 40-byte writes cross the threshold on the third; the crossing
    // write still lands in the old file, so the backup carries 120 bytes
    // and the fresh file none.
    for _ in 0..3 {
        spaced_write(&writer, &[b'a'; 40]);
    }
    wait_until("the first rotation to settle", || sizes(dir.path()) == [0, 120]);

    spaced_write(&writer, &[b'a'; 40]);
    assert_eq!(sizes(dir.path()), [40, 120]);

    // Two more writes trigger the second rotation; two backups sit at the
    // retention limit, nothing is pruned.
    for _ in 0..2 {
        spaced_write(&writer, &[b'a'; 40]);
    }
    wait_until("the second rotation to settle", || {
        sizes(dir.path()) == [0, 120, 120]
    });

    // The third rotation pushes the backup count past the limit and the
    // oldest backup goes away.
    let oldest = regular_files(dir.path())[0].clone();
    for _ in 0..3 {
        spaced_write(&writer, &[b'a'; 40]);
    }
    wait_until("the oldest backup to be pruned", || !oldest.exists());
    assert_eq!(sizes(dir.path()), [0, 120, 120]);
}

#[test]
fn concurrent_writers_lose_no_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("server.log");
    let writer = Arc::new(RotatingWriter::builder().path(&base).build());

    // Each thread writes blocks of a distinct byte so torn writes would
    // show up as a mixed block, not just as a wrong total.
    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                for _ in 0..25 {
                    (&mut &*writer).write_all(&[b'a' + i; 64]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    (&mut &*writer).flush().unwrap();

    let files = regular_files(dir.path());
    assert_eq!(files.len(), 1);
    let contents = fs::read(&files[0]).unwrap();
    assert_eq!(contents.len(), 8 * 25 * 64);

    let mut blocks = contents.chunks_exact(64);
    assert!(blocks.all(|block| block.iter().all(|byte| *byte == block[0])));
    assert!(blocks.remainder().is_empty());
}

#[test]
fn reopened_writer_appends_where_the_last_one_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("server.log");
    let build = || {
        RotatingWriter::builder()
            .path(&base)
            .timestamp_format(TimestampFormat::Custom("fixed".into()))
            .build()
    };

    let writer = build();
    (&mut &writer).write_all(b"first run\n").unwrap();
    drop(writer);

    let writer = build();
    (&mut &writer).write_all(b"second run\n").unwrap();

    assert_eq!(
        fs::read(dir.path().join("server.fixed.log")).unwrap(),
        b"first run\nsecond run\n"
    );
    assert_eq!(regular_files(dir.path()).len(), 1);
}

#[cfg(unix)]
#[test]
fn pointer_follows_the_newest_file_across_rotations() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("server.log");
    let writer = RotatingWriter::builder()
        .path(&base)
        .max_size(8)
        .timestamp_format(TimestampFormat::UnixMillis)
        .build();

    // Open below the threshold first: a write that opens and rotates in
    // the same call derives the same millisecond token twice and lands
    // back in the file it just left.
    (&mut &writer).write_all(b"head").unwrap();
    thread::sleep(Duration::from_millis(10));
    (&mut &writer).write_all(b"spill").unwrap();
    // The pointer refresh runs on the retention thread; reading through
    // the base path converges on the freshly opened, still empty file.
    wait_until("the pointer to leave the first file", || {
        fs::read(&base).map_or(false, |contents| contents.is_empty())
    });

    (&mut &writer).write_all(b"next").unwrap();
    thread::sleep(Duration::from_millis(10));
    (&mut &writer).write_all(b"spill").unwrap();
    wait_until("the pointer to leave the second file", || {
        fs::read(&base).map_or(false, |contents| contents.is_empty())
    });

    (&mut &writer).write_all(b"tail").unwrap();
    assert_eq!(fs::read(&base).unwrap(), b"tail");
    assert_eq!(regular_files(dir.path()).len(), 3);
}

#[test]
fn records_flow_through_the_logger_and_stay_valid_json() {
    std::env::remove_var("RUST_LOG");
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("server.log");

    let subscriber = rotolog::builder()
        .path(&base)
        .max_size(200)
        .timestamp_format(TimestampFormat::UnixMillis)
        .build();
    tracing::subscriber::with_default(subscriber, || {
        for round in 0..6_u32 {
            thread::sleep(Duration::from_millis(5));
            tracing::info!(round, filler = "x".repeat(80).as_str(), "rotating record");
        }
    });

    let files = regular_files(dir.path());
    assert!(files.len() >= 2, "expected rotation under record load");

    let mut seen = 0;
    for file in files {
        for line in fs::read_to_string(&file).unwrap().lines() {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(record["msg"], "rotating record");
            assert_eq!(record["level"], "info");
            seen += 1;
        }
    }
    assert_eq!(seen, 6, "every record lands in exactly one file");
}

#[test]
fn stack_names_the_logging_call_site() {
    std::env::remove_var("RUST_LOG");
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("server.log");

    let subscriber = rotolog::builder()
        .path(&base)
        .timestamp_format(TimestampFormat::Custom("fixed".into()))
        .level(Level::Info)
        .stack(true)
        .build();
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("where am i");
    });

    let contents = fs::read_to_string(dir.path().join("server.fixed.log")).unwrap();
    let record: serde_json::Value = serde_json::from_str(contents.trim_end()).unwrap();
    let stack = record["stack"].as_str().unwrap();

    // The logger's own frames are filtered out, so the innermost rendered
    // frame is the logging statement itself.
    let first = stack.lines().next().unwrap();
    assert!(
        first.contains("stack_names_the_logging_call_site"),
        "unexpected innermost frame: {first}"
    );
}
