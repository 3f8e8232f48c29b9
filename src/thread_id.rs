//! OS-level thread identification.
//!
//! Log records carry the identifier of the thread that emitted them so they
//! can be cross-referenced against externally captured diagnostics (a
//! `/proc/<pid>/task` listing, a debugger thread list, a kernel core dump).
//! That rules out [`std::thread::ThreadId`], which is a process-local
//! counter with no meaning outside the process. The real identifier requires
//! a platform-specific call, isolated here behind a single function with
//! per-target implementations.

/// Returns the OS-level identifier of the calling thread.
///
/// On Linux this is the kernel task id (`gettid`), the value visible in
/// `/proc` and in thread dumps. On macOS it is the system-wide unique
/// thread id reported by `pthread_threadid_np`, the value shown by
/// `sample` and Activity Monitor. On other platforms, where no such
/// identifier is exposed, a stable process-local counter is assigned to
/// each thread on first use.
///
/// Never blocks and never fails.
///
/// # Examples
///
/// ```
/// let tid = rotolog::thread_id();
/// assert_ne!(tid, 0);
/// ```
#[must_use]
pub fn thread_id() -> u64 {
    os_thread_id()
}

#[cfg(target_os = "linux")]
fn os_thread_id() -> u64 {
    // SAFETY: gettid takes no arguments and cannot fail.
    (unsafe { libc::syscall(libc::SYS_gettid) }) as u64
}

#[cfg(target_os = "macos")]
fn os_thread_id() -> u64 {
    let mut tid: u64 = 0;
    // SAFETY: pthread_self is always a valid handle for the calling thread
    // and tid points to a live u64.
    unsafe {
        libc::pthread_threadid_np(libc::pthread_self(), &mut tid);
    }
    tid
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn os_thread_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_ID: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        static ID: u64 = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    }

    ID.with(|id| *id)
}
