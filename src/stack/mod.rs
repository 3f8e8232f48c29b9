//! Call-stack capture with pooled frame storage.
//!
//! Capturing a stack costs two things: walking the frames and resolving
//! addresses into names. This module keeps both cheap enough for the logging
//! path. Raw return addresses land in a reusable buffer checked out of a
//! free-list pool, and resolution into [`Frame`]s happens lazily while the
//! [`Stack`] is iterated, so a capture that is never rendered never pays for
//! symbolication.
//!
//! Frames belonging to the capture machinery itself (this module, the
//! unwinder, the `tracing` dispatch chain when invoked from a subscriber
//! layer) are filtered out at resolution time by symbol-name prefix, which
//! keeps the `skip` parameter stable from the caller's perspective across
//! build profiles. Iteration ends before the process-bootstrap scaffolding,
//! so rendered output never contains `lang_start` or `_start` frames.

mod formatter;

pub use formatter::{render, Formatter};

use std::collections::VecDeque;
use std::ffi::c_void;
use std::mem;
use std::sync::Mutex;

/// Number of raw addresses a pooled buffer holds before regrowing.
const DEFAULT_STACK_CAPACITY: usize = 64;

/// Addresses walked past the skip count in [`Depth::First`] mode.
///
/// Large enough to cover the unwinder's and this module's own frames ahead
/// of the first caller frame.
const FIRST_WINDOW: usize = 16;

/// Symbol prefixes of the capture machinery's own leading frames.
///
/// Only the leading run of matching frames is dropped; once a caller frame
/// has been seen, later frames from these crates are kept. The `tracing`
/// dispatcher reads the current dispatch out of a thread local, so
/// `std::thread::local::` counts as machinery here.
const INTERNAL_PREFIXES: &[&str] = &[
    "backtrace::",
    "rotolog::stack::",
    "rotolog::layer::",
    "tracing::",
    "tracing_core::",
    "tracing_subscriber::",
    "std::thread::local::",
    "core::ops::function::",
];

static STORAGE_POOL: StoragePool = StoragePool::new(DEFAULT_STACK_CAPACITY);

/// How deep of a stack trace should be captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Capture only the first caller frame (fast path for "caller location"
    /// annotation).
    First,

    /// Capture the entire call stack, regrowing storage as needed.
    Full,
}

/// One resolved entry of a captured call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    function: String,
    file: String,
    line: u32,
}

impl Frame {
    pub(crate) fn new(function: String, file: String, line: u32) -> Self {
        Self {
            function,
            file,
            line,
        }
    }

    /// Demangled function name, without the trailing symbol hash.
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Source file path, or `<unknown>` when debug info is absent.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Source line, or 0 when debug info is absent.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }
}

/// A captured stack trace.
///
/// Holds raw return addresses in a pooled buffer and resolves them into
/// [`Frame`]s on demand as the stack is iterated. Iteration is forward-only
/// and single-pass; a second pass requires a new [`capture`]. Dropping the
/// stack returns its storage to the shared pool.
///
/// # Examples
///
/// ```
/// use rotolog::stack::{capture, Depth};
///
/// let mut stack = capture(0, Depth::First);
/// if let Some(frame) = stack.next() {
///     println!("called from {}", frame.function());
/// }
/// // storage returns to the pool when `stack` drops
/// ```
pub struct Stack {
    /// Pooled backing buffer; the captured addresses are `storage[..len]`.
    storage: Vec<usize>,
    len: usize,
    /// Next index into `storage` to resolve.
    cursor: usize,
    /// Resolved frames from the current address not yet yielded. One
    /// address expands to several frames when calls were inlined.
    pending: VecDeque<Frame>,
    /// Caller frames still to drop before yielding.
    skip: usize,
    /// Leading machinery frames already consumed.
    past_internal: bool,
    /// Frames this capture may still yield (1 for `Depth::First`).
    remaining: usize,
    finished: bool,
}

impl Stack {
    /// Number of raw return addresses captured.
    ///
    /// Does not change as the stack is iterated, and differs from the number
    /// of frames yielded: machinery and bootstrap frames are filtered out,
    /// while inlined calls expand one address into several frames.
    #[must_use]
    pub const fn address_count(&self) -> usize {
        self.len
    }
}

impl Iterator for Stack {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            if self.finished || self.remaining == 0 {
                return None;
            }

            if let Some(frame) = self.pending.pop_front() {
                if !self.past_internal {
                    if is_internal(frame.function()) {
                        continue;
                    }
                    self.past_internal = true;
                }
                if is_bootstrap(frame.function()) {
                    self.finished = true;
                    self.pending.clear();
                    return None;
                }
                if self.skip > 0 {
                    self.skip -= 1;
                    continue;
                }
                self.remaining -= 1;
                return Some(frame);
            }

            if self.cursor >= self.len {
                self.finished = true;
                return None;
            }
            let ip = self.storage[self.cursor];
            self.cursor += 1;
            resolve_into(ip, &mut self.pending);
        }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        STORAGE_POOL.release(mem::take(&mut self.storage));
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("address_count", &self.len)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

/// Captures a stack trace of the specified depth, skipping the provided
/// number of caller frames. `skip = 0` identifies the caller of `capture`.
///
/// The walk records raw addresses only; resolution happens lazily during
/// iteration. In [`Depth::Full`] mode a walk that fills its buffer
/// completely is treated as truncated and repeated with doubled storage
/// until the whole stack fits. Regrown buffers are retired instead of
/// returned to the pool, so rare deep captures do not inflate the pool's
/// steady-state allocation.
///
/// Capture never fails; under missing debug info it yields frames with
/// `<unknown>` names, and an exhausted walk yields fewer frames than asked.
#[must_use]
pub fn capture(skip: usize, depth: Depth) -> Stack {
    let mut storage = STORAGE_POOL.acquire();

    let walk_limit = match depth {
        Depth::First => skip + FIRST_WINDOW,
        Depth::Full => usize::MAX,
    };

    let mut len = walk(&mut storage, walk_limit);

    if depth == Depth::Full {
        // A completely filled buffer means the walk may have been cut off.
        while len == storage.capacity() {
            let doubled = storage.capacity() * 2;
            STORAGE_POOL.release(mem::replace(&mut storage, Vec::with_capacity(doubled)));
            len = walk(&mut storage, walk_limit);
        }
    }

    Stack {
        storage,
        len,
        cursor: 0,
        pending: VecDeque::new(),
        skip,
        past_internal: false,
        remaining: match depth {
            Depth::First => 1,
            Depth::Full => usize::MAX,
        },
        finished: false,
    }
}

/// Walks the current call stack, recording up to `limit` raw addresses
/// without exceeding the buffer's capacity. Returns the number recorded.
fn walk(storage: &mut Vec<usize>, limit: usize) -> usize {
    storage.clear();
    let cap = storage.capacity().min(limit);
    if cap == 0 {
        return 0;
    }
    backtrace::trace(|frame| {
        storage.push(frame.ip() as usize);
        storage.len() < cap
    });
    storage.len()
}

/// Resolves one raw address into frames, innermost inlined frame first.
fn resolve_into(ip: usize, frames: &mut VecDeque<Frame>) {
    backtrace::resolve(ip as *mut c_void, |symbol| {
        let function = symbol.name().map_or_else(
            || String::from("<unknown>"),
            |name| strip_symbol_hash(&name.to_string()).to_string(),
        );
        let file = symbol.filename().map_or_else(
            || String::from("<unknown>"),
            |path| path.display().to_string(),
        );
        frames.push_back(Frame::new(function, file, symbol.lineno().unwrap_or(0)));
    });
}

/// Removes the `::h0123456789abcdef` suffix rustc appends to symbols.
fn strip_symbol_hash(name: &str) -> &str {
    if let Some(idx) = name.rfind("::h") {
        let hash = &name[idx + 3..];
        if hash.len() == 16 && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return &name[..idx];
        }
    }
    name
}

fn is_internal(function: &str) -> bool {
    // Trait-impl frames demangle as `<Type as Trait>::method`.
    let function = function.strip_prefix('<').unwrap_or(function);
    INTERNAL_PREFIXES
        .iter()
        .any(|prefix| function.starts_with(prefix))
}

/// Frames outside the program's own logic: everything from the runtime's
/// entry scaffolding outward.
fn is_bootstrap(function: &str) -> bool {
    function == "main"
        || function == "_start"
        || function == "start_thread"
        || function.contains("__rust_begin_short_backtrace")
        || function.contains("__libc_start_main")
        || function.starts_with("std::rt::lang_start")
        || function.starts_with("std::thread::Builder::spawn_unchecked")
}

/// Free-list of stack-address buffers.
///
/// Buffers are checked out exclusively and returned exactly once, via
/// [`Stack`]'s `Drop`. Only buffers still at the standard capacity are
/// recycled; regrown ones are dropped.
struct StoragePool {
    buffers: Mutex<Vec<Vec<usize>>>,
    capacity: usize,
}

impl StoragePool {
    const fn new(capacity: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            capacity,
        }
    }

    fn acquire(&self) -> Vec<usize> {
        let recycled = self.buffers.lock().ok().and_then(|mut pool| pool.pop());
        recycled.unwrap_or_else(|| Vec::with_capacity(self.capacity))
    }

    fn release(&self, mut storage: Vec<usize>) {
        if storage.capacity() != self.capacity {
            return;
        }
        storage.clear();
        if let Ok(mut pool) = self.buffers.lock() {
            pool.push(storage);
        }
    }
}
