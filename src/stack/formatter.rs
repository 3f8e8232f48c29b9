//! Stack trace rendering.
//!
//! Frames render as `<function>`, newline, tab, `<file>:<line>`, with a
//! single newline between frames and none after the last. The one-shot
//! [`render`] helper drives a full capture through a [`Formatter`] backed by
//! a pooled text buffer; the returned `String` is a copy, never a view into
//! pooled memory.

use std::fmt::Write as _;
use std::sync::Mutex;

use super::{capture, Depth, Frame, Stack};

static RENDER_POOL: RenderPool = RenderPool::new();

/// Captures the current call stack at full depth and renders it.
///
/// `skip` is the number of caller frames to drop before recording;
/// `skip = 0` identifies the caller of `render`. Frames belonging to the
/// capture machinery and to the runtime's bootstrap scaffolding never
/// appear in the output.
///
/// # Examples
///
/// ```
/// let trace = rotolog::stack::render(0);
/// for block in trace.split('\n').collect::<Vec<_>>().chunks(2) {
///     // block[0] is a function name, block[1] is "\t<file>:<line>"
///     assert!(block.len() <= 2);
/// }
/// ```
#[must_use]
pub fn render(skip: usize) -> String {
    let mut stack = capture(skip, Depth::Full);

    let mut buffer = RENDER_POOL.acquire();
    let mut formatter = Formatter::new(&mut buffer);
    formatter.format_stack(&mut stack);

    let rendered = buffer.clone();
    RENDER_POOL.release(buffer);
    rendered
}

/// Formats a stack trace into a readable text representation.
pub struct Formatter<'a> {
    buffer: &'a mut String,
    /// Whether at least one frame has been written already.
    nonempty: bool,
}

impl<'a> Formatter<'a> {
    /// Builds a formatter writing into the given buffer.
    pub fn new(buffer: &'a mut String) -> Self {
        Self {
            buffer,
            nonempty: false,
        }
    }

    /// Formats all remaining frames of the provided stack.
    pub fn format_stack(&mut self, stack: &mut Stack) {
        while let Some(frame) = stack.next() {
            self.format_frame(&frame);
        }
    }

    /// Formats a single frame.
    pub fn format_frame(&mut self, frame: &Frame) {
        if self.nonempty {
            self.buffer.push('\n');
        }
        self.nonempty = true;
        self.buffer.push_str(frame.function());
        self.buffer.push('\n');
        self.buffer.push('\t');
        self.buffer.push_str(frame.file());
        self.buffer.push(':');
        let _ = write!(self.buffer, "{}", frame.line());
    }
}

impl std::fmt::Debug for Formatter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("nonempty", &self.nonempty)
            .finish_non_exhaustive()
    }
}

/// Free-list of render buffers. Released buffers are cleared but keep their
/// capacity, so repeated renders settle into zero-allocation reuse.
struct RenderPool {
    buffers: Mutex<Vec<String>>,
}

impl RenderPool {
    const fn new() -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
        }
    }

    fn acquire(&self) -> String {
        let recycled = self.buffers.lock().ok().and_then(|mut pool| pool.pop());
        recycled.unwrap_or_default()
    }

    fn release(&self, mut buffer: String) {
        buffer.clear();
        if let Ok(mut pool) = self.buffers.lock() {
            pool.push(buffer);
        }
    }
}
