//! Best-effort access to the caller's stack.
//!
//! Stack introspection depends on the build: release binaries without debug
//! symbols, or platforms without unwinding support, cannot name their frames.
//! In those cases [`get_frame`] reports
//! [`InjectError::CapabilityUnavailable`] instead of guessing.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

use crate::error::{InjectError, InjectResult};

const CAPABILITY: &str = "stack frame introspection";
const MARKER: &str = "compat::get_frame";

/// One resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Levels above the caller of [`get_frame`]; `0` is the caller itself
    pub depth: usize,
    /// Demangled symbol name, hash suffix included when present
    pub symbol: String,
    /// `file:line:column`, when debug info is available
    pub location: Option<String>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {}", self.symbol, location),
            None => f.write_str(&self.symbol),
        }
    }
}

/// Returns the frame `depth` levels above the caller.
///
/// # Errors
///
/// [`InjectError::CapabilityUnavailable`] when no backtrace can be captured,
/// when frames are unsymbolized, or when the stack is shallower than
/// `depth`.
///
/// # Examples
///
/// ```rust
/// use scope_inject::compat::get_frame;
///
/// match get_frame(0) {
///     Ok(frame) => println!("called from {}", frame),
///     Err(err) => println!("{}", err),
/// }
/// ```
#[inline(never)]
pub fn get_frame(depth: usize) -> InjectResult<Frame> {
    let backtrace = Backtrace::force_capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return Err(InjectError::CapabilityUnavailable(CAPABILITY));
    }
    frame_from_rendered(&backtrace.to_string(), depth)
}

/// Picks the frame `depth` levels above the `get_frame` frame in a rendered
/// backtrace.
fn frame_from_rendered(rendered: &str, depth: usize) -> InjectResult<Frame> {
    let frames = parse_frames(rendered);
    let own = frames
        .iter()
        .position(|(symbol, _)| symbol.contains(MARKER))
        .ok_or(InjectError::CapabilityUnavailable(CAPABILITY))?;

    frames
        .into_iter()
        .nth(own + 1 + depth)
        .map(|(symbol, location)| Frame {
            depth,
            symbol,
            location,
        })
        .ok_or(InjectError::CapabilityUnavailable(CAPABILITY))
}

fn parse_frames(rendered: &str) -> Vec<(String, Option<String>)> {
    let mut frames: Vec<(String, Option<String>)> = Vec::new();
    for line in rendered.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(last) = frames.last_mut() {
                last.1 = Some(location.trim().to_string());
            }
            continue;
        }
        if let Some((index, symbol)) = line.split_once(": ") {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                frames.push((symbol.trim().to_string(), None));
            }
        }
    }
    frames
}
