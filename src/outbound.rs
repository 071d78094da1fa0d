//! Outbound pipeline: line framing, length-aware splitting and the
//! flood-protection queue.
//!
//! The queue is sans-IO: the caller decides when a tick happens and drains
//! framed lines with [`OutboundQueue::drain_ready`].

use std::collections::VecDeque;

use tracing::trace;

/// Payload ceiling used before our identity is known.
pub const FALLBACK_LINE_LENGTH: usize = 450;

/// Join `args` (command first) into a wire line terminated with `\r\n`.
///
/// The final argument is prefixed with `:` when it contains whitespace,
/// starts with `:` or is empty. An argument is cut at its first `\r` or `\n`
/// so one call never yields more than one wire line.
pub fn frame<S: AsRef<str>>(args: &[S]) -> String {
    let mut line = String::new();
    let last = args.len().saturating_sub(1);

    for (i, arg) in args.iter().enumerate() {
        let arg = until_terminator(arg.as_ref());
        if i > 0 {
            line.push(' ');
        }
        if i == last && i > 0 && needs_colon(arg) {
            line.push(':');
        }
        line.push_str(arg);
    }

    line.push_str("\r\n");
    line
}

fn until_terminator(arg: &str) -> &str {
    match arg.find(is_terminator) {
        Some(end) => {
            trace!(arg, "cutting argument at embedded line terminator");
            &arg[..end]
        }
        None => arg,
    }
}

#[inline]
fn is_terminator(c: char) -> bool {
    c == '\r' || c == '\n'
}

fn needs_colon(arg: &str) -> bool {
    arg.is_empty() || arg.starts_with(':') || arg.chars().any(char::is_whitespace)
}

#[inline]
fn is_space_at(text: &str, idx: usize) -> bool {
    text.as_bytes().get(idx).is_some_and(u8::is_ascii_whitespace)
}

/// Split `text` into segments of at most `max` bytes.
///
/// Each cut happens at the whitespace at `max`, or the last whitespace before
/// it, and that whitespace is dropped. Without whitespace in the window the
/// text is hard-cut at the nearest char boundary and nothing is dropped.
/// A `max` of zero falls back to [`FALLBACK_LINE_LENGTH`].
pub fn split_long_lines(text: &str, max: usize) -> Vec<String> {
    let max = if max == 0 { FALLBACK_LINE_LENGTH } else { max };
    let mut segments = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        if rest.len() <= max {
            segments.push(rest.to_string());
            break;
        }

        let (cut, skip) = if is_space_at(rest, max) {
            (max, 1)
        } else {
            match (1..max).rev().find(|&i| is_space_at(rest, i)) {
                Some(i) => (i, 1),
                None => (hard_cut(rest, max), 0),
            }
        };

        segments.push(rest[..cut].to_string());
        rest = &rest[cut + skip..];
    }

    segments
}

/// Largest char boundary at or below `max`, but at least one char.
fn hard_cut(text: &str, max: usize) -> usize {
    let mut cut = max;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    if cut == 0 {
        cut = text.chars().next().map_or(text.len(), char::len_utf8);
    }
    cut
}

/// Lines of `text` split on `\r\n`, `\r` or `\n`, empty ones skipped.
pub fn text_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_terminator).filter(|line| !line.is_empty())
}

/// FIFO of framed lines, released one per tick when flood protection is on.
#[derive(Clone, Debug, Default)]
pub struct OutboundQueue {
    flood_protection: bool,
    pending: VecDeque<String>,
    ready: VecDeque<String>,
}

impl OutboundQueue {
    pub fn new(flood_protection: bool) -> Self {
        OutboundQueue {
            flood_protection,
            ..Default::default()
        }
    }

    pub fn flood_protection(&self) -> bool {
        self.flood_protection
    }

    /// Queue a framed line through the normal path.
    pub fn enqueue(&mut self, line: String) {
        if self.flood_protection {
            self.pending.push_back(line);
        } else {
            self.ready.push_back(line);
        }
    }

    /// Bypass the flood queue.
    pub fn send_immediate(&mut self, line: String) {
        self.ready.push_back(line);
    }

    /// Release one pending line. Returns whether anything was released.
    pub fn tick(&mut self) -> bool {
        match self.pending.pop_front() {
            Some(line) => {
                trace!(remaining = self.pending.len(), "releasing queued line");
                self.ready.push_back(line);
                true
            }
            None => false,
        }
    }

    /// Release every pending line at once.
    pub fn flush_pending(&mut self) {
        self.ready.extend(self.pending.drain(..));
    }

    /// Take every line ready for the wire.
    pub fn drain_ready(&mut self) -> Vec<String> {
        self.ready.drain(..).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.ready.clear();
    }
}
