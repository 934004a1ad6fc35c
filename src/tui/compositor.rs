//! Frame compositor: accumulates escape-coded writes, flushes them atomically.
//!
//! A render pass is `reset → (clear | banner | label | ...)* → flush`. Nothing
//! reaches the terminal until [`Compositor::flush`], which performs a single
//! write and leaves the buffer empty.
//!
//! Marquee start timestamps are the only state that outlives a pass: ids
//! touched during a frame are kept at flush, all others are pruned.
//!
//! Text handed to the drawing primitives is sanitized: control characters
//! (ESC, BEL, newlines, ...) are dropped, so names read from disk cannot
//! inject escape sequences or break the row layout.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::time::{Duration, Instant};

use super::style::Style;

/// Separator between the end of a scrolling label and its wrapped start.
pub const DEFAULT_SEPARATOR: &str = " · ";

/// Floor on the per-character marquee step.
const MIN_MARQUEE_STEP: Duration = Duration::from_millis(10);

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl TermSize {
    pub const fn new(cols: u16, rows: u16) -> Self {
        TermSize { cols, rows }
    }
}

/// Accumulates one frame of output.
#[derive(Debug)]
pub struct Compositor {
    buf: String,
    size: TermSize,
    now: Instant,
    scroll: HashMap<String, Instant>,
    touched: HashSet<String>,
}

impl Compositor {
    pub fn new(size: TermSize, now: Instant) -> Self {
        Compositor {
            buf: String::new(),
            size,
            now,
            scroll: HashMap::new(),
            touched: HashSet::new(),
        }
    }

    pub fn size(&self) -> TermSize {
        self.size
    }

    pub fn set_size(&mut self, size: TermSize) {
        self.size = size;
    }

    /// Timestamp used by marquees and toasts for the current frame.
    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn set_now(&mut self, now: Instant) {
        self.now = now;
    }

    /// Pending bytes for the current frame.
    pub fn buffer(&self) -> &str {
        &self.buf
    }

    /// Start timestamp of a marquee, if it is being tracked.
    pub fn scroll_start(&self, id: &str) -> Option<Instant> {
        self.scroll.get(id).copied()
    }

    // ========================================================================
    // PRIMITIVES
    // ========================================================================

    /// Drop the accumulated frame. No terminal effect.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Cursor home, then clear to end of screen.
    pub fn clear(&mut self) {
        self.buf.push_str("\x1b[H\x1b[J");
    }

    /// Full-width line on the first row with `title` centered.
    pub fn banner(&mut self, title: &str, style: &Style) {
        let title = sanitize(title);
        let cols = usize::from(self.size.cols);
        let visible = title.chars().count();
        let left = ((cols + visible) / 2).max(visible) - visible;
        let right = cols.saturating_sub(left + visible);

        self.buf.push_str("\x1b[H");
        self.buf.push_str(&style.sgr_enable());
        self.buf.extend(std::iter::repeat_n(' ', left));
        self.buf.push_str(&title);
        self.buf.extend(std::iter::repeat_n(' ', right));
        self.buf.push_str(style.sgr_disable());
    }

    /// Styled text at 0-based cell `(x, y)`.
    pub fn label(&mut self, text: &str, style: &Style, x: u16, y: u16) {
        self.go_to(x, y);
        self.buf.push_str(&style.sgr_enable());
        self.buf.push_str(&sanitize(text));
        self.buf.push_str(style.sgr_disable());
    }

    /// Label horizontally centered within columns `span` (inclusive),
    /// defaulting to the whole row. Returns the column it starts at.
    pub fn centered_label(
        &mut self,
        text: &str,
        style: &Style,
        y: u16,
        span: Option<(u16, u16)>,
    ) -> u16 {
        let (start, end) = span.unwrap_or((0, self.size.cols.saturating_sub(1)));
        let center = f64::from(start) + (f64::from(end) - f64::from(start)) / 2.0;
        let x = (center - display_width(text) as f64 / 2.0).floor().max(0.0) as u16;
        self.label(text, style, x, y);
        x
    }

    /// Bare cursor move to 0-based cell `(x, y)`.
    pub fn go_to(&mut self, x: u16, y: u16) {
        self.buf
            .push_str(&format!("\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1));
    }

    /// Marquee keyed by `id`, with the default separator.
    pub fn scrolling_label(
        &mut self,
        text: &str,
        id: &str,
        style: &Style,
        x: u16,
        y: u16,
        max_width: Option<u16>,
    ) {
        self.scrolling_label_with_separator(text, id, style, x, y, max_width, DEFAULT_SEPARATOR);
    }

    /// Marquee keyed by `id`.
    ///
    /// Fits: drawn as-is and the id's start time snaps to now. Too wide: a
    /// `width`-character window scrolls through `text + separator` and wraps.
    #[allow(clippy::too_many_arguments)]
    pub fn scrolling_label_with_separator(
        &mut self,
        text: &str,
        id: &str,
        style: &Style,
        x: u16,
        y: u16,
        max_width: Option<u16>,
        separator: &str,
    ) {
        let text = sanitize(text);
        let separator = sanitize(separator);
        let now = self.now;
        self.touched.insert(id.to_string());
        let start = *self.scroll.entry(id.to_string()).or_insert(now);

        let right = match max_width {
            Some(width) => x.saturating_add(width).min(self.size.cols),
            None => self.size.cols,
        };
        let width = usize::from(right.saturating_sub(x));

        if width >= text.chars().count() {
            self.scroll.insert(id.to_string(), now);
            self.label(&text, style, x, y);
        } else {
            let elapsed = now.saturating_duration_since(start);
            let window = marquee_window(&text, &separator, width, elapsed);
            self.label(&window, style, x, y);
        }
    }

    // ========================================================================
    // FLUSH
    // ========================================================================

    /// Write the frame in one call and empty the buffer.
    ///
    /// Marquees not touched since the previous flush are forgotten.
    pub fn flush<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let touched = &self.touched;
        self.scroll.retain(|id, _| touched.contains(id));
        self.touched.clear();

        let result = out
            .write_all(self.buf.as_bytes())
            .and_then(|()| out.flush());
        self.buf.clear();
        result
    }
}

// ============================================================================
// MARQUEE MATH
// ============================================================================

/// Time per scrolled character: `300 − 30·ln(len + 1)` ms, floored at 10 ms.
pub fn marquee_step(label_len: usize) -> Duration {
    let millis = 300.0 - 30.0 * ((label_len + 1) as f64).ln();
    let micros = (millis * 1000.0).round();
    if micros <= MIN_MARQUEE_STEP.as_micros() as f64 {
        MIN_MARQUEE_STEP
    } else {
        Duration::from_micros(micros as u64)
    }
}

/// The `width`-character slice of a scrolling `label` after `elapsed`.
pub fn marquee_window(label: &str, separator: &str, width: usize, elapsed: Duration) -> String {
    let label_len = label.chars().count();
    let cycle = label_len + separator.chars().count();
    if cycle == 0 {
        return String::new();
    }

    let steps = elapsed.as_micros() / marquee_step(label_len).as_micros();
    let offset = (steps % cycle as u128) as usize;

    label
        .chars()
        .chain(separator.chars())
        .chain(label.chars().take(width))
        .skip(offset)
        .take(width)
        .collect()
}

/// `text` without control characters. Borrows when there is nothing to drop.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if text.chars().any(char::is_control) {
        Cow::Owned(text.chars().filter(|c| !c.is_control()).collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// Cells `text` occupies once drawn, i.e. its sanitized character count.
pub fn display_width(text: &str) -> usize {
    text.chars().filter(|c| !c.is_control()).count()
}

// ============================================================================
// TESTS
// ============================================================================
