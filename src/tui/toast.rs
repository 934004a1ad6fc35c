//! Transient notifications, shown one at a time on the last terminal row.
//!
//! A FIFO owned by the state that shows it. Only the head is rendered; it is
//! evicted once its display window has elapsed, measured from the moment it
//! first reached the head. The more toasts are waiting, the shorter each
//! one's window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::hash::content_key;

use super::compositor::Compositor;
use super::theme::{STYLE_ERROR, STYLE_PLAIN};

/// Queue length past which the head is evicted regardless of timing.
pub const MAX_TOASTS: usize = 60;

/// Display time for toasts that don't ask for another.
pub const DEFAULT_DISPLAY_TIME: Duration = Duration::from_millis(5000);

/// Floor the display window approaches as the queue grows.
const MIN_DISPLAY_TIME_MS: f64 = 1000.0;

/// Extra time a lone toast stays up.
const LONE_TOAST_BONUS: Duration = Duration::from_secs(60);

/// Time-elapsed ramp, empty to full.
const PROGRESS_RAMP: [char; 9] = ['⠁', '⠃', '⠇', '⡇', '⣇', '⣧', '⣷', '⣿', '⣿'];

// ============================================================================
// TYPES
// ============================================================================

/// Leading marker shown before a toast's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastIcon {
    Glyph(String),
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub base_display_time: Duration,
    pub created_at: Instant,
    pub icon: Option<ToastIcon>,
}

impl Toast {
    pub fn new(message: impl Into<String>, now: Instant) -> Self {
        Toast {
            message: message.into(),
            base_display_time: DEFAULT_DISPLAY_TIME,
            created_at: now,
            icon: None,
        }
    }

    /// A toast with the error icon.
    pub fn error(message: impl Into<String>, now: Instant) -> Self {
        Toast {
            icon: Some(ToastIcon::Error),
            ..Toast::new(message, now)
        }
    }

    pub fn with_icon(mut self, icon: ToastIcon) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_display_time(mut self, time: Duration) -> Self {
        self.base_display_time = time;
        self
    }
}

#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    /// When the current head started showing.
    reference: Option<Instant>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, toast: Toast) {
        self.toasts.push_back(toast);
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn head(&self) -> Option<&Toast> {
        self.toasts.front()
    }

    pub fn reference(&self) -> Option<Instant> {
        self.reference
    }

    pub fn clear(&mut self) {
        self.toasts.clear();
        self.reference = None;
    }

    /// Draw the head on the last row, then evict it if its time is up
    /// or the queue has overflowed.
    pub fn render(&mut self, frame: &mut Compositor) {
        let Some(head) = self.toasts.front() else {
            return;
        };

        let now = frame.now();
        let reference = *self.reference.get_or_insert(now);
        let count = self.toasts.len();
        let display = effective_display_time(head.base_display_time, count);
        let elapsed = now.saturating_duration_since(reference);
        let row = frame.size().rows.saturating_sub(1);

        let glyph = progress_glyph(elapsed.as_secs_f64() / display.as_secs_f64());
        frame.label(&format!("{} {} ", glyph, count), &STYLE_PLAIN, 0, row);

        let offset = count.to_string().len() as u16 + 3;
        let message_x = match &head.icon {
            Some(ToastIcon::Glyph(glyph)) => {
                frame.label(glyph, &STYLE_PLAIN, offset, row);
                offset + 2
            }
            Some(ToastIcon::Error) => {
                frame.label("X", &STYLE_ERROR, offset, row);
                offset + 2
            }
            None => offset,
        };
        frame.scrolling_label(
            &head.message,
            &content_key(&head.message),
            &STYLE_PLAIN,
            message_x,
            row,
            None,
        );

        if elapsed >= display || count > MAX_TOASTS {
            self.toasts.pop_front();
            self.reference = if self.toasts.is_empty() { None } else { Some(now) };
        }
    }
}

// ============================================================================
// TIMING
// ============================================================================

/// How long the head stays up given the queue length.
///
/// `lerp(base, 1000ms, 1 − 1/(len/2 + 1))`, plus a flat minute when the
/// toast is alone.
pub fn effective_display_time(base: Duration, queue_len: usize) -> Duration {
    let t = 1.0 - 1.0 / (queue_len as f64 / 2.0 + 1.0);
    let base_ms = base.as_secs_f64() * 1000.0;
    let millis = base_ms + (MIN_DISPLAY_TIME_MS - base_ms) * t;
    let window = Duration::from_secs_f64(millis.max(0.0) / 1000.0);

    if queue_len == 1 {
        window + LONE_TOAST_BONUS
    } else {
        window
    }
}

/// Ramp glyph for the fraction of display time used, clamped to `0..=1`.
pub fn progress_glyph(fraction: f64) -> char {
    let clamped = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    PROGRESS_RAMP[(clamped * (PROGRESS_RAMP.len() - 1) as f64).floor() as usize]
}

// ============================================================================
// TESTS
// ============================================================================
