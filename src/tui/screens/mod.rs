//! The concrete UI states and the navigation helpers they share.

pub mod main_menu;
pub mod source;

pub use main_menu::MainMenu;
pub use source::SourceScreen;

use std::ops::Range;

use super::key::{InputEvent, InputKind, KeyKind, parse_key};

/// Text payload produced by Enter (CR and LF both normalize to it).
const ENTER: &str = "\r";

/// What a raw event means to a list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Up,
    Down,
    Accept,
    Back,
    Quit,
    Other,
}

/// Map a decoded event to a list navigation action.
///
/// Ctrl+C quits from anywhere. Arrows and Backspace only count without
/// modifiers.
pub fn classify(event: &InputEvent) -> Nav {
    match event.kind {
        InputKind::Text if event.payload == ENTER => Nav::Accept,
        InputKind::Text => Nav::Other,
        InputKind::Key => {
            let key = parse_key(&event.payload);
            if key.is_ctrl_letter('c') {
                return Nav::Quit;
            }
            if !key.is_plain() {
                return Nav::Other;
            }
            match key.kind {
                KeyKind::Up => Nav::Up,
                KeyKind::Down => Nav::Down,
                KeyKind::Backspace => Nav::Back,
                _ => Nav::Other,
            }
        }
    }
}

/// Move a cursor one step up or down, wrapping at both ends.
pub fn step(selected: usize, len: usize, nav: Nav) -> usize {
    if len == 0 {
        return 0;
    }
    match nav {
        Nav::Up => (selected + len - 1) % len,
        Nav::Down => (selected + 1) % len,
        _ => selected.min(len - 1),
    }
}

/// Rows of a `len`-item list to draw in `visible` lines so that `selected`
/// is on screen.
pub fn viewport(selected: usize, len: usize, visible: usize) -> Range<usize> {
    if visible == 0 {
        return 0..0;
    }
    let first = selected.saturating_sub(visible - 1).min(len.saturating_sub(visible));
    first..len.min(first + visible)
}

// ============================================================================
// TESTS
// ============================================================================
