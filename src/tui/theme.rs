//! TUI color semantics and style constants.
//!
//! Centralized so every screen highlights, dims and warns the same way.
//!
//! Color semantics:
//! - Reverse + bold: the focused row and the banner
//! - Bright cyan: "create something" entries
//! - Red: error icons in the toast line
//! - Dim: placeholders such as an empty project's "(no files)"

use super::style::{BRIGHT_CYAN, RED, Style};

// ============================================================================
// SEMANTIC STYLES
// ============================================================================

/// Unstyled text.
pub const STYLE_PLAIN: Style = Style::new();

/// Focused / highlighted list item.
pub const STYLE_SELECTED: Style = Style::new().reverse().bold();

/// Title bar / header.
pub const STYLE_BANNER: Style = Style::new().reverse().bold();

/// Interactive "new" entries.
pub const STYLE_CREATE: Style = BRIGHT_CYAN;

/// Error icon in the toast line.
pub const STYLE_ERROR: Style = RED;

/// De-emphasized metadata.
pub const STYLE_DIM: Style = Style::new().faint();

/// Style for a list row, highlighted when focused.
pub fn row(selected: bool) -> Style {
    if selected { STYLE_SELECTED } else { STYLE_PLAIN }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_row_is_reverse_bold() {
        assert!(row(true).attrs.reverse && row(true).attrs.bold);
        assert!(row(false).is_empty());
    }

    #[test]
    fn create_entry_keeps_row_highlight() {
        let style = row(true).with_foreground(&STYLE_CREATE);
        assert_eq!(style.sgr_enable(), "\x1b[96;1;7m");
    }

    #[test]
    fn error_style_is_red() {
        assert_eq!(STYLE_ERROR.fg.c4, Some(1));
    }
}
