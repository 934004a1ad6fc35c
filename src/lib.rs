//! prm: a keyboard-driven terminal browser for project sources.

pub mod error;
pub mod hash;
pub mod logging;
pub mod provider;
pub mod settings;
pub mod source;
pub mod tui;
pub mod types;
