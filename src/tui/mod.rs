//! Terminal UI engine.
//!
//! Organized along FP/Unix boundaries:
//! - `key`, `style`, `theme`: pure decoding and styling
//! - `compositor`, `toast`: frame building, no I/O until flush
//! - `state`, `screens`: the state machine and its concrete states
//! - `run`: effects (terminal lifecycle, producer threads, main loop)

pub mod compositor;
pub mod key;
pub mod run;
pub mod screens;
pub mod state;
pub mod style;
pub mod theme;
pub mod toast;
