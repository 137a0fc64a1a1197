//! Taskline TUI Library
//!
//! Terminal client for a Taskline server: sign-in and first-run setup, the PIN
//! lock screen, and account settings, on top of `taskline-session`.

pub mod app;
pub mod ui;

pub use app::App;
