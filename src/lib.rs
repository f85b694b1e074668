//! Tabkeeper: open-tab synchronization core for a tab organizing browser extension.
//!
//! This library crate exposes all modules for use by the demo binary and integration tests.

pub mod app;
pub mod host;
pub mod managers;
pub mod platform;
pub mod services;
pub mod state;
pub mod types;
