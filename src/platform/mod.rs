// Tabkeeper platform abstraction
// Resolves where settings live on Windows, macOS, and Linux.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory for Tabkeeper.
///
/// - **Linux**: `~/.config/tabkeeper` (or `$XDG_CONFIG_HOME/tabkeeper`)
/// - **macOS**: `~/Library/Application Support/Tabkeeper`
/// - **Windows**: `%APPDATA%/Tabkeeper`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}
