use std::fmt;

use super::tab::TabId;
use super::window::WindowId;

// === HostError ===

/// Errors surfaced by the browser host's own error channel.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// The host has no tab with the given ID (closed or never existed).
    TabNotFound(TabId),
    /// The host has no window with the given ID.
    WindowNotFound(WindowId),
    /// The host rejected the call (invalid index, restricted tab, ...).
    Rejected(String),
    /// The background context did not answer a message.
    Disconnected(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::TabNotFound(id) => write!(f, "No tab with id: {}", id),
            HostError::WindowNotFound(id) => write!(f, "No window with id: {}", id),
            HostError::Rejected(msg) => write!(f, "Browser rejected call: {}", msg),
            HostError::Disconnected(msg) => write!(f, "Background context disconnected: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

// === TopologyError ===

/// Lookup misses reported by window topology operations.
///
/// These are expected under event races; callers log them and continue.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// The window is not present in the topology.
    UnknownWindow(WindowId),
    /// The tab is neither registered nor in transit.
    UnknownTab(TabId),
    /// The tab is registered but not in the given window's sequence.
    TabNotInWindow(TabId, WindowId),
    /// A tab with this ID is already placed in a window.
    DuplicateTab(TabId),
}

impl TopologyError {
    /// Whether this miss means the topology no longer mirrors the browser and a
    /// full reload is the recommended recovery.
    pub fn is_structural(&self) -> bool {
        matches!(self, TopologyError::UnknownWindow(_))
    }
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::UnknownWindow(id) => write!(f, "Window not in topology: {}", id),
            TopologyError::UnknownTab(id) => write!(f, "Tab not in registry: {}", id),
            TopologyError::TabNotInWindow(tab, window) => {
                write!(f, "Tab {} not found in window {}", tab, window)
            }
            TopologyError::DuplicateTab(id) => write!(f, "Tab already placed: {}", id),
        }
    }
}

impl std::error::Error for TopologyError {}

// === SyncError ===

/// Errors returned by driver-level operations invoked by UI consumers.
///
/// Browser event handlers never return these; they log and no-op instead.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Tab is not present in the synchronized registry.
    UnknownTab(TabId),
    /// Window is not present in the synchronized topology.
    UnknownWindow(WindowId),
    /// A host call failed.
    Host(HostError),
    /// A drag operation was requested while no drag is in progress.
    NotDragging,
    /// The command has nothing to act on (no focused window, no previous tab, ...).
    NothingToDo(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::UnknownTab(id) => write!(f, "Unknown tab: {}", id),
            SyncError::UnknownWindow(id) => write!(f, "Unknown window: {}", id),
            SyncError::Host(err) => write!(f, "Host call failed: {}", err),
            SyncError::NotDragging => write!(f, "No drag in progress"),
            SyncError::NothingToDo(msg) => write!(f, "Nothing to do: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostError> for SyncError {
    fn from(err: HostError) -> Self {
        SyncError::Host(err)
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
