use serde::{Deserialize, Serialize};

use super::tab::{TabChange, TabId, TabInfo};
use super::window::WindowId;

/// One notification from the browser's tab/window event stream.
///
/// Events may arrive duplicated, late, or out of order relative to each other;
/// handlers treat every lookup miss as a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrowserEvent {
    TabCreated {
        tab: TabInfo,
    },
    TabRemoved {
        tab_id: TabId,
        window_id: WindowId,
        #[serde(default)]
        is_window_closing: bool,
    },
    TabUpdated {
        tab_id: TabId,
        change: TabChange,
    },
    /// Move within one window.
    TabMoved {
        tab_id: TabId,
        window_id: WindowId,
        from_index: usize,
        to_index: usize,
    },
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
    },
    TabAttached {
        tab_id: TabId,
        new_window_id: WindowId,
        new_position: usize,
    },
    TabDetached {
        tab_id: TabId,
        old_window_id: WindowId,
        old_position: usize,
    },
    WindowCreated {
        window_id: WindowId,
    },
    WindowRemoved {
        window_id: WindowId,
    },
    WindowFocusChanged {
        window_id: WindowId,
    },
}

impl BrowserEvent {
    /// Short name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BrowserEvent::TabCreated { .. } => "tab_created",
            BrowserEvent::TabRemoved { .. } => "tab_removed",
            BrowserEvent::TabUpdated { .. } => "tab_updated",
            BrowserEvent::TabMoved { .. } => "tab_moved",
            BrowserEvent::TabActivated { .. } => "tab_activated",
            BrowserEvent::TabAttached { .. } => "tab_attached",
            BrowserEvent::TabDetached { .. } => "tab_detached",
            BrowserEvent::WindowCreated { .. } => "window_created",
            BrowserEvent::WindowRemoved { .. } => "window_removed",
            BrowserEvent::WindowFocusChanged { .. } => "window_focus_changed",
        }
    }
}
