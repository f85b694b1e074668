use serde::{Deserialize, Serialize};

/// Top-level configuration for the tab synchronization core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    pub history: HistorySettings,
    pub polling: PollingSettings,
    pub placement: PlacementSettings,
    pub drag: DragSettings,
}

/// Per-window activation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistorySettings {
    pub recent_capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            recent_capacity: 20,
        }
    }
}

/// Timers for state the browser has no events for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingSettings {
    pub highlight_interval_ms: u64,
    pub badge_interval_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            highlight_interval_ms: 1000,
            badge_interval_ms: 1500,
        }
    }
}

/// New-tab placement next to the tab the user was looking at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacementSettings {
    pub enabled: bool,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Drag-and-drop reordering in the tab grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DragSettings {
    pub throttle_ms: u64,
    /// Fraction of a column past which a drop means "after" the item.
    pub insert_after_threshold: f64,
    /// Vertical tolerance when deciding two elements share a row.
    pub row_tolerance_px: f64,
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            throttle_ms: 16,
            insert_after_threshold: 0.65,
            row_tolerance_px: 5.0,
        }
    }
}
