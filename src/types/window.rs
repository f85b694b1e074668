use std::fmt;

use serde::{Deserialize, Serialize};

use super::tab::{TabId, TabInfo};

/// Browser-assigned window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub i32);

impl WindowId {
    /// Reported by focus-change events when no browser window has focus.
    pub const NONE: WindowId = WindowId(-1);
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A window in the synchronized topology: tab ids in on-screen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub id: WindowId,
    pub tabs: Vec<TabId>,
    pub nickname: Option<String>,
}

impl Window {
    pub fn new(id: WindowId) -> Self {
        Self {
            id,
            tabs: Vec::new(),
            nickname: None,
        }
    }

    pub fn position_of(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.iter().position(|id| *id == tab_id)
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains(&tab_id)
    }
}

/// A window as returned by a populated window query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub tabs: Vec<TabInfo>,
}
