use std::fmt;

use serde::{Deserialize, Serialize};

use super::window::WindowId;

/// Favicon shown when the browser reports none for a tab.
pub const FALLBACK_FAVICON: &str = "icons/tab-default.svg";

/// Browser-assigned tab identifier. Unique while the tab exists; the browser may
/// reuse it after the tab closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Loading status as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    #[default]
    Complete,
    Unloaded,
}

/// A tab as the browser reports it: the payload of creation/update events and of
/// window/tab queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowId,
    pub index: usize,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub highlighted: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub status: TabStatus,
}

impl TabInfo {
    /// Minimal tab record with an empty title/url, useful when only the
    /// positional fields matter.
    pub fn new(id: TabId, window_id: WindowId, index: usize) -> Self {
        Self {
            id,
            window_id,
            index,
            title: String::new(),
            url: String::new(),
            fav_icon_url: None,
            active: false,
            highlighted: false,
            pinned: false,
            status: TabStatus::Complete,
        }
    }
}

/// The synchronized view of one open tab.
///
/// Exactly one snapshot exists per tab id (owned by the registry). Browser-reported
/// fields are refreshed in place on update events; the `is_*` flags are owned by the
/// sync core and read by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub id: TabId,
    pub window_id: WindowId,
    pub index: usize,
    pub title: String,
    pub url: String,
    pub fav_icon_url: Option<String>,
    pub pinned: bool,
    pub status: TabStatus,
    /// Browser `active` field, as last reported.
    pub active: bool,
    /// Browser `highlighted` field, as last reported.
    pub highlighted: bool,
    pub is_active: bool,
    pub is_last_active: bool,
    pub is_browser_selected: bool,
    pub is_ui_selected: bool,
}

impl TabSnapshot {
    /// Favicon to render, falling back to the bundled default icon.
    pub fn favicon(&self) -> &str {
        match self.fav_icon_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => FALLBACK_FAVICON,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == TabStatus::Loading
    }
}

impl From<TabInfo> for TabSnapshot {
    fn from(info: TabInfo) -> Self {
        Self {
            id: info.id,
            window_id: info.window_id,
            index: info.index,
            title: info.title,
            url: info.url,
            fav_icon_url: info.fav_icon_url,
            pinned: info.pinned,
            status: info.status,
            active: info.active,
            highlighted: info.highlighted,
            is_active: info.active,
            is_last_active: false,
            is_browser_selected: info.highlighted,
            is_ui_selected: false,
        }
    }
}

/// Fields that changed in a tab update event. `None` means unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabChange {
    pub title: Option<String>,
    pub url: Option<String>,
    pub fav_icon_url: Option<String>,
    pub status: Option<TabStatus>,
    pub active: Option<bool>,
    pub highlighted: Option<bool>,
    pub pinned: Option<bool>,
}

impl TabChange {
    /// Applies the changed fields to a snapshot, leaving the rest untouched.
    ///
    /// `is_active` is not touched here: activation goes through the window's
    /// activation history so only one tab per window carries it.
    pub fn apply_to(&self, tab: &mut TabSnapshot) {
        if let Some(title) = &self.title {
            tab.title = title.clone();
        }
        if let Some(url) = &self.url {
            tab.url = url.clone();
        }
        if let Some(icon) = &self.fav_icon_url {
            tab.fav_icon_url = Some(icon.clone());
        }
        if let Some(status) = self.status {
            tab.status = status;
        }
        if let Some(active) = self.active {
            tab.active = active;
        }
        if let Some(highlighted) = self.highlighted {
            tab.highlighted = highlighted;
            tab.is_browser_selected = highlighted;
        }
        if let Some(pinned) = self.pinned {
            tab.pinned = pinned;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TabChange::default()
    }
}
