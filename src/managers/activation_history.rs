//! Activation History for Tabkeeper.
//!
//! Per-window record of the active tab, the most recently activated tabs (most
//! recent first, bounded, no duplicates), and the browser-highlighted tabs.
//! Flags on the snapshots (`is_active`, `is_last_active`) are written through the
//! registry as activations arrive.

use std::collections::HashMap;

use tracing::debug;

use crate::managers::tab_registry::{TabRegistry, TabRegistryTrait};
use crate::types::tab::TabId;
use crate::types::window::WindowId;

/// Default number of recently activated tabs kept per window.
pub const DEFAULT_RECENT_CAPACITY: usize = 20;

/// History of one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowHistory {
    pub active: Option<TabId>,
    pub recent: Vec<TabId>,
    pub selected: Vec<TabId>,
}

/// What an activation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub window_id: WindowId,
    pub tab_id: TabId,
    /// `recent[0]` before this activation was applied.
    pub previous: Option<TabId>,
}

/// Trait defining the activation history interface.
pub trait ActivationHistoryTrait {
    fn on_activated(
        &mut self,
        registry: &mut TabRegistry,
        window_id: WindowId,
        tab_id: TabId,
    ) -> Option<Activation>;
    fn seed_active(&mut self, registry: &mut TabRegistry, window_id: WindowId, tab_id: TabId);
    fn seed_recent(&mut self, registry: &TabRegistry, window_id: WindowId, tab_ids: &[TabId]) -> usize;
    fn forget_tab(&mut self, registry: &mut TabRegistry, tab_id: TabId);
    fn purge_window(&mut self, window_id: WindowId) -> Option<WindowHistory>;
    fn history(&self, window_id: WindowId) -> Option<&WindowHistory>;
    fn active_tab(&self, window_id: WindowId) -> Option<TabId>;
    fn previous_active(&self, window_id: WindowId) -> Option<TabId>;
}

/// Activation history for every known window.
#[derive(Debug)]
pub struct ActivationHistory {
    windows: HashMap<WindowId, WindowHistory>,
    capacity: usize,
}

impl ActivationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every window's history.
    pub fn clear(&mut self) {
        self.windows.clear();
    }

    /// History for `window_id`, created empty if missing.
    pub fn ensure_window(&mut self, window_id: WindowId) -> &mut WindowHistory {
        self.windows.entry(window_id).or_default()
    }

    /// Tab a newly created tab should be anchored to when it took focus itself:
    /// the most recent entry that is neither the new tab nor the window's
    /// current active tab (unless the new tab already is the active one).
    ///
    /// Gives the same answer whether or not the new tab's own activation has
    /// been applied yet.
    pub fn previous_active_for(&self, window_id: WindowId, new_tab: TabId) -> Option<TabId> {
        let history = self.windows.get(&window_id)?;
        let skip_active = history.active.filter(|id| *id != new_tab);
        history
            .recent
            .iter()
            .copied()
            .find(|id| *id != new_tab && Some(*id) != skip_active)
    }

    /// Replaces each window's browser-highlighted list. Windows without an entry
    /// in `selected` get an empty list.
    pub fn set_selected(&mut self, mut selected: HashMap<WindowId, Vec<TabId>>) {
        for (window_id, history) in self.windows.iter_mut() {
            history.selected = selected.remove(window_id).unwrap_or_default();
        }
        for (window_id, tabs) in selected {
            self.ensure_window(window_id).selected = tabs;
        }
    }

    /// Every tab currently listed as browser-highlighted, across windows.
    pub fn all_selected(&self) -> Vec<TabId> {
        self.windows
            .values()
            .flat_map(|h| h.selected.iter().copied())
            .collect()
    }

    /// Drops a tab from one window's lists only, leaving its flags alone. Used when
    /// the tab moves to another window.
    pub fn forget_tab_in_window(&mut self, window_id: WindowId, tab_id: TabId) {
        if let Some(history) = self.windows.get_mut(&window_id) {
            if history.active == Some(tab_id) {
                history.active = None;
            }
            history.recent.retain(|id| *id != tab_id);
            history.selected.retain(|id| *id != tab_id);
        }
    }

    pub fn window_ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.windows.keys().copied()
    }
}

impl Default for ActivationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_CAPACITY)
    }
}

impl ActivationHistoryTrait for ActivationHistory {
    /// Records an activation and updates the flags of the tabs involved.
    ///
    /// Returns `None` without changes when the tab is not registered yet (its
    /// creation event may still be queued).
    fn on_activated(
        &mut self,
        registry: &mut TabRegistry,
        window_id: WindowId,
        tab_id: TabId,
    ) -> Option<Activation> {
        let Some(owner) = registry.window_of(tab_id) else {
            debug!(tab_id = %tab_id, window_id = %window_id, "activated tab not in registry");
            return None;
        };
        if owner != window_id {
            debug!(tab_id = %tab_id, claimed = %window_id, actual = %owner, "activation names another window");
        }

        let capacity = self.capacity;
        let history = self.windows.entry(owner).or_default();
        let previous = history.recent.first().copied();
        let previous_previous = history.recent.get(1).copied();

        if previous != Some(tab_id) {
            if let Some(prev) = previous.and_then(|id| registry.tab_mut(id)) {
                prev.is_active = false;
                prev.is_last_active = true;
            }
            if let Some(prev_prev) = previous_previous.and_then(|id| registry.tab_mut(id)) {
                prev_prev.is_last_active = false;
            }
        }
        if let Some(stale) = history.active.filter(|id| Some(*id) != previous && *id != tab_id) {
            if let Some(tab) = registry.tab_mut(stale) {
                tab.is_active = false;
            }
        }

        history.recent.retain(|id| *id != tab_id);
        history.recent.insert(0, tab_id);
        history.recent.truncate(capacity);
        history.active = Some(tab_id);

        if let Some(tab) = registry.tab_mut(tab_id) {
            tab.is_active = true;
            tab.is_last_active = false;
        }

        Some(Activation {
            window_id: owner,
            tab_id,
            previous,
        })
    }

    /// Resets a window's history to a single active tab, as after a full reload.
    fn seed_active(&mut self, registry: &mut TabRegistry, window_id: WindowId, tab_id: TabId) {
        let history = self.windows.entry(window_id).or_default();
        history.active = Some(tab_id);
        history.recent = vec![tab_id];
        if let Some(tab) = registry.tab_mut(tab_id) {
            tab.is_active = true;
            tab.is_last_active = false;
        }
    }

    /// Seeds `recent` from an externally tracked id list (most recent first).
    ///
    /// Ids not registered in this window are skipped. The current active tab stays
    /// at the front. Returns how many ids were accepted.
    fn seed_recent(&mut self, registry: &TabRegistry, window_id: WindowId, tab_ids: &[TabId]) -> usize {
        let capacity = self.capacity;
        let history = self.windows.entry(window_id).or_default();

        let mut recent: Vec<TabId> = Vec::with_capacity(capacity);
        if let Some(active) = history.active {
            recent.push(active);
        }
        let mut accepted = 0;
        for tab_id in tab_ids {
            if registry.window_of(*tab_id) != Some(window_id) {
                debug!(tab_id = %tab_id, window_id = %window_id, "skipping unknown tab in recent list");
                continue;
            }
            accepted += 1;
            if !recent.contains(tab_id) {
                recent.push(*tab_id);
            }
        }
        recent.truncate(capacity);
        if accepted > 0 {
            history.recent = recent;
        }
        accepted
    }

    /// Drops a tab from every window's active, recent, and selected lists.
    fn forget_tab(&mut self, registry: &mut TabRegistry, tab_id: TabId) {
        for history in self.windows.values_mut() {
            if history.active == Some(tab_id) {
                history.active = None;
            }
            history.recent.retain(|id| *id != tab_id);
            history.selected.retain(|id| *id != tab_id);
        }
        if let Some(tab) = registry.tab_mut(tab_id) {
            tab.is_active = false;
            tab.is_last_active = false;
            tab.is_browser_selected = false;
        }
    }

    fn purge_window(&mut self, window_id: WindowId) -> Option<WindowHistory> {
        self.windows.remove(&window_id)
    }

    fn history(&self, window_id: WindowId) -> Option<&WindowHistory> {
        self.windows.get(&window_id)
    }

    fn active_tab(&self, window_id: WindowId) -> Option<TabId> {
        self.windows.get(&window_id).and_then(|h| h.active)
    }

    /// The tab that was active before the current one (`recent[1]`).
    fn previous_active(&self, window_id: WindowId) -> Option<TabId> {
        let history = self.windows.get(&window_id)?;
        history
            .recent
            .iter()
            .copied()
            .find(|id| Some(*id) != history.active)
    }
}
