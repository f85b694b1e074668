//! Tab Registry for Tabkeeper.
//!
//! Exclusive owner of every open tab's snapshot, keyed by tab id, together with the
//! id of the window whose sequence holds it. Every other component refers to tabs by
//! id and reads or mutates flags through this registry, so a flag written once is
//! seen by every reader.

use std::collections::HashMap;

use tracing::debug;

use crate::types::tab::{TabId, TabSnapshot};
use crate::types::window::{Window, WindowId};

/// A registry slot: the tab's snapshot and its owning window.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub tab: TabSnapshot,
    pub window_id: WindowId,
}

/// Trait defining the tab registry interface.
pub trait TabRegistryTrait {
    fn get(&self, tab_id: TabId) -> Option<&RegistryEntry>;
    fn tab(&self, tab_id: TabId) -> Option<&TabSnapshot>;
    fn tab_mut(&mut self, tab_id: TabId) -> Option<&mut TabSnapshot>;
    fn window_of(&self, tab_id: TabId) -> Option<WindowId>;
    fn put(&mut self, tab: TabSnapshot, window_id: WindowId) -> Option<TabSnapshot>;
    fn remove(&mut self, tab_id: TabId) -> Option<TabSnapshot>;
    fn rebind(&mut self, tab_id: TabId, window_id: WindowId) -> bool;
    fn park(&mut self, tab_id: TabId) -> bool;
    fn unpark(&mut self, tab_id: TabId) -> Option<TabSnapshot>;
    fn is_in_transit(&self, tab_id: TabId) -> bool;
    fn rebuild_from_topology(&mut self, windows: &[Window], snapshots: HashMap<TabId, TabSnapshot>);
    fn sync_positions(&mut self, window: &Window);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
}

/// In-memory registry of open tabs.
#[derive(Debug, Default)]
pub struct TabRegistry {
    entries: HashMap<TabId, RegistryEntry>,
    /// Tabs detached from one window and not yet attached to another.
    /// Invisible to `get`; never part of any window sequence.
    in_transit: HashMap<TabId, TabSnapshot>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every registered tab, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = TabId> + '_ {
        self.entries.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn in_transit_count(&self) -> usize {
        self.in_transit.len()
    }
}

impl TabRegistryTrait for TabRegistry {
    fn get(&self, tab_id: TabId) -> Option<&RegistryEntry> {
        self.entries.get(&tab_id)
    }

    fn tab(&self, tab_id: TabId) -> Option<&TabSnapshot> {
        self.entries.get(&tab_id).map(|e| &e.tab)
    }

    fn tab_mut(&mut self, tab_id: TabId) -> Option<&mut TabSnapshot> {
        self.entries.get_mut(&tab_id).map(|e| &mut e.tab)
    }

    fn window_of(&self, tab_id: TabId) -> Option<WindowId> {
        self.entries.get(&tab_id).map(|e| e.window_id)
    }

    /// Inserts or replaces the slot for `tab.id`, binding it to `window_id`.
    /// Returns the replaced snapshot, if any.
    fn put(&mut self, mut tab: TabSnapshot, window_id: WindowId) -> Option<TabSnapshot> {
        tab.window_id = window_id;
        self.in_transit.remove(&tab.id);
        self.entries
            .insert(tab.id, RegistryEntry { tab, window_id })
            .map(|e| e.tab)
    }

    /// Removes a tab whether it is registered or in transit.
    fn remove(&mut self, tab_id: TabId) -> Option<TabSnapshot> {
        if let Some(entry) = self.entries.remove(&tab_id) {
            return Some(entry.tab);
        }
        self.in_transit.remove(&tab_id)
    }

    /// Points an existing slot at another window, keeping the snapshot itself.
    fn rebind(&mut self, tab_id: TabId, window_id: WindowId) -> bool {
        match self.entries.get_mut(&tab_id) {
            Some(entry) => {
                entry.window_id = window_id;
                entry.tab.window_id = window_id;
                true
            }
            None => false,
        }
    }

    /// Moves a registered tab into the in-transit area.
    fn park(&mut self, tab_id: TabId) -> bool {
        match self.entries.remove(&tab_id) {
            Some(entry) => {
                self.in_transit.insert(tab_id, entry.tab);
                true
            }
            None => false,
        }
    }

    fn unpark(&mut self, tab_id: TabId) -> Option<TabSnapshot> {
        self.in_transit.remove(&tab_id)
    }

    fn is_in_transit(&self, tab_id: TabId) -> bool {
        self.in_transit.contains_key(&tab_id)
    }

    /// Clears the registry and re-inserts every tab of every window in order,
    /// taking snapshots from `snapshots`. Ids with no snapshot are skipped.
    fn rebuild_from_topology(
        &mut self,
        windows: &[Window],
        mut snapshots: HashMap<TabId, TabSnapshot>,
    ) {
        self.entries.clear();
        self.in_transit.clear();
        for window in windows {
            for (index, tab_id) in window.tabs.iter().enumerate() {
                match snapshots.remove(tab_id) {
                    Some(mut tab) => {
                        tab.index = index;
                        self.put(tab, window.id);
                    }
                    None => debug!(tab_id = %tab_id, window_id = %window.id, "no snapshot for tab during rebuild"),
                }
            }
        }
    }

    /// Refreshes `index` and `window_id` of every tab in `window` from its
    /// position in the sequence.
    fn sync_positions(&mut self, window: &Window) {
        for (index, tab_id) in window.tabs.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(tab_id) {
                entry.window_id = window.id;
                entry.tab.window_id = window.id;
                entry.tab.index = index;
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
