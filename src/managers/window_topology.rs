//! Window Topology for Tabkeeper.
//!
//! Ordered windows, each an ordered sequence of tab ids mirroring the browser's tab
//! strip. Every mutation goes through the registry in the same call so that a tab
//! id is in a window sequence exactly when the registry binds it to that window.

use std::collections::HashMap;

use tracing::debug;

use crate::managers::tab_registry::{TabRegistry, TabRegistryTrait};
use crate::types::errors::TopologyError;
use crate::types::tab::{TabId, TabSnapshot};
use crate::types::window::{Window, WindowId, WindowInfo};

/// Result of processing a detach notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachOutcome {
    /// Removed from the source window and parked until its attach arrives.
    Parked,
    /// The attach was already processed; the tab lives in this window now.
    AlreadyMoved(WindowId),
}

/// Result of processing an attach notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Taken from the in-transit area (detach arrived first).
    FromTransit,
    /// Taken directly from its old window (attach arrived before detach).
    FromWindow(WindowId),
    /// Already in the destination window; only its position changed.
    Repositioned,
}

/// Trait defining the window topology interface.
pub trait WindowTopologyTrait {
    fn create_window(&mut self, window_id: WindowId) -> bool;
    fn destroy_window(&mut self, registry: &mut TabRegistry, window_id: WindowId) -> Option<Window>;
    fn insert_tab(
        &mut self,
        registry: &mut TabRegistry,
        tab: TabSnapshot,
        window_id: WindowId,
        index: usize,
    ) -> Result<usize, TopologyError>;
    fn remove_tab(
        &mut self,
        registry: &mut TabRegistry,
        tab_id: TabId,
        window_id: WindowId,
    ) -> Option<TabSnapshot>;
    fn move_within_window(
        &mut self,
        registry: &mut TabRegistry,
        tab_id: TabId,
        window_id: WindowId,
        from_index: usize,
        to_index: usize,
    ) -> Result<usize, TopologyError>;
    fn detach_tab(
        &mut self,
        registry: &mut TabRegistry,
        tab_id: TabId,
        old_window_id: WindowId,
    ) -> Result<DetachOutcome, TopologyError>;
    fn attach_tab(
        &mut self,
        registry: &mut TabRegistry,
        tab_id: TabId,
        new_window_id: WindowId,
        index: usize,
    ) -> Result<AttachOutcome, TopologyError>;
    fn move_across_windows(
        &mut self,
        registry: &mut TabRegistry,
        tab_id: TabId,
        from_window_id: WindowId,
        to_window_id: WindowId,
        to_index: usize,
    ) -> Result<usize, TopologyError>;
    fn window(&self, window_id: WindowId) -> Option<&Window>;
    fn windows(&self) -> &[Window];
    fn total_tabs(&self) -> usize;
}

/// In-memory mirror of the browser's windows and tab order.
#[derive(Debug, Default)]
pub struct WindowTopology {
    windows: Vec<Window>,
    current_window_id: Option<WindowId>,
    /// Detaches still owed for attaches that took a tab straight from its old
    /// window, as `(tab, old window)`.
    pending_detaches: Vec<(TabId, WindowId)>,
}

impl WindowTopology {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_window_index(&self, window_id: WindowId) -> Option<usize> {
        self.windows.iter().position(|w| w.id == window_id)
    }

    fn take_pending_detach(&mut self, tab_id: TabId, window_id: WindowId) -> bool {
        match self
            .pending_detaches
            .iter()
            .position(|pending| *pending == (tab_id, window_id))
        {
            Some(pos) => {
                self.pending_detaches.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn pending_detach_count(&self) -> usize {
        self.pending_detaches.len()
    }

    fn window_mut(&mut self, window_id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id == window_id)
    }

    /// Splices `tab_id` out of `window_id`'s sequence and refreshes positions of
    /// the remaining tabs. Returns whether it was present.
    fn splice_out(&mut self, registry: &mut TabRegistry, tab_id: TabId, window_id: WindowId) -> bool {
        let Some(window) = self.window_mut(window_id) else {
            return false;
        };
        let Some(pos) = window.position_of(tab_id) else {
            return false;
        };
        window.tabs.remove(pos);
        registry.sync_positions(window);
        true
    }

    /// Replaces the entire topology with a fresh populated window query.
    ///
    /// Nicknames of windows that still exist are kept. Every snapshot is replaced
    /// and the registry rebuilt from the new order.
    pub fn replace_all(
        &mut self,
        registry: &mut TabRegistry,
        windows: Vec<WindowInfo>,
        current_window_id: Option<WindowId>,
    ) {
        let mut nicknames: HashMap<WindowId, String> = self
            .windows
            .drain(..)
            .filter_map(|w| w.nickname.map(|n| (w.id, n)))
            .collect();

        let mut snapshots = HashMap::new();
        for info in windows {
            let mut window = Window::new(info.id);
            window.nickname = nicknames.remove(&info.id);
            let mut tabs = info.tabs;
            tabs.sort_by_key(|t| t.index);
            for tab in tabs {
                if snapshots.contains_key(&tab.id) {
                    debug!(tab_id = %tab.id, "tab reported twice by window query");
                    continue;
                }
                window.tabs.push(tab.id);
                snapshots.insert(tab.id, TabSnapshot::from(tab));
            }
            self.windows.push(window);
        }

        registry.rebuild_from_topology(&self.windows, snapshots);
        self.pending_detaches.clear();
        self.current_window_id = current_window_id;
    }

    pub fn current_window_id(&self) -> Option<WindowId> {
        self.current_window_id
    }

    pub fn set_current_window(&mut self, window_id: Option<WindowId>) {
        self.current_window_id = window_id;
    }

    pub fn current_window(&self) -> Option<&Window> {
        self.current_window_id.and_then(|id| self.window(id))
    }

    pub fn contains_window(&self, window_id: WindowId) -> bool {
        self.find_window_index(window_id).is_some()
    }

    /// Every tab id across all windows, in topology order.
    pub fn all_tab_ids(&self) -> Vec<TabId> {
        self.windows.iter().flat_map(|w| w.tabs.iter().copied()).collect()
    }

    /// Sets or clears a window's nickname. Blank names clear it.
    pub fn set_nickname(&mut self, window_id: WindowId, nickname: &str) -> bool {
        let Some(window) = self.window_mut(window_id) else {
            return false;
        };
        let trimmed = nickname.trim();
        window.nickname = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        true
    }

    pub fn nickname(&self, window_id: WindowId) -> Option<&str> {
        self.window(window_id).and_then(|w| w.nickname.as_deref())
    }

    /// Name shown in the window header: nickname, else "Current Window" for the
    /// focused window, else "Window <id>".
    pub fn display_name(&self, window_id: WindowId) -> String {
        if let Some(nickname) = self.nickname(window_id) {
            return nickname.to_string();
        }
        if self.current_window_id == Some(window_id) {
            "Current Window".to_string()
        } else {
            format!("Window {}", window_id)
        }
    }
}

impl WindowTopologyTrait for WindowTopology {
    /// Appends an empty window. Returns false if it already exists.
    fn create_window(&mut self, window_id: WindowId) -> bool {
        if self.contains_window(window_id) {
            return false;
        }
        self.windows.push(Window::new(window_id));
        true
    }

    /// Removes a window and unregisters every tab still in it.
    fn destroy_window(&mut self, registry: &mut TabRegistry, window_id: WindowId) -> Option<Window> {
        let idx = self.find_window_index(window_id)?;
        let window = self.windows.remove(idx);
        for tab_id in &window.tabs {
            registry.remove(*tab_id);
        }
        self.pending_detaches
            .retain(|(id, _)| !window.tabs.contains(id));
        if self.current_window_id == Some(window_id) {
            self.current_window_id = None;
        }
        Some(window)
    }

    /// Inserts a new tab at `index`, clamped to `[0, len]`. Returns the actual index.
    fn insert_tab(
        &mut self,
        registry: &mut TabRegistry,
        tab: TabSnapshot,
        window_id: WindowId,
        index: usize,
    ) -> Result<usize, TopologyError> {
        if registry.get(tab.id).is_some() {
            return Err(TopologyError::DuplicateTab(tab.id));
        }
        let window = self
            .window_mut(window_id)
            .ok_or(TopologyError::UnknownWindow(window_id))?;

        let index = index.min(window.tabs.len());
        window.tabs.insert(index, tab.id);
        registry.put(tab, window_id);
        registry.sync_positions(window);
        Ok(index)
    }

    /// Removes a closed tab from its window and the registry.
    ///
    /// Falls back to the registry's window when the event names another one, and
    /// is a no-op when the tab is already gone.
    fn remove_tab(
        &mut self,
        registry: &mut TabRegistry,
        tab_id: TabId,
        window_id: WindowId,
    ) -> Option<TabSnapshot> {
        if !self.splice_out(registry, tab_id, window_id) {
            match registry.window_of(tab_id) {
                Some(actual) if actual != window_id => {
                    debug!(tab_id = %tab_id, claimed = %window_id, actual = %actual, "removing tab from its registered window");
                    self.splice_out(registry, tab_id, actual);
                }
                _ => {}
            }
        }
        self.pending_detaches.retain(|(id, _)| *id != tab_id);
        registry.remove(tab_id)
    }

    /// Moves a tab within one window. The tab is located by id; `from_index` is
    /// only advisory. Returns the clamped destination index.
    fn move_within_window(
        &mut self,
        registry: &mut TabRegistry,
        tab_id: TabId,
        window_id: WindowId,
        from_index: usize,
        to_index: usize,
    ) -> Result<usize, TopologyError> {
        let window = self
            .window_mut(window_id)
            .ok_or(TopologyError::UnknownWindow(window_id))?;
        let pos = window
            .position_of(tab_id)
            .ok_or(TopologyError::TabNotInWindow(tab_id, window_id))?;
        if pos != from_index {
            debug!(tab_id = %tab_id, expected = from_index, actual = pos, "move source index differs from mirror");
        }

        let id = window.tabs.remove(pos);
        let to_index = to_index.min(window.tabs.len());
        window.tabs.insert(to_index, id);
        registry.sync_positions(window);
        Ok(to_index)
    }

    /// Source half of a cross-window move.
    ///
    /// A detach already accounted for by an earlier attach removes nothing, even
    /// when the tab has since come back to `old_window_id`.
    fn detach_tab(
        &mut self,
        registry: &mut TabRegistry,
        tab_id: TabId,
        old_window_id: WindowId,
    ) -> Result<DetachOutcome, TopologyError> {
        if self.take_pending_detach(tab_id, old_window_id) {
            return match registry.window_of(tab_id) {
                Some(current) => Ok(DetachOutcome::AlreadyMoved(current)),
                None if registry.is_in_transit(tab_id) => Ok(DetachOutcome::Parked),
                None => Err(TopologyError::UnknownTab(tab_id)),
            };
        }
        let current = registry
            .window_of(tab_id)
            .ok_or(TopologyError::UnknownTab(tab_id))?;
        if current != old_window_id {
            // Attach was delivered first. Drop any stale copy in the old window.
            self.splice_out(registry, tab_id, old_window_id);
            return Ok(DetachOutcome::AlreadyMoved(current));
        }
        self.splice_out(registry, tab_id, old_window_id);
        registry.park(tab_id);
        Ok(DetachOutcome::Parked)
    }

    /// Destination half of a cross-window move.
    fn attach_tab(
        &mut self,
        registry: &mut TabRegistry,
        tab_id: TabId,
        new_window_id: WindowId,
        index: usize,
    ) -> Result<AttachOutcome, TopologyError> {
        if !self.contains_window(new_window_id) {
            return Err(TopologyError::UnknownWindow(new_window_id));
        }

        let (tab, outcome) = if let Some(tab) = registry.unpark(tab_id) {
            (tab, AttachOutcome::FromTransit)
        } else {
            let old = registry
                .window_of(tab_id)
                .ok_or(TopologyError::UnknownTab(tab_id))?;
            if old == new_window_id {
                let from = self
                    .window(old)
                    .and_then(|w| w.position_of(tab_id))
                    .ok_or(TopologyError::TabNotInWindow(tab_id, old))?;
                self.move_within_window(registry, tab_id, old, from, index)?;
                return Ok(AttachOutcome::Repositioned);
            }
            self.splice_out(registry, tab_id, old);
            let tab = registry
                .remove(tab_id)
                .ok_or(TopologyError::UnknownTab(tab_id))?;
            self.pending_detaches.push((tab_id, old));
            (tab, AttachOutcome::FromWindow(old))
        };

        let window = self
            .window_mut(new_window_id)
            .ok_or(TopologyError::UnknownWindow(new_window_id))?;
        let index = index.min(window.tabs.len());
        window.tabs.insert(index, tab_id);
        registry.put(tab, new_window_id);
        registry.sync_positions(window);
        Ok(outcome)
    }

    /// Moves a tab from one window to another in a single step.
    fn move_across_windows(
        &mut self,
        registry: &mut TabRegistry,
        tab_id: TabId,
        from_window_id: WindowId,
        to_window_id: WindowId,
        to_index: usize,
    ) -> Result<usize, TopologyError> {
        if !self.contains_window(to_window_id) {
            return Err(TopologyError::UnknownWindow(to_window_id));
        }
        match self.detach_tab(registry, tab_id, from_window_id) {
            Ok(_) => {}
            Err(TopologyError::UnknownTab(_)) if registry.is_in_transit(tab_id) => {}
            Err(err) => return Err(err),
        }
        self.attach_tab(registry, tab_id, to_window_id, to_index)?;
        registry
            .tab(tab_id)
            .map(|t| t.index)
            .ok_or(TopologyError::UnknownTab(tab_id))
    }

    fn window(&self, window_id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == window_id)
    }

    fn windows(&self) -> &[Window] {
        &self.windows
    }

    fn total_tabs(&self) -> usize {
        self.windows.iter().map(|w| w.tabs.len()).sum()
    }
}
