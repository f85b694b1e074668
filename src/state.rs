//! Synchronized open-tab state for Tabkeeper.
//!
//! `SyncState` is the single explicitly constructed container for the registry,
//! window topology, activation history, and selection. Browser events are applied
//! through [`SyncState::apply`], which mutates state in event-arrival order and
//! returns the side effects (I/O) the driver should perform. No I/O happens here.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::managers::activation_history::{ActivationHistory, ActivationHistoryTrait};
use crate::managers::placement::{PlacementHeuristic, PlacementPlan};
use crate::managers::selection_tracker::{SelectionTracker, SelectionTrackerTrait};
use crate::managers::tab_registry::{TabRegistry, TabRegistryTrait};
use crate::managers::window_topology::{AttachOutcome, DetachOutcome, WindowTopology, WindowTopologyTrait};
use crate::types::errors::TopologyError;
use crate::types::event::BrowserEvent;
use crate::types::input::{ClickModifiers, ClickSource};
use crate::types::settings::SyncSettings;
use crate::types::tab::{TabChange, TabId, TabInfo, TabSnapshot};
use crate::types::window::{Window, WindowId, WindowInfo};

/// Work the driver must do after an event was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Run the new-tab placement heuristic.
    Place(PlacementPlan),
    /// The mirror no longer matches the browser; reload everything.
    Resync { reason: String },
    /// Tab counts or focus changed; restart the badge alternation.
    BadgeChanged,
}

/// The synchronized open-tab state.
#[derive(Debug)]
pub struct SyncState {
    registry: TabRegistry,
    topology: WindowTopology,
    history: ActivationHistory,
    selection: SelectionTracker,
    placement_enabled: bool,
}

impl SyncState {
    pub fn new(settings: &SyncSettings) -> Self {
        Self {
            registry: TabRegistry::new(),
            topology: WindowTopology::new(),
            history: ActivationHistory::new(settings.history.recent_capacity),
            selection: SelectionTracker::new(),
            placement_enabled: settings.placement.enabled,
        }
    }

    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    pub fn topology(&self) -> &WindowTopology {
        &self.topology
    }

    pub fn history(&self) -> &ActivationHistory {
        &self.history
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn tab(&self, tab_id: TabId) -> Option<&TabSnapshot> {
        self.registry.tab(tab_id)
    }

    pub fn windows(&self) -> &[Window] {
        self.topology.windows()
    }

    /// Snapshots of one window's tabs in on-screen order.
    pub fn window_tabs(&self, window_id: WindowId) -> Vec<&TabSnapshot> {
        self.topology
            .window(window_id)
            .map(|w| w.tabs.iter().filter_map(|id| self.registry.tab(*id)).collect())
            .unwrap_or_default()
    }

    pub fn current_window_id(&self) -> Option<WindowId> {
        self.topology.current_window_id()
    }

    pub fn total_tabs(&self) -> usize {
        self.topology.total_tabs()
    }

    pub fn current_window_tab_count(&self) -> usize {
        self.topology.current_window().map(|w| w.tabs.len()).unwrap_or(0)
    }

    pub fn set_nickname(&mut self, window_id: WindowId, nickname: &str) -> bool {
        self.topology.set_nickname(window_id, nickname)
    }

    pub fn display_name(&self, window_id: WindowId) -> String {
        self.topology.display_name(window_id)
    }

    /// Replaces the whole state with a populated window query.
    ///
    /// Each window's history is seeded with its active tab; browser-highlighted
    /// tabs become each window's `selected` list; UI selection survives for tabs
    /// that still exist.
    pub fn load(&mut self, windows: Vec<WindowInfo>, current_window_id: Option<WindowId>) {
        self.topology.replace_all(&mut self.registry, windows, current_window_id);
        self.history.clear();
        self.selection.restore_flags(&mut self.registry);

        let mut highlighted: HashMap<WindowId, Vec<TabId>> = HashMap::new();
        let mut active: Vec<(WindowId, TabId)> = Vec::new();
        for window in self.topology.windows() {
            highlighted.entry(window.id).or_default();
            let mut found_active = false;
            for tab_id in &window.tabs {
                let Some(tab) = self.registry.tab(*tab_id) else {
                    continue;
                };
                if tab.highlighted {
                    highlighted.entry(window.id).or_default().push(*tab_id);
                }
                if tab.active && !found_active {
                    active.push((window.id, *tab_id));
                    found_active = true;
                }
            }
        }

        let ids: Vec<TabId> = self.registry.ids().collect();
        for tab_id in ids {
            if let Some(tab) = self.registry.tab_mut(tab_id) {
                tab.is_active = false;
                tab.is_last_active = false;
            }
        }
        for (window_id, tab_id) in active {
            self.history.seed_active(&mut self.registry, window_id, tab_id);
        }
        for window in self.topology.windows() {
            self.history.ensure_window(window.id);
        }
        self.history.set_selected(highlighted);
    }

    /// Seeds recency from an externally tracked list per window. Returns how
    /// many windows accepted at least one id.
    pub fn seed_recent(&mut self, lists: HashMap<WindowId, Vec<TabId>>) -> usize {
        let mut seeded = 0;
        for (window_id, tab_ids) in lists {
            if !self.topology.contains_window(window_id) {
                debug!(window_id = %window_id, "recent list for unknown window");
                continue;
            }
            if self.history.seed_recent(&self.registry, window_id, &tab_ids) > 0 {
                seeded += 1;
            }
        }
        seeded
    }

    /// Applies one browser event and returns the effects to perform.
    pub fn apply(&mut self, event: &BrowserEvent) -> Vec<Effect> {
        match event {
            BrowserEvent::TabCreated { tab } => self.on_tab_created(tab),
            BrowserEvent::TabRemoved { tab_id, window_id, .. } => self.on_tab_removed(*tab_id, *window_id),
            BrowserEvent::TabUpdated { tab_id, change } => self.on_tab_updated(*tab_id, change),
            BrowserEvent::TabMoved {
                tab_id,
                window_id,
                from_index,
                to_index,
            } => self.on_tab_moved(*tab_id, *window_id, *from_index, *to_index),
            BrowserEvent::TabActivated { tab_id, window_id } => {
                self.history.on_activated(&mut self.registry, *window_id, *tab_id);
                Vec::new()
            }
            BrowserEvent::TabAttached {
                tab_id,
                new_window_id,
                new_position,
            } => self.on_tab_attached(*tab_id, *new_window_id, *new_position),
            BrowserEvent::TabDetached {
                tab_id,
                old_window_id,
                ..
            } => self.on_tab_detached(*tab_id, *old_window_id),
            BrowserEvent::WindowCreated { window_id } => self.on_window_created(*window_id),
            BrowserEvent::WindowRemoved { window_id } => self.on_window_removed(*window_id),
            BrowserEvent::WindowFocusChanged { window_id } => self.on_focus_changed(*window_id),
        }
    }

    fn on_tab_created(&mut self, info: &TabInfo) -> Vec<Effect> {
        let window_id = info.window_id;
        let index = match self.topology.insert_tab(
            &mut self.registry,
            TabSnapshot::from(info.clone()),
            window_id,
            info.index,
        ) {
            Ok(index) => index,
            Err(TopologyError::DuplicateTab(id)) => {
                debug!(tab_id = %id, "duplicate creation event");
                return Vec::new();
            }
            Err(err) => return Self::miss(err, "tab_created"),
        };
        if let Some(tab) = self.registry.tab_mut(info.id) {
            // Set by the activation below, not by the creation payload.
            tab.is_active = false;
        }

        let mut effects = Vec::new();
        if self.placement_enabled {
            if let Some(plan) = PlacementHeuristic::plan(
                &self.history,
                &self.registry,
                info.id,
                window_id,
                index,
                info.active,
            ) {
                effects.push(Effect::Place(plan));
            }
        }
        if info.active {
            self.history.on_activated(&mut self.registry, window_id, info.id);
        }
        if info.highlighted {
            self.history.ensure_window(window_id).selected.push(info.id);
        }
        effects.push(Effect::BadgeChanged);
        effects
    }

    fn on_tab_removed(&mut self, tab_id: TabId, window_id: WindowId) -> Vec<Effect> {
        self.history.forget_tab(&mut self.registry, tab_id);
        self.selection.forget_tab(tab_id);
        if self
            .topology
            .remove_tab(&mut self.registry, tab_id, window_id)
            .is_none()
        {
            debug!(tab_id = %tab_id, window_id = %window_id, "removed tab was not tracked");
            return Vec::new();
        }
        vec![Effect::BadgeChanged]
    }

    fn on_tab_updated(&mut self, tab_id: TabId, change: &TabChange) -> Vec<Effect> {
        let Some(window_id) = self.registry.window_of(tab_id) else {
            debug!(tab_id = %tab_id, "update for unknown tab");
            return Vec::new();
        };
        if let Some(tab) = self.registry.tab_mut(tab_id) {
            change.apply_to(tab);
        }
        if change.active == Some(true) {
            self.history.on_activated(&mut self.registry, window_id, tab_id);
        }
        if let Some(highlighted) = change.highlighted {
            let selected = &mut self.history.ensure_window(window_id).selected;
            selected.retain(|id| *id != tab_id);
            if highlighted {
                selected.push(tab_id);
            }
        }
        Vec::new()
    }

    fn on_tab_moved(&mut self, tab_id: TabId, window_id: WindowId, from: usize, to: usize) -> Vec<Effect> {
        match self
            .topology
            .move_within_window(&mut self.registry, tab_id, window_id, from, to)
        {
            Ok(_) => Vec::new(),
            Err(err) => Self::miss(err, "tab_moved"),
        }
    }

    fn on_tab_detached(&mut self, tab_id: TabId, old_window_id: WindowId) -> Vec<Effect> {
        match self
            .topology
            .detach_tab(&mut self.registry, tab_id, old_window_id)
        {
            Ok(DetachOutcome::Parked) => {
                self.history.forget_tab_in_window(old_window_id, tab_id);
                Vec::new()
            }
            Ok(DetachOutcome::AlreadyMoved(now)) => {
                debug!(tab_id = %tab_id, old = %old_window_id, now = %now, "detach after attach, nothing to remove");
                Vec::new()
            }
            Err(err) => Self::miss(err, "tab_detached"),
        }
    }

    fn on_tab_attached(&mut self, tab_id: TabId, new_window_id: WindowId, position: usize) -> Vec<Effect> {
        match self
            .topology
            .attach_tab(&mut self.registry, tab_id, new_window_id, position)
        {
            Ok(outcome) => {
                if let AttachOutcome::FromWindow(old) = outcome {
                    self.history.forget_tab_in_window(old, tab_id);
                }
                if outcome != AttachOutcome::Repositioned {
                    let mut highlighted = false;
                    if let Some(tab) = self.registry.tab_mut(tab_id) {
                        tab.is_active = false;
                        tab.is_last_active = false;
                        highlighted = tab.is_browser_selected;
                    }
                    // Keep the highlight reachable by the next poll's unmarking.
                    if highlighted {
                        let selected = &mut self.history.ensure_window(new_window_id).selected;
                        if !selected.contains(&tab_id) {
                            selected.push(tab_id);
                        }
                    }
                }
                vec![Effect::BadgeChanged]
            }
            Err(TopologyError::UnknownTab(id)) => {
                warn!(tab_id = %id, window_id = %new_window_id, "attached tab was never seen");
                vec![Effect::Resync {
                    reason: format!("attach of unknown tab {}", id),
                }]
            }
            Err(err) => Self::miss(err, "tab_attached"),
        }
    }

    fn on_window_created(&mut self, window_id: WindowId) -> Vec<Effect> {
        if !self.topology.create_window(window_id) {
            debug!(window_id = %window_id, "window already tracked");
        }
        self.history.ensure_window(window_id);
        Vec::new()
    }

    fn on_window_removed(&mut self, window_id: WindowId) -> Vec<Effect> {
        self.history.purge_window(window_id);
        let Some(window) = self.topology.destroy_window(&mut self.registry, window_id) else {
            debug!(window_id = %window_id, "removed window was not tracked");
            return Vec::new();
        };
        for tab_id in &window.tabs {
            self.selection.forget_tab(*tab_id);
        }
        vec![Effect::BadgeChanged]
    }

    fn on_focus_changed(&mut self, window_id: WindowId) -> Vec<Effect> {
        if window_id == WindowId::NONE {
            return Vec::new();
        }
        if !self.topology.contains_window(window_id) {
            debug!(window_id = %window_id, "focus moved to untracked window");
            return Vec::new();
        }
        self.topology.set_current_window(Some(window_id));
        vec![Effect::BadgeChanged]
    }

    /// Logs a topology miss at the severity its kind calls for.
    fn miss(err: TopologyError, event: &str) -> Vec<Effect> {
        if err.is_structural() {
            warn!(event, error = %err, "structural desync");
            vec![Effect::Resync {
                reason: err.to_string(),
            }]
        } else {
            debug!(event, error = %err, "lookup miss");
            Vec::new()
        }
    }

    /// Click on a rendered tab card.
    pub fn handle_tab_click(&mut self, tab_id: TabId, click: ClickModifiers, source: ClickSource) {
        self.selection
            .handle_tab_click(&mut self.registry, &self.topology, tab_id, click, source);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear(&mut self.registry);
    }

    /// Applies a polled set of browser-highlighted tabs.
    pub fn reconcile_highlighted(&mut self, highlighted: &[TabId]) -> usize {
        self.selection
            .reconcile_highlighted(&mut self.registry, &mut self.history, highlighted)
    }

    /// Describes every broken invariant. Empty when the state is consistent.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut seen: HashSet<TabId> = HashSet::new();

        for window in self.topology.windows() {
            for (index, tab_id) in window.tabs.iter().enumerate() {
                if !seen.insert(*tab_id) {
                    violations.push(format!("tab {} appears in more than one place", tab_id));
                }
                match self.registry.get(*tab_id) {
                    None => violations.push(format!("tab {} in window {} is not registered", tab_id, window.id)),
                    Some(entry) => {
                        if entry.window_id != window.id || entry.tab.window_id != window.id {
                            violations.push(format!("tab {} registered to another window than {}", tab_id, window.id));
                        }
                        if entry.tab.index != index {
                            violations.push(format!("tab {} index {} but position {}", tab_id, entry.tab.index, index));
                        }
                    }
                }
            }

            if let Some(history) = self.history.history(window.id) {
                let capacity = self.history.capacity();
                if history.recent.len() > capacity {
                    violations.push(format!("window {} recent exceeds {}", window.id, capacity));
                }
                let unique: HashSet<_> = history.recent.iter().collect();
                if unique.len() != history.recent.len() {
                    violations.push(format!("window {} recent has duplicates", window.id));
                }
                if let Some(active) = history.active {
                    if self.registry.tab(active).map(|t| t.is_active) != Some(true) {
                        violations.push(format!("active tab {} not flagged active", active));
                    }
                }
            }
            let flagged = window
                .tabs
                .iter()
                .filter(|id| self.registry.tab(**id).map(|t| t.is_active).unwrap_or(false))
                .count();
            if flagged > 1 {
                violations.push(format!("window {} has {} tabs flagged active", window.id, flagged));
            }
        }

        for entry in self.registry.entries() {
            if !seen.contains(&entry.tab.id) {
                violations.push(format!("registered tab {} is in no window", entry.tab.id));
            }
            if entry.tab.is_ui_selected != self.selection.is_selected(entry.tab.id) {
                violations.push(format!("tab {} ui flag disagrees with selection", entry.tab.id));
            }
        }
        for tab_id in self.selection.selected() {
            if self.registry.tab(*tab_id).is_none() && !self.registry.is_in_transit(*tab_id) {
                violations.push(format!("selected tab {} no longer exists", tab_id));
            }
        }
        violations
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(&SyncSettings::default())
    }
}
