//! Selection Tracker for Tabkeeper.
//!
//! Two independent selection axes:
//! - UI selection: tabs the user multi-selected in the rendered list, kept as an
//!   explicit list so clearing touches only selected tabs.
//! - Browser selection: tabs highlighted in the native tab strip. The browser has
//!   no granular event for this, so it is reconciled from a polled snapshot.

use std::collections::HashMap;

use tracing::debug;

use crate::managers::activation_history::ActivationHistory;
use crate::managers::tab_registry::{TabRegistry, TabRegistryTrait};
use crate::managers::window_topology::{WindowTopology, WindowTopologyTrait};
use crate::types::input::{ClickModifiers, ClickSource};
use crate::types::tab::TabId;
use crate::types::window::WindowId;

/// Trait defining the selection tracker interface.
pub trait SelectionTrackerTrait {
    fn select(&mut self, registry: &mut TabRegistry, tab_id: TabId) -> bool;
    fn unselect(&mut self, registry: &mut TabRegistry, tab_id: TabId) -> bool;
    fn clear(&mut self, registry: &mut TabRegistry);
    fn select_range(&mut self, registry: &mut TabRegistry, anchor: TabId, target: TabId, order: &[TabId]);
    fn handle_tab_click(
        &mut self,
        registry: &mut TabRegistry,
        topology: &WindowTopology,
        tab_id: TabId,
        click: ClickModifiers,
        source: ClickSource,
    );
    fn forget_tab(&mut self, tab_id: TabId);
    fn reconcile_highlighted(
        &mut self,
        registry: &mut TabRegistry,
        history: &mut ActivationHistory,
        highlighted: &[TabId],
    ) -> usize;
}

/// UI multi-select state for open tabs.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    ui_selected: Vec<TabId>,
    /// Last tab selected by click; the fixed end of shift-click ranges.
    anchor: Option<TabId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// UI-selected tabs in selection order.
    pub fn selected(&self) -> &[TabId] {
        &self.ui_selected
    }

    pub fn selected_count(&self) -> usize {
        self.ui_selected.len()
    }

    pub fn is_selected(&self, tab_id: TabId) -> bool {
        self.ui_selected.contains(&tab_id)
    }

    pub fn anchor(&self) -> Option<TabId> {
        self.anchor
    }

    /// After the registry was rebuilt with fresh snapshots: drops selected ids
    /// that no longer exist and re-marks the rest.
    pub fn restore_flags(&mut self, registry: &mut TabRegistry) {
        self.ui_selected.retain(|id| registry.tab(*id).is_some());
        for tab_id in &self.ui_selected {
            if let Some(tab) = registry.tab_mut(*tab_id) {
                tab.is_ui_selected = true;
            }
        }
        if let Some(anchor) = self.anchor {
            if !self.ui_selected.contains(&anchor) {
                self.anchor = None;
            }
        }
    }

    /// Tab order a shift-click range is computed over.
    fn range_order(
        registry: &TabRegistry,
        topology: &WindowTopology,
        tab_id: TabId,
        source: ClickSource,
    ) -> Vec<TabId> {
        match source {
            ClickSource::WindowGrid => registry
                .window_of(tab_id)
                .and_then(|w| topology.window(w))
                .map(|w| w.tabs.clone())
                .unwrap_or_default(),
            ClickSource::AllWindows => topology.all_tab_ids(),
        }
    }
}

impl SelectionTrackerTrait for SelectionTracker {
    /// Marks a tab selected and makes it the range anchor.
    fn select(&mut self, registry: &mut TabRegistry, tab_id: TabId) -> bool {
        let Some(tab) = registry.tab_mut(tab_id) else {
            debug!(tab_id = %tab_id, "cannot select unknown tab");
            return false;
        };
        tab.is_ui_selected = true;
        self.anchor = Some(tab_id);
        if !self.ui_selected.contains(&tab_id) {
            self.ui_selected.push(tab_id);
        }
        true
    }

    fn unselect(&mut self, registry: &mut TabRegistry, tab_id: TabId) -> bool {
        if let Some(tab) = registry.tab_mut(tab_id) {
            tab.is_ui_selected = false;
        }
        if self.anchor == Some(tab_id) {
            self.anchor = None;
        }
        let before = self.ui_selected.len();
        self.ui_selected.retain(|id| *id != tab_id);
        before != self.ui_selected.len()
    }

    /// Unselects every UI-selected tab. Touches only the selected tabs.
    fn clear(&mut self, registry: &mut TabRegistry) {
        for tab_id in self.ui_selected.drain(..) {
            if let Some(tab) = registry.tab_mut(tab_id) {
                tab.is_ui_selected = false;
            }
        }
        self.anchor = None;
    }

    /// Replaces the selection with every tab between `anchor` and `target`
    /// (inclusive) in `order`. Falls back to selecting only `target` when either
    /// end is missing from `order`. The anchor stays where it was.
    fn select_range(&mut self, registry: &mut TabRegistry, anchor: TabId, target: TabId, order: &[TabId]) {
        let start = order.iter().position(|id| *id == anchor);
        let end = order.iter().position(|id| *id == target);

        self.clear(registry);
        let (Some(start), Some(end)) = (start, end) else {
            debug!(anchor = %anchor, target = %target, "range end missing, selecting target only");
            self.select(registry, target);
            return;
        };

        for tab_id in &order[start.min(end)..=start.max(end)] {
            self.select(registry, *tab_id);
        }
        self.anchor = Some(anchor);
    }

    /// Click semantics of the rendered tab list:
    /// - ctrl/cmd-click toggles the clicked tab;
    /// - shift-click with an anchor selects the range from anchor to clicked tab;
    /// - plain click makes the clicked tab the only selection, or clears the
    ///   selection when it already was the only selected tab.
    fn handle_tab_click(
        &mut self,
        registry: &mut TabRegistry,
        topology: &WindowTopology,
        tab_id: TabId,
        click: ClickModifiers,
        source: ClickSource,
    ) {
        let Some(is_selected) = registry.tab(tab_id).map(|t| t.is_ui_selected) else {
            debug!(tab_id = %tab_id, "click on unknown tab");
            return;
        };

        if click.is_toggle() {
            if is_selected {
                self.unselect(registry, tab_id);
            } else {
                self.select(registry, tab_id);
            }
            return;
        }

        if click.shift {
            if let Some(anchor) = self.anchor {
                let order = Self::range_order(registry, topology, tab_id, source);
                self.select_range(registry, anchor, tab_id, &order);
                return;
            }
        }

        let only_this = is_selected && self.ui_selected.len() == 1;
        self.clear(registry);
        if !only_this {
            self.select(registry, tab_id);
        }
    }

    /// Drops a closed tab from the selection. The snapshot itself is already gone.
    fn forget_tab(&mut self, tab_id: TabId) {
        if self.anchor == Some(tab_id) {
            self.anchor = None;
        }
        self.ui_selected.retain(|id| *id != tab_id);
    }

    /// Applies a polled snapshot of browser-highlighted tabs: unmarks every tab
    /// highlighted before, marks the new set, and rebuilds each window's
    /// `selected` list. Returns how many tabs ended up marked.
    fn reconcile_highlighted(
        &mut self,
        registry: &mut TabRegistry,
        history: &mut ActivationHistory,
        highlighted: &[TabId],
    ) -> usize {
        for tab_id in history.all_selected() {
            if let Some(tab) = registry.tab_mut(tab_id) {
                tab.is_browser_selected = false;
            }
        }

        let mut by_window: HashMap<WindowId, Vec<TabId>> = HashMap::new();
        let mut marked = 0;
        for tab_id in highlighted {
            let Some(window_id) = registry.window_of(*tab_id) else {
                debug!(tab_id = %tab_id, "highlighted tab not in registry");
                continue;
            };
            if let Some(tab) = registry.tab_mut(*tab_id) {
                tab.is_browser_selected = true;
                let list = by_window.entry(window_id).or_default();
                if !list.contains(tab_id) {
                    list.push(*tab_id);
                    marked += 1;
                }
            }
        }
        history.set_selected(by_window);
        marked
    }
}
