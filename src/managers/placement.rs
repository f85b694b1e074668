//! New-tab placement for Tabkeeper.
//!
//! When a tab is created, decide which tab it should open next to:
//! - an inactive new tab goes right after the window's active tab;
//! - a new tab that took focus goes right after the tab that was active before.
//!
//! Planning reads only cached state. The anchor's index is then looked up live
//! (the cached one may be stale by the time the plan runs) and fed to
//! [`PlacementPlan::target_index`]. Any miss leaves the tab where the browser put it.

use tracing::debug;

use crate::managers::activation_history::{ActivationHistory, ActivationHistoryTrait};
use crate::managers::tab_registry::{TabRegistry, TabRegistryTrait};
use crate::types::tab::TabId;
use crate::types::window::WindowId;

/// Which tab a new tab is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    /// The window's active tab (new tab opened in the background).
    Active,
    /// The tab active before the new one took focus.
    PreviouslyActive,
}

/// A pending placement decision for one new tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPlan {
    pub tab_id: TabId,
    pub window_id: WindowId,
    /// Index of the new tab when it was created.
    pub tab_index: usize,
    pub anchor: TabId,
    pub anchor_kind: AnchorKind,
}

impl PlacementPlan {
    /// Index to move the new tab to, given the anchor's live index, or `None`
    /// when the tab already sits right after its anchor.
    ///
    /// A tab left of its anchor moves onto the anchor's slot: removing it first
    /// shifts the anchor one to the left.
    pub fn target_index(&self, anchor_index: usize) -> Option<usize> {
        if self.tab_index == anchor_index + 1 {
            return None;
        }
        let target = if self.tab_index < anchor_index {
            anchor_index
        } else {
            anchor_index + 1
        };
        (target != self.tab_index).then_some(target)
    }
}

/// Plans new-tab placement from the activation history.
pub struct PlacementHeuristic;

impl PlacementHeuristic {
    /// Decides the anchor for a tab that was just created at `tab_index`.
    /// `active` is the new tab's own active flag from the creation event.
    pub fn plan(
        history: &ActivationHistory,
        registry: &TabRegistry,
        tab_id: TabId,
        window_id: WindowId,
        tab_index: usize,
        active: bool,
    ) -> Option<PlacementPlan> {
        let (anchor, anchor_kind) = if active {
            let anchor = history.previous_active_for(window_id, tab_id);
            (anchor, AnchorKind::PreviouslyActive)
        } else {
            let anchor = history.active_tab(window_id).filter(|id| *id != tab_id);
            (anchor, AnchorKind::Active)
        };

        let Some(anchor) = anchor else {
            debug!(tab_id = %tab_id, window_id = %window_id, kind = ?anchor_kind, "no anchor for new tab");
            return None;
        };
        if registry.window_of(anchor) != Some(window_id) {
            debug!(tab_id = %tab_id, anchor = %anchor, "anchor no longer in the new tab's window");
            return None;
        }

        Some(PlacementPlan {
            tab_id,
            window_id,
            tab_index,
            anchor,
            anchor_kind,
        })
    }
}
