//! Drag lifecycle for reordering tabs in the grid.
//!
//! Tracks one drag gesture at a time: the dragged tab and its source window,
//! the latest drop target, and the indicator the renderer draws. Pointer moves
//! arriving within the throttle interval of the last accepted one are dropped.
//! Ending a drag always clears the indicator, the dimmed tab, and the throttle,
//! whatever happens to the resulting move.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::services::drag_position::{DropPosition, GridInfo, Indicator};
use crate::types::errors::SyncError;
use crate::types::input::{Point, Rect};
use crate::types::settings::DragSettings;
use crate::types::tab::TabId;
use crate::types::window::WindowId;

/// The single move issued when a drag ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropCommand {
    pub tab_id: TabId,
    pub window_id: WindowId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy)]
struct DragSession {
    tab_id: TabId,
    source_window: WindowId,
    target: Option<usize>,
}

#[derive(Debug)]
pub struct DragManager {
    settings: DragSettings,
    session: Option<DragSession>,
    indicator: Option<Indicator>,
    last_move: Option<Instant>,
}

/// Resets drag state when dropped, on every exit path.
struct Cleanup<'a>(&'a mut DragManager);

impl Drop for Cleanup<'_> {
    fn drop(&mut self) {
        self.0.session = None;
        self.0.indicator = None;
        self.0.last_move = None;
    }
}

impl DragManager {
    pub fn new(settings: DragSettings) -> Self {
        Self {
            settings,
            session: None,
            indicator: None,
            last_move: None,
        }
    }

    fn throttle(&self) -> Duration {
        Duration::from_millis(self.settings.throttle_ms)
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn dragged_tab(&self) -> Option<TabId> {
        self.session.map(|s| s.tab_id)
    }

    /// Whether the renderer should draw `tab_id` dimmed.
    pub fn is_dimmed(&self, tab_id: TabId) -> bool {
        self.dragged_tab() == Some(tab_id)
    }

    pub fn indicator(&self) -> Option<Indicator> {
        self.indicator
    }

    pub fn target(&self) -> Option<usize> {
        self.session.and_then(|s| s.target)
    }

    /// Starts dragging `tab_id` out of `source_window`. A drag still in
    /// progress is abandoned first.
    pub fn on_drag_start(&mut self, tab_id: TabId, source_window: WindowId) {
        if self.session.is_some() {
            debug!("abandoning unfinished drag");
            self.cancel();
        }
        self.session = Some(DragSession {
            tab_id,
            source_window,
            target: None,
        });
        debug!(tab_id = %tab_id, window_id = %source_window, "drag started");
    }

    /// Recomputes the drop target for a pointer position.
    ///
    /// Returns `Ok(None)` when the move was throttled or the grid could not be
    /// measured; the previous target is kept in both cases.
    pub fn on_drag_move(
        &mut self,
        pointer: Point,
        container: Rect,
        items: &[Rect],
    ) -> Result<Option<DropPosition>, SyncError> {
        let Some(session) = self.session.as_mut() else {
            return Err(SyncError::NotDragging);
        };

        let now = Instant::now();
        if let Some(last) = self.last_move {
            if now.duration_since(last) < Duration::from_millis(self.settings.throttle_ms) {
                return Ok(None);
            }
        }
        self.last_move = Some(now);

        let Some(grid) = GridInfo::measure(container, items, self.settings.row_tolerance_px) else {
            return Ok(None);
        };
        let Some(position) =
            grid.drop_position(pointer, items.len(), self.settings.insert_after_threshold)
        else {
            return Ok(None);
        };

        session.target = Some(position.target_index);
        self.indicator = Some(position.indicator);
        Ok(Some(position))
    }

    /// Ends the drag and returns the move to issue, if a target was captured.
    pub fn on_drag_end(&mut self) -> Result<Option<DropCommand>, SyncError> {
        let guard = Cleanup(self);
        let session = guard.0.session.ok_or(SyncError::NotDragging)?;
        let Some(index) = session.target else {
            debug!(tab_id = %session.tab_id, "drag ended without a drop target");
            return Ok(None);
        };
        Ok(Some(DropCommand {
            tab_id: session.tab_id,
            window_id: session.source_window,
            index,
        }))
    }

    /// Abandons the drag without issuing a move.
    pub fn cancel(&mut self) {
        drop(Cleanup(self));
    }

    /// Time left before the next pointer move is accepted.
    pub fn throttle_remaining(&self) -> Duration {
        match self.last_move {
            Some(last) => self.throttle().saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }
}

impl Default for DragManager {
    fn default() -> Self {
        Self::new(DragSettings::default())
    }
}
