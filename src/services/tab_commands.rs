//! Keyboard commands acting on the focused window's active tab.
//!
//! Commands are planned from the synchronized state and executed by the driver.
//! Moves relative to the previously active tab resolve that tab's live
//! position at execution time.

use std::fmt;

use crate::managers::activation_history::ActivationHistoryTrait;
use crate::managers::window_topology::WindowTopologyTrait;
use crate::state::SyncState;
use crate::types::errors::SyncError;
use crate::types::tab::TabId;
use crate::types::window::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabCommand {
    MoveToFirst,
    MoveToLast,
    /// Move the current tab onto the previously active tab's position.
    MoveCurrentToRecent,
    /// Pull the previously active tab onto the current tab's position.
    MoveRecentToCurrent,
    Duplicate,
}

/// What the driver does for a planned command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Move within the tab's own window.
    Move { tab_id: TabId, index: usize },
    /// Move `tab_id` to `anchor`'s live window and index.
    MoveToTab { tab_id: TabId, anchor: TabId },
    Duplicate { tab_id: TabId },
}

impl TabCommand {
    pub const ALL: [TabCommand; 5] = [
        TabCommand::MoveToFirst,
        TabCommand::MoveToLast,
        TabCommand::MoveCurrentToRecent,
        TabCommand::MoveRecentToCurrent,
        TabCommand::Duplicate,
    ];

    /// Command name as bound in the extension manifest.
    pub fn name(&self) -> &'static str {
        match self {
            TabCommand::MoveToFirst => "move_tab_to_first",
            TabCommand::MoveToLast => "move_tab_to_last",
            TabCommand::MoveCurrentToRecent => "move_current_tab_to_recent",
            TabCommand::MoveRecentToCurrent => "move_recent_tab_to_current",
            TabCommand::Duplicate => "duplicate_tab",
        }
    }

    pub fn from_name(name: &str) -> Option<TabCommand> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn plan(&self, state: &SyncState) -> Result<CommandAction, SyncError> {
        let window_id = state
            .current_window_id()
            .ok_or_else(|| SyncError::NothingToDo("no focused window".to_string()))?;
        let current = state
            .history()
            .active_tab(window_id)
            .ok_or_else(|| SyncError::NothingToDo(format!("no active tab in window {}", window_id)))?;

        match self {
            TabCommand::MoveToFirst => Ok(CommandAction::Move {
                tab_id: current,
                index: 0,
            }),
            TabCommand::MoveToLast => {
                let len = window_len(state, window_id)?;
                Ok(CommandAction::Move {
                    tab_id: current,
                    index: len.saturating_sub(1),
                })
            }
            TabCommand::MoveCurrentToRecent => Ok(CommandAction::MoveToTab {
                tab_id: current,
                anchor: recent_tab(state, window_id)?,
            }),
            TabCommand::MoveRecentToCurrent => Ok(CommandAction::MoveToTab {
                tab_id: recent_tab(state, window_id)?,
                anchor: current,
            }),
            TabCommand::Duplicate => Ok(CommandAction::Duplicate { tab_id: current }),
        }
    }
}

impl fmt::Display for TabCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn window_len(state: &SyncState, window_id: WindowId) -> Result<usize, SyncError> {
    state
        .topology()
        .window(window_id)
        .map(|w| w.tabs.len())
        .ok_or(SyncError::UnknownWindow(window_id))
}

fn recent_tab(state: &SyncState, window_id: WindowId) -> Result<TabId, SyncError> {
    state
        .history()
        .previous_active(window_id)
        .ok_or_else(|| SyncError::NothingToDo("no recent tab".to_string()))
}
