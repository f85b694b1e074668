//! Unit tests for keyboard command naming and planning.

use rstest::rstest;
use tabkeeper::services::tab_commands::{CommandAction, TabCommand};
use tabkeeper::state::SyncState;
use tabkeeper::types::errors::SyncError;
use tabkeeper::types::event::BrowserEvent;
use tabkeeper::types::tab::{TabId, TabInfo};
use tabkeeper::types::window::{WindowId, WindowInfo};

const W1: WindowId = WindowId(1);
const W2: WindowId = WindowId(2);

fn window(id: WindowId, tabs: &[i32], active: i32, focused: bool) -> WindowInfo {
    WindowInfo {
        id,
        focused,
        tabs: tabs
            .iter()
            .enumerate()
            .map(|(index, tab)| {
                let mut info = TabInfo::new(TabId(*tab), id, index);
                info.active = *tab == active;
                info
            })
            .collect(),
    }
}

/// W1 = [1, 2, 3] focused, 3 active after 1; W2 = [4].
fn state() -> SyncState {
    let mut state = SyncState::default();
    state.load(
        vec![window(W1, &[1, 2, 3], 1, true), window(W2, &[4], 4, false)],
        Some(W1),
    );
    state.apply(&BrowserEvent::TabActivated { tab_id: TabId(3), window_id: W1 });
    state
}

#[rstest]
#[case::first(TabCommand::MoveToFirst, "move_tab_to_first")]
#[case::last(TabCommand::MoveToLast, "move_tab_to_last")]
#[case::current_to_recent(TabCommand::MoveCurrentToRecent, "move_current_tab_to_recent")]
#[case::recent_to_current(TabCommand::MoveRecentToCurrent, "move_recent_tab_to_current")]
#[case::duplicate(TabCommand::Duplicate, "duplicate_tab")]
fn test_command_names(#[case] command: TabCommand, #[case] name: &str) {
    assert_eq!(command.name(), name);
    assert_eq!(command.to_string(), name);
    assert_eq!(TabCommand::from_name(name), Some(command));
}

#[test]
fn test_unknown_command_name() {
    assert_eq!(TabCommand::from_name("close_everything"), None);
}

#[rstest]
#[case::first(TabCommand::MoveToFirst, CommandAction::Move { tab_id: TabId(3), index: 0 })]
#[case::last(TabCommand::MoveToLast, CommandAction::Move { tab_id: TabId(3), index: 2 })]
#[case::current_to_recent(
    TabCommand::MoveCurrentToRecent,
    CommandAction::MoveToTab { tab_id: TabId(3), anchor: TabId(1) }
)]
#[case::recent_to_current(
    TabCommand::MoveRecentToCurrent,
    CommandAction::MoveToTab { tab_id: TabId(1), anchor: TabId(3) }
)]
#[case::duplicate(TabCommand::Duplicate, CommandAction::Duplicate { tab_id: TabId(3) })]
fn test_plan_uses_focused_window(#[case] command: TabCommand, #[case] expected: CommandAction) {
    assert_eq!(command.plan(&state()).unwrap(), expected);
}

#[test]
fn test_plan_follows_focus() {
    let mut state = state();
    state.apply(&BrowserEvent::WindowFocusChanged { window_id: W2 });
    assert_eq!(
        TabCommand::Duplicate.plan(&state).unwrap(),
        CommandAction::Duplicate { tab_id: TabId(4) }
    );
    // W2 never had another active tab.
    let err = TabCommand::MoveRecentToCurrent.plan(&state).unwrap_err();
    assert!(matches!(err, SyncError::NothingToDo(_)));
}

#[test]
fn test_plan_without_focused_window() {
    let state = SyncState::default();
    for command in TabCommand::ALL {
        assert!(matches!(command.plan(&state), Err(SyncError::NothingToDo(_))));
    }
}
