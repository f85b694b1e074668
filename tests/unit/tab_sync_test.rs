//! Driver tests against the in-memory browser: reloads, placement moves,
//! out-of-order cross-window events, timers, drag, and commands.

use std::sync::Arc;
use std::time::Duration;

use tabkeeper::app::TabSync;
use tabkeeper::host::memory::{HostCall, MemoryHost, MoveRecord};
use tabkeeper::host::BrowserHost;
use tabkeeper::managers::activation_history::ActivationHistoryTrait;
use tabkeeper::services::badge::{CURRENT_WINDOW_COLOR, TOTAL_COLOR};
use tabkeeper::services::drag_position::layout_grid;
use tabkeeper::services::tab_commands::TabCommand;
use tabkeeper::state::SyncState;
use tabkeeper::types::errors::{HostError, SyncError};
use tabkeeper::types::event::BrowserEvent;
use tabkeeper::types::input::{ClickModifiers, ClickSource, Point, Rect};
use tabkeeper::types::settings::SyncSettings;
use tabkeeper::types::tab::{TabId, TabInfo};
use tabkeeper::types::window::WindowId;

type Driver = Arc<TabSync<MemoryHost>>;

const W1: WindowId = WindowId(1);
const W2: WindowId = WindowId(2);

/// W1 = [1(active), 2, 3] focused; W2 = [4(active)]. Not yet loaded.
fn setup() -> Driver {
    let host = Arc::new(MemoryHost::new());
    let w1 = host.open_window();
    let w2 = host.open_window();
    host.open_tab(w1, "https://a.example", true).unwrap();
    host.open_tab(w1, "https://b.example", false).unwrap();
    host.open_tab(w1, "https://c.example", false).unwrap();
    host.open_tab(w2, "https://d.example", true).unwrap();
    host.take_events();
    Arc::new(TabSync::new(host, SyncSettings::default()))
}

async fn started() -> Driver {
    let sync = setup();
    sync.init().await.unwrap();
    sync
}

/// Feeds queued browser events to the driver until the browser is quiet.
async fn pump(sync: &Driver) {
    loop {
        let events = sync.host().take_events();
        if events.is_empty() {
            break;
        }
        for event in events {
            sync.handle_event(event).await;
        }
    }
}

fn ids(raw: &[i32]) -> Vec<TabId> {
    raw.iter().map(|id| TabId(*id)).collect()
}

fn state_order(sync: &Driver, window_id: WindowId) -> Vec<TabId> {
    sync.read(|s| s.window_tabs(window_id).iter().map(|t| t.id).collect())
}

fn assert_consistent(sync: &Driver) {
    let violations = sync.read(SyncState::invariant_violations);
    assert!(violations.is_empty(), "violations: {:?}", violations);
}

#[tokio::test]
async fn test_init_loads_every_window() {
    let sync = started().await;
    assert_eq!(state_order(&sync, W1), ids(&[1, 2, 3]));
    assert_eq!(state_order(&sync, W2), ids(&[4]));
    sync.read(|s| {
        assert_eq!(s.current_window_id(), Some(W1));
        assert_eq!(s.total_tabs(), 4);
        assert!(s.tab(TabId(1)).unwrap().is_active);
        assert!(s.tab(TabId(4)).unwrap().is_active);
    });
    assert!(sync.is_polling_highlights());
    assert_eq!(
        sync.host().badges(),
        vec![("3".to_string(), CURRENT_WINDOW_COLOR.to_string())]
    );
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_init_fails_when_window_query_fails() {
    let sync = setup();
    sync.host().set_failing(HostCall::QueryWindows, true);
    let err = sync.init().await.unwrap_err();
    assert!(matches!(err, SyncError::Host(HostError::Rejected(_))));
    assert!(!sync.is_loading());
}

#[tokio::test]
async fn test_reload_falls_back_to_focused_flag() {
    let sync = setup();
    sync.host().set_failing(HostCall::CurrentWindow, true);
    sync.host().set_failing(HostCall::RecentTabs, true);
    sync.load_all().await.unwrap();
    assert_eq!(sync.read(|s| s.current_window_id()), Some(W1));
}

#[tokio::test]
async fn test_inactive_new_tab_is_placed_after_active_tab() {
    let sync = started().await;
    let d = sync.host().open_tab(W1, "https://new.example", false).unwrap();
    pump(&sync).await;

    assert_eq!(
        sync.host().moves(),
        vec![MoveRecord { tab_id: d, window_id: None, index: 1 }]
    );
    assert_eq!(sync.host().window_tab_ids(W1), vec![TabId(1), d, TabId(2), TabId(3)]);
    assert_eq!(state_order(&sync, W1), sync.host().window_tab_ids(W1));
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_focus_stealing_tab_is_placed_after_previous_tab() {
    // [A, B(active)] with recent = [B, A].
    let host = Arc::new(MemoryHost::new());
    let w = host.open_window();
    let a = host.open_tab(w, "https://a.example", true).unwrap();
    let b = host.open_tab(w, "https://b.example", true).unwrap();
    host.take_events();
    let sync: Driver = Arc::new(TabSync::new(host, SyncSettings::default()));
    sync.init().await.unwrap();
    sync.read(|s| assert_eq!(s.history().history(w).unwrap().recent, vec![b, a]));

    let c = sync.host().open_tab(w, "https://c.example", true).unwrap();
    pump(&sync).await;

    assert_eq!(sync.host().window_tab_ids(w), vec![a, c, b]);
    assert_eq!(state_order(&sync, w), vec![a, c, b]);
    sync.read(|s| {
        assert!(s.tab(c).unwrap().is_active);
        assert!(s.tab(b).unwrap().is_last_active);
    });
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_adjacent_new_tab_is_not_moved() {
    let sync = started().await;
    sync.host().open_tab_at(W1, Some(1), "https://new.example", false).unwrap();
    pump(&sync).await;
    assert!(sync.host().moves().is_empty());
    sync.teardown();
}

#[tokio::test]
async fn test_placement_skipped_when_anchor_lookup_fails() {
    let sync = started().await;
    sync.host().set_failing(HostCall::GetTab, true);
    let d = sync.host().open_tab(W1, "https://new.example", false).unwrap();
    pump(&sync).await;

    assert!(sync.host().moves().is_empty());
    assert_eq!(state_order(&sync, W1).last(), Some(&d));
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_placement_disabled() {
    let host = Arc::new(MemoryHost::new());
    let w = host.open_window();
    host.open_tab(w, "https://a.example", true).unwrap();
    host.open_tab(w, "https://b.example", false).unwrap();
    host.take_events();
    let mut settings = SyncSettings::default();
    settings.placement.enabled = false;
    let sync: Driver = Arc::new(TabSync::new(host, settings));
    sync.init().await.unwrap();

    sync.host().open_tab(w, "https://c.example", false).unwrap();
    pump(&sync).await;
    assert!(sync.host().moves().is_empty());
    sync.teardown();
}

#[tokio::test]
async fn test_attach_delivered_before_detach() {
    let sync = started().await;
    let host = sync.host().clone();
    host.set_attach_before_detach(true);
    host.move_tab(TabId(3), Some(W2), 0).await.unwrap();

    let events = host.take_events();
    assert!(matches!(events[0], BrowserEvent::TabAttached { .. }));
    for event in events {
        sync.handle_event(event).await;
        assert_consistent(&sync);
    }

    assert_eq!(state_order(&sync, W1), ids(&[1, 2]));
    assert_eq!(state_order(&sync, W2), ids(&[3, 4]));
    assert_eq!(sync.read(|s| s.tab(TabId(3)).unwrap().window_id), W2);
    assert_eq!(sync.read(|s| s.registry().in_transit_count()), 0);
    sync.teardown();
}

#[tokio::test]
async fn test_active_tab_moved_across_windows() {
    let sync = started().await;
    sync.host().move_tab(TabId(1), Some(W2), 1).await.unwrap();
    pump(&sync).await;

    assert_eq!(state_order(&sync, W1), ids(&[2, 3]));
    assert_eq!(state_order(&sync, W2), ids(&[4, 1]));
    sync.read(|s| {
        assert_eq!(s.history().active_tab(W1), Some(TabId(2)));
        assert!(!s.history().history(W1).unwrap().recent.contains(&TabId(1)));
        assert!(!s.tab(TabId(1)).unwrap().is_active);
    });
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_event_for_unknown_window_triggers_resync() {
    let sync = started().await;
    assert_eq!(sync.host().call_count(HostCall::QueryWindows), 1);

    let stray = TabInfo::new(TabId(99), WindowId(42), 0);
    sync.handle_event(BrowserEvent::TabCreated { tab: stray }).await;

    assert_eq!(sync.host().call_count(HostCall::QueryWindows), 2);
    assert!(sync.read(|s| s.tab(TabId(99)).is_none()));
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_duplicate_and_late_events_are_ignored() {
    let sync = started().await;
    sync.host().remove_tab(TabId(2)).await.unwrap();
    let events = sync.host().take_events();
    for event in events.iter().chain(events.iter()) {
        sync.handle_event(event.clone()).await;
    }
    sync.handle_event(BrowserEvent::TabActivated { tab_id: TabId(2), window_id: W1 }).await;
    sync.handle_event(BrowserEvent::TabMoved {
        tab_id: TabId(2),
        window_id: W1,
        from_index: 0,
        to_index: 1,
    })
    .await;

    assert_eq!(state_order(&sync, W1), ids(&[1, 3]));
    assert_eq!(sync.host().call_count(HostCall::QueryWindows), 1);
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_closing_window_drops_its_tabs() {
    let sync = started().await;
    sync.handle_tab_click(TabId(4), ClickModifiers::toggle(), ClickSource::AllWindows);
    sync.host().close_window(W2).unwrap();
    pump(&sync).await;

    sync.read(|s| {
        assert_eq!(s.windows().len(), 1);
        assert_eq!(s.total_tabs(), 3);
        assert!(s.history().history(W2).is_none());
        assert!(s.selection().selected().is_empty());
    });
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_reloads_query_once() {
    let sync = setup();
    sync.host().set_latency(Some(Duration::from_millis(50)));

    let (first, second) = tokio::join!(sync.load_all(), sync.load_all());
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(sync.host().call_count(HostCall::QueryWindows), 1);
    assert!(!sync.is_loading());

    sync.load_all().await.unwrap();
    assert_eq!(sync.host().call_count(HostCall::QueryWindows), 2);
}

#[tokio::test(start_paused = true)]
async fn test_waiting_reload_shares_the_failure() {
    let sync = setup();
    sync.host().set_latency(Some(Duration::from_millis(50)));
    sync.host().set_failing(HostCall::QueryWindows, true);

    let (first, second) = tokio::join!(sync.load_all(), sync.load_all());
    assert!(matches!(first, Err(SyncError::Host(_))));
    assert_eq!(first, second);
    assert_eq!(sync.host().call_count(HostCall::QueryWindows), 1);
}

#[tokio::test(start_paused = true)]
async fn test_highlight_polling_reconciles_browser_selection() {
    let sync = started().await;
    sync.host().set_highlighted(&[TabId(2)]);
    assert!(!sync.read(|s| s.tab(TabId(2)).unwrap().is_browser_selected));

    tokio::time::sleep(Duration::from_millis(1001)).await;
    assert_eq!(sync.host().call_count(HostCall::QueryHighlighted), 1);
    sync.read(|s| {
        assert!(s.tab(TabId(1)).unwrap().is_browser_selected);
        assert!(s.tab(TabId(2)).unwrap().is_browser_selected);
        assert!(!s.tab(TabId(3)).unwrap().is_browser_selected);
    });

    sync.host().set_highlighted(&[]);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(!sync.read(|s| s.tab(TabId(2)).unwrap().is_browser_selected));
    sync.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_highlight_poll_failure_keeps_flags() {
    let sync = started().await;
    sync.host().set_failing(HostCall::QueryHighlighted, true);
    assert_eq!(sync.refresh_browser_selection().await, 0);
    assert!(sync.read(|s| s.tab(TabId(1)).unwrap().is_browser_selected));
    sync.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_badge_alternates_and_restarts_on_change() {
    let sync = started().await;
    tokio::time::sleep(Duration::from_millis(1501)).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let green = CURRENT_WINDOW_COLOR.to_string();
    let red = TOTAL_COLOR.to_string();
    assert_eq!(
        sync.host().badges(),
        vec![
            ("3".to_string(), green.clone()),
            ("4".to_string(), red.clone()),
            ("3".to_string(), green.clone()),
        ]
    );

    // Restarts on the focused window's count, now 4.
    sync.host().open_tab(W1, "https://new.example", false).unwrap();
    pump(&sync).await;
    assert_eq!(sync.host().badges().last(), Some(&("4".to_string(), green)));
    sync.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_teardown_stops_timers() {
    let sync = started().await;
    sync.teardown();
    assert!(!sync.is_polling_highlights());

    let badges = sync.host().badges().len();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(sync.host().badges().len(), badges);
    assert_eq!(sync.host().call_count(HostCall::QueryHighlighted), 0);
}

#[tokio::test]
async fn test_drag_end_issues_one_move() {
    let sync = started().await;
    let container = Rect::new(0.0, 0.0, 400.0, 400.0);
    let items = layout_grid(container, Point::new(0.0, 0.0), 100.0, 50.0, 10.0, 2, 3);

    sync.on_drag_start(TabId(1)).unwrap();
    assert!(sync.is_dimmed(TabId(1)));
    let position = sync
        .on_drag_move(Point::new(390.0, 390.0), container, &items)
        .unwrap()
        .unwrap();
    assert_eq!(position.target_index, 3);
    assert!(sync.drag_indicator().is_some());

    sync.on_drag_end().await.unwrap();
    assert_eq!(
        sync.host().moves(),
        vec![MoveRecord { tab_id: TabId(1), window_id: Some(W1), index: 3 }]
    );
    assert!(!sync.is_dragging());
    assert!(!sync.is_dimmed(TabId(1)));
    assert!(sync.drag_indicator().is_none());

    pump(&sync).await;
    assert_eq!(state_order(&sync, W1), ids(&[2, 3, 1]));
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_drag_state_cleared_when_drop_move_fails() {
    let sync = started().await;
    let container = Rect::new(0.0, 0.0, 400.0, 400.0);
    let items = layout_grid(container, Point::new(0.0, 0.0), 100.0, 50.0, 10.0, 2, 3);
    sync.host().set_failing(HostCall::MoveTab, true);

    sync.on_drag_start(TabId(2)).unwrap();
    sync.on_drag_move(Point::new(10.0, 10.0), container, &items).unwrap();
    assert!(sync.on_drag_end().await.is_err());
    assert!(!sync.is_dragging());
    assert!(sync.drag_indicator().is_none());
    sync.teardown();
}

#[tokio::test]
async fn test_drag_unknown_tab() {
    let sync = started().await;
    assert_eq!(sync.on_drag_start(TabId(77)), Err(SyncError::UnknownTab(TabId(77))));
    assert_eq!(sync.on_drag_end().await, Err(SyncError::NotDragging));
    sync.teardown();
}

#[tokio::test]
async fn test_activate_tab_focuses_its_window() {
    let sync = started().await;
    sync.activate_tab(TabId(4)).await.unwrap();
    pump(&sync).await;

    assert_eq!(sync.host().focused_window(), Some(W2));
    assert_eq!(sync.read(|s| s.current_window_id()), Some(W2));
    assert_eq!(
        sync.activate_tab(TabId(77)).await,
        Err(SyncError::UnknownTab(TabId(77)))
    );
    sync.teardown();
}

#[tokio::test]
async fn test_close_tab() {
    let sync = started().await;
    sync.close_tab(TabId(1)).await.unwrap();
    pump(&sync).await;

    assert_eq!(state_order(&sync, W1), ids(&[2, 3]));
    assert_eq!(sync.read(|s| s.history().active_tab(W1)), Some(TabId(2)));
    assert!(matches!(
        sync.close_tab(TabId(1)).await,
        Err(SyncError::Host(HostError::TabNotFound(_)))
    ));
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_commands_move_and_duplicate() {
    let sync = started().await;

    sync.run_command(TabCommand::MoveToLast).await.unwrap();
    pump(&sync).await;
    assert_eq!(state_order(&sync, W1), ids(&[2, 3, 1]));

    sync.run_command(TabCommand::MoveToFirst).await.unwrap();
    pump(&sync).await;
    assert_eq!(state_order(&sync, W1), ids(&[1, 2, 3]));

    sync.run_command(TabCommand::Duplicate).await.unwrap();
    pump(&sync).await;
    assert_eq!(state_order(&sync, W1), ids(&[1, 5, 2, 3]));
    assert_eq!(sync.read(|s| s.history().active_tab(W1)), Some(TabId(5)));
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_command_pulls_recent_tab() {
    let sync = started().await;
    sync.activate_tab(TabId(2)).await.unwrap();
    sync.activate_tab(TabId(3)).await.unwrap();
    pump(&sync).await;

    sync.run_command(TabCommand::MoveRecentToCurrent).await.unwrap();
    pump(&sync).await;
    assert_eq!(state_order(&sync, W1), ids(&[1, 3, 2]));
    assert_consistent(&sync);
    sync.teardown();
}

#[tokio::test]
async fn test_command_without_recent_tab_does_nothing() {
    let sync = started().await;
    let err = sync.run_command(TabCommand::MoveCurrentToRecent).await.unwrap_err();
    assert!(matches!(err, SyncError::NothingToDo(_)));
    assert!(sync.host().moves().is_empty());
    sync.teardown();
}

#[tokio::test]
async fn test_command_host_failure() {
    let sync = started().await;
    sync.host().set_failing(HostCall::MoveTab, true);
    let err = sync.run_command(TabCommand::MoveToLast).await.unwrap_err();
    assert!(matches!(err, SyncError::Host(HostError::Rejected(_))));
    sync.teardown();
}

#[tokio::test]
async fn test_nicknames() {
    let sync = started().await;
    sync.set_nickname(W2, "  Reading ").unwrap();
    assert_eq!(sync.display_name(W2), "Reading");
    assert_eq!(
        sync.set_nickname(WindowId(9), "x"),
        Err(SyncError::UnknownWindow(WindowId(9)))
    );

    sync.load_all().await.unwrap();
    assert_eq!(sync.display_name(W2), "Reading");
    sync.teardown();
}
