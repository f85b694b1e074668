//! Unit tests for WindowTopology: every structural operation keeps the registry
//! in step, lookup misses are errors or no-ops, and cross-window moves tolerate
//! attach/detach in either order.

use rstest::rstest;
use tabkeeper::managers::tab_registry::{TabRegistry, TabRegistryTrait};
use tabkeeper::managers::window_topology::{
    AttachOutcome, DetachOutcome, WindowTopology, WindowTopologyTrait,
};
use tabkeeper::types::errors::TopologyError;
use tabkeeper::types::tab::{TabId, TabInfo, TabSnapshot};
use tabkeeper::types::window::{WindowId, WindowInfo};

const W1: WindowId = WindowId(1);
const W2: WindowId = WindowId(2);

fn tab(id: i32) -> TabSnapshot {
    TabSnapshot::from(TabInfo::new(TabId(id), W1, 0))
}

fn ids(raw: &[i32]) -> Vec<TabId> {
    raw.iter().map(|id| TabId(*id)).collect()
}

/// Topology with W1 = [1, 2, 3] and W2 = [4].
fn setup() -> (WindowTopology, TabRegistry) {
    let mut topology = WindowTopology::new();
    let mut registry = TabRegistry::new();
    topology.create_window(W1);
    topology.create_window(W2);
    for id in 1..=3 {
        topology.insert_tab(&mut registry, tab(id), W1, usize::MAX).unwrap();
    }
    topology.insert_tab(&mut registry, tab(4), W2, 0).unwrap();
    (topology, registry)
}

fn assert_positions(topology: &WindowTopology, registry: &TabRegistry) {
    for window in topology.windows() {
        for (index, id) in window.tabs.iter().enumerate() {
            let entry = registry.get(*id).expect("tab in window is registered");
            assert_eq!(entry.window_id, window.id);
            assert_eq!(entry.tab.window_id, window.id);
            assert_eq!(entry.tab.index, index);
        }
    }
    assert_eq!(registry.len(), topology.total_tabs());
}

#[test]
fn test_create_window_twice_is_rejected() {
    let mut topology = WindowTopology::new();
    assert!(topology.create_window(W1));
    assert!(!topology.create_window(W1));
    assert_eq!(topology.windows().len(), 1);
}

#[rstest]
#[case(0, &[9, 1, 2, 3])]
#[case(1, &[1, 9, 2, 3])]
#[case(3, &[1, 2, 3, 9])]
#[case(50, &[1, 2, 3, 9])]
fn test_insert_clamps_index(#[case] index: usize, #[case] expected: &[i32]) {
    let (mut topology, mut registry) = setup();
    let placed = topology.insert_tab(&mut registry, tab(9), W1, index).unwrap();

    assert_eq!(placed, index.min(3));
    assert_eq!(topology.window(W1).unwrap().tabs, ids(expected));
    assert_positions(&topology, &registry);
}

#[test]
fn test_insert_into_unknown_window_is_structural() {
    let (mut topology, mut registry) = setup();
    let err = topology
        .insert_tab(&mut registry, tab(9), WindowId(77), 0)
        .unwrap_err();
    assert_eq!(err, TopologyError::UnknownWindow(WindowId(77)));
    assert!(err.is_structural());
    assert!(registry.get(TabId(9)).is_none());
}

#[test]
fn test_insert_duplicate_is_rejected() {
    let (mut topology, mut registry) = setup();
    let err = topology.insert_tab(&mut registry, tab(2), W2, 0).unwrap_err();
    assert_eq!(err, TopologyError::DuplicateTab(TabId(2)));
    assert_eq!(topology.window(W2).unwrap().tabs, ids(&[4]));
}

#[test]
fn test_remove_tab_is_idempotent() {
    let (mut topology, mut registry) = setup();
    assert!(topology.remove_tab(&mut registry, TabId(2), W1).is_some());
    assert!(topology.remove_tab(&mut registry, TabId(2), W1).is_none());
    assert_eq!(topology.window(W1).unwrap().tabs, ids(&[1, 3]));
    assert_positions(&topology, &registry);
}

#[test]
fn test_remove_tab_falls_back_to_registered_window() {
    let (mut topology, mut registry) = setup();
    let removed = topology.remove_tab(&mut registry, TabId(4), W1);
    assert!(removed.is_some());
    assert!(topology.window(W2).unwrap().tabs.is_empty());
    assert_positions(&topology, &registry);
}

#[rstest]
#[case(0, 2, &[2, 3, 1])]
#[case(2, 0, &[3, 1, 2])]
#[case(1, 1, &[1, 2, 3])]
fn test_move_within_window(#[case] from: usize, #[case] to: usize, #[case] expected: &[i32]) {
    let (mut topology, mut registry) = setup();
    let tab_id = topology.window(W1).unwrap().tabs[from];
    topology
        .move_within_window(&mut registry, tab_id, W1, from, to)
        .unwrap();

    assert_eq!(topology.window(W1).unwrap().tabs, ids(expected));
    assert_positions(&topology, &registry);
}

#[test]
fn test_move_within_window_locates_tab_by_id() {
    let (mut topology, mut registry) = setup();
    // Stale from_index: the tab is really at 2.
    topology
        .move_within_window(&mut registry, TabId(3), W1, 0, 0)
        .unwrap();
    assert_eq!(topology.window(W1).unwrap().tabs, ids(&[3, 1, 2]));
}

#[test]
fn test_move_within_window_misses() {
    let (mut topology, mut registry) = setup();
    assert_eq!(
        topology.move_within_window(&mut registry, TabId(4), W1, 0, 1),
        Err(TopologyError::TabNotInWindow(TabId(4), W1))
    );
    assert_eq!(
        topology.move_within_window(&mut registry, TabId(1), WindowId(8), 0, 1),
        Err(TopologyError::UnknownWindow(WindowId(8)))
    );
}

#[test]
fn test_detach_then_attach() {
    let (mut topology, mut registry) = setup();

    let detached = topology.detach_tab(&mut registry, TabId(2), W1).unwrap();
    assert_eq!(detached, DetachOutcome::Parked);
    assert_eq!(topology.window(W1).unwrap().tabs, ids(&[1, 3]));
    assert!(registry.is_in_transit(TabId(2)));
    assert_positions(&topology, &registry);

    let attached = topology.attach_tab(&mut registry, TabId(2), W2, 0).unwrap();
    assert_eq!(attached, AttachOutcome::FromTransit);
    assert_eq!(topology.window(W2).unwrap().tabs, ids(&[2, 4]));
    assert_eq!(registry.in_transit_count(), 0);
    assert_positions(&topology, &registry);
}

#[test]
fn test_attach_before_detach_keeps_single_copy() {
    let (mut topology, mut registry) = setup();

    let attached = topology.attach_tab(&mut registry, TabId(3), W2, 0).unwrap();
    assert_eq!(attached, AttachOutcome::FromWindow(W1));
    assert_eq!(topology.window(W1).unwrap().tabs, ids(&[1, 2]));
    assert_eq!(topology.window(W2).unwrap().tabs, ids(&[3, 4]));

    let detached = topology.detach_tab(&mut registry, TabId(3), W1).unwrap();
    assert_eq!(detached, DetachOutcome::AlreadyMoved(W2));
    assert_eq!(topology.window(W2).unwrap().tabs, ids(&[3, 4]));
    assert!(!registry.is_in_transit(TabId(3)));
    assert_positions(&topology, &registry);
}

#[test]
fn test_round_trip_with_both_attaches_first_keeps_tab_home() {
    let (mut topology, mut registry) = setup();

    // W1 -> W2 -> W1, both attaches delivered before either detach.
    assert_eq!(
        topology.attach_tab(&mut registry, TabId(3), W2, 1).unwrap(),
        AttachOutcome::FromWindow(W1)
    );
    assert_eq!(
        topology.attach_tab(&mut registry, TabId(3), W1, 2).unwrap(),
        AttachOutcome::FromWindow(W2)
    );
    assert_eq!(topology.pending_detach_count(), 2);

    assert_eq!(
        topology.detach_tab(&mut registry, TabId(3), W1).unwrap(),
        DetachOutcome::AlreadyMoved(W1)
    );
    assert_eq!(
        topology.detach_tab(&mut registry, TabId(3), W2).unwrap(),
        DetachOutcome::AlreadyMoved(W1)
    );

    assert_eq!(topology.window(W1).unwrap().tabs, ids(&[1, 2, 3]));
    assert_eq!(topology.window(W2).unwrap().tabs, ids(&[4]));
    assert_eq!(registry.window_of(TabId(3)), Some(W1));
    assert_eq!(registry.in_transit_count(), 0);
    assert_eq!(topology.pending_detach_count(), 0);
    assert_positions(&topology, &registry);
}

#[test]
fn test_owed_detach_dropped_when_tab_closes() {
    let (mut topology, mut registry) = setup();
    topology.attach_tab(&mut registry, TabId(3), W2, 0).unwrap();
    topology.remove_tab(&mut registry, TabId(3), W2);

    assert_eq!(topology.pending_detach_count(), 0);
    assert_eq!(
        topology.detach_tab(&mut registry, TabId(3), W1),
        Err(TopologyError::UnknownTab(TabId(3)))
    );
}

#[test]
fn test_attach_within_same_window_repositions() {
    let (mut topology, mut registry) = setup();
    let outcome = topology.attach_tab(&mut registry, TabId(1), W1, 2).unwrap();
    assert_eq!(outcome, AttachOutcome::Repositioned);
    assert_eq!(topology.window(W1).unwrap().tabs, ids(&[2, 3, 1]));
}

#[test]
fn test_attach_misses() {
    let (mut topology, mut registry) = setup();
    assert_eq!(
        topology.attach_tab(&mut registry, TabId(1), WindowId(9), 0),
        Err(TopologyError::UnknownWindow(WindowId(9)))
    );
    assert_eq!(
        topology.attach_tab(&mut registry, TabId(50), W2, 0),
        Err(TopologyError::UnknownTab(TabId(50)))
    );
    assert_eq!(
        topology.detach_tab(&mut registry, TabId(50), W1),
        Err(TopologyError::UnknownTab(TabId(50)))
    );
}

#[test]
fn test_move_across_windows() {
    let (mut topology, mut registry) = setup();
    let index = topology
        .move_across_windows(&mut registry, TabId(1), W1, W2, 1)
        .unwrap();
    assert_eq!(index, 1);
    assert_eq!(topology.window(W1).unwrap().tabs, ids(&[2, 3]));
    assert_eq!(topology.window(W2).unwrap().tabs, ids(&[4, 1]));
    assert_positions(&topology, &registry);
}

#[test]
fn test_move_across_to_unknown_window_changes_nothing() {
    let (mut topology, mut registry) = setup();
    assert!(topology
        .move_across_windows(&mut registry, TabId(1), W1, WindowId(9), 0)
        .is_err());
    assert_eq!(topology.window(W1).unwrap().tabs, ids(&[1, 2, 3]));
    assert_positions(&topology, &registry);
}

#[test]
fn test_destroy_window_unregisters_tabs() {
    let (mut topology, mut registry) = setup();
    topology.set_current_window(Some(W1));

    let window = topology.destroy_window(&mut registry, W1).unwrap();
    assert_eq!(window.tabs, ids(&[1, 2, 3]));
    assert!(registry.get(TabId(1)).is_none());
    assert_eq!(topology.current_window_id(), None);
    assert!(topology.destroy_window(&mut registry, W1).is_none());
    assert_positions(&topology, &registry);
}

#[test]
fn test_replace_all_sorts_by_index_and_keeps_nicknames() {
    let (mut topology, mut registry) = setup();
    topology.set_nickname(W2, "Research");

    let mut a = TabInfo::new(TabId(10), W2, 1);
    a.title = "second".to_string();
    let b = TabInfo::new(TabId(11), W2, 0);
    let c = TabInfo::new(TabId(12), WindowId(3), 0);
    topology.replace_all(
        &mut registry,
        vec![
            WindowInfo { id: W2, focused: true, tabs: vec![a, b] },
            WindowInfo { id: WindowId(3), focused: false, tabs: vec![c] },
        ],
        Some(W2),
    );

    assert_eq!(topology.windows().len(), 2);
    assert_eq!(topology.window(W2).unwrap().tabs, ids(&[11, 10]));
    assert_eq!(topology.nickname(W2), Some("Research"));
    assert!(registry.get(TabId(1)).is_none());
    assert_eq!(topology.current_window_id(), Some(W2));
    assert_positions(&topology, &registry);
}

#[rstest]
#[case("  Work  ", Some("Work"))]
#[case("   ", None)]
#[case("", None)]
fn test_set_nickname_trims(#[case] input: &str, #[case] expected: Option<&str>) {
    let (mut topology, _) = setup();
    topology.set_nickname(W1, "Old");
    assert!(topology.set_nickname(W1, input));
    assert_eq!(topology.nickname(W1), expected);
}

#[test]
fn test_display_name() {
    let (mut topology, _) = setup();
    topology.set_current_window(Some(W1));
    assert_eq!(topology.display_name(W1), "Current Window");
    assert_eq!(topology.display_name(W2), "Window 2");
    topology.set_nickname(W1, "Mail");
    assert_eq!(topology.display_name(W1), "Mail");
    assert!(!topology.set_nickname(WindowId(9), "nope"));
}

#[test]
fn test_all_tab_ids_in_topology_order() {
    let (topology, _) = setup();
    assert_eq!(topology.all_tab_ids(), ids(&[1, 2, 3, 4]));
    assert_eq!(topology.total_tabs(), 4);
}
