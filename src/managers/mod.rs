// Tabkeeper state managers
// Managers own the synchronized open-tab state: registry, window topology, activation history, selection, placement.

pub mod activation_history;
pub mod placement;
pub mod selection_tracker;
pub mod tab_registry;
pub mod window_topology;
