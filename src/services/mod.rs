// Tabkeeper services
// Stateless or self-contained helpers around the sync core: drag geometry and lifecycle, badge, keyboard commands, settings.

pub mod badge;
pub mod drag_manager;
pub mod drag_position;
pub mod settings_engine;
pub mod tab_commands;
