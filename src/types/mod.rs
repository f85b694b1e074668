// Tabkeeper shared type definitions
// Each submodule defines types used across the sync core, the host boundary, and the drag services.

pub mod errors;
pub mod event;
pub mod input;
pub mod settings;
pub mod tab;
pub mod window;

pub use errors::{HostError, SettingsError, SyncError, TopologyError};
pub use event::BrowserEvent;
pub use input::{ClickModifiers, ClickSource, Point, Rect};
pub use tab::{TabChange, TabId, TabInfo, TabSnapshot, TabStatus};
pub use window::{Window, WindowId, WindowInfo};
