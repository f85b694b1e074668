// Tabkeeper browser host boundary
// The browser-extension APIs the sync core consumes, plus an in-memory browser for demos and tests.

pub mod memory;

use std::collections::HashMap;
use std::future::Future;

use crate::types::errors::HostError;
use crate::types::tab::{TabId, TabInfo};
use crate::types::window::{WindowId, WindowInfo};

/// The browser as seen by the sync core.
///
/// Every call is a suspension point: other events may be fully processed before
/// it resumes. Failures come back through `HostError` and are never retried.
pub trait BrowserHost: Send + Sync + 'static {
    /// Every window, populated with its tabs.
    fn query_windows(&self) -> impl Future<Output = Result<Vec<WindowInfo>, HostError>> + Send;

    /// The currently focused window.
    fn current_window(&self) -> impl Future<Output = Result<WindowId, HostError>> + Send;

    fn get_tab(&self, tab_id: TabId) -> impl Future<Output = Result<TabInfo, HostError>> + Send;

    /// Moves a tab to `index`, into `window_id` when given, else within its window.
    fn move_tab(
        &self,
        tab_id: TabId,
        window_id: Option<WindowId>,
        index: usize,
    ) -> impl Future<Output = Result<TabInfo, HostError>> + Send;

    fn remove_tab(&self, tab_id: TabId) -> impl Future<Output = Result<(), HostError>> + Send;

    fn activate_tab(&self, tab_id: TabId) -> impl Future<Output = Result<(), HostError>> + Send;

    fn focus_window(&self, window_id: WindowId) -> impl Future<Output = Result<(), HostError>> + Send;

    fn duplicate_tab(&self, tab_id: TabId) -> impl Future<Output = Result<TabInfo, HostError>> + Send;

    /// Ids of every tab highlighted in the native tab strip.
    fn query_highlighted(&self) -> impl Future<Output = Result<Vec<TabId>, HostError>> + Send;

    /// Recency lists kept by the background context, most recent first.
    fn recent_tabs(&self) -> impl Future<Output = Result<HashMap<WindowId, Vec<TabId>>, HostError>> + Send;

    /// Sets the toolbar badge text and background color.
    fn set_badge(&self, text: String, color: String) -> impl Future<Output = Result<(), HostError>> + Send;
}
