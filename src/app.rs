//! Sync driver for Tabkeeper.
//!
//! `TabSync` holds the synchronized state and performs the I/O around it: full
//! reloads, placement lookups and moves, highlight polling, the badge ticker,
//! keyboard commands, and the tab actions UI consumers invoke. State sits behind
//! a `std::sync::Mutex` that is never held across an `.await`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::host::BrowserHost;
use crate::managers::placement::PlacementPlan;
use crate::managers::tab_registry::TabRegistryTrait;
use crate::services::badge::{BadgeText, BadgeTicker};
use crate::services::drag_manager::DragManager;
use crate::services::drag_position::{DropPosition, Indicator};
use crate::services::tab_commands::{CommandAction, TabCommand};
use crate::state::{Effect, SyncState};
use crate::types::errors::SyncError;
use crate::types::event::BrowserEvent;
use crate::types::input::{ClickModifiers, ClickSource, Point, Rect};
use crate::types::settings::SyncSettings;
use crate::types::tab::TabId;
use crate::types::window::WindowId;

/// How often a reload request waits on one already in flight.
const LOAD_WAIT_INTERVAL: Duration = Duration::from_millis(10);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The open-tab synchronization driver.
pub struct TabSync<H: BrowserHost> {
    host: Arc<H>,
    settings: SyncSettings,
    state: Mutex<SyncState>,
    drag: Mutex<DragManager>,
    badge: Mutex<BadgeTicker>,
    loading: AtomicBool,
    last_load: Mutex<Option<Result<(), SyncError>>>,
    highlight_task: Mutex<Option<JoinHandle<()>>>,
    badge_task: Mutex<Option<JoinHandle<()>>>,
}

impl<H: BrowserHost> TabSync<H> {
    pub fn new(host: Arc<H>, settings: SyncSettings) -> Self {
        Self {
            host,
            state: Mutex::new(SyncState::new(&settings)),
            drag: Mutex::new(DragManager::new(settings.drag.clone())),
            badge: Mutex::new(BadgeTicker::new()),
            settings,
            loading: AtomicBool::new(false),
            last_load: Mutex::new(None),
            highlight_task: Mutex::new(None),
            badge_task: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Runs `f` with read access to the synchronized state.
    pub fn read<R>(&self, f: impl FnOnce(&SyncState) -> R) -> R {
        f(&lock(&self.state))
    }

    // === Lifecycle ===

    /// Loads every window, then starts highlight polling and the badge ticker.
    pub async fn init(self: &Arc<Self>) -> Result<(), SyncError> {
        info!("initializing tab sync");
        self.load_all().await?;
        self.start_highlight_polling();
        self.start_badge_ticker();
        self.update_badge(true).await;
        Ok(())
    }

    /// Stops every timer and abandons any drag in progress.
    pub fn teardown(&self) {
        self.stop_highlight_polling();
        self.stop_badge_ticker();
        lock(&self.drag).cancel();
        info!("tab sync torn down");
    }

    // === Reload ===

    /// Replaces the state with a fresh query of every window.
    ///
    /// A call made while another reload is in flight waits for it and returns
    /// its outcome instead of querying again.
    pub async fn load_all(&self) -> Result<(), SyncError> {
        if self.loading.swap(true, Ordering::AcqRel) {
            debug!("reload already in flight, waiting for it");
            while self.loading.load(Ordering::Acquire) {
                tokio::time::sleep(LOAD_WAIT_INTERVAL).await;
            }
            return lock(&self.last_load).clone().unwrap_or(Ok(()));
        }

        let result = self.reload().await;
        *lock(&self.last_load) = Some(result.clone());
        self.loading.store(false, Ordering::Release);
        result
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    async fn reload(&self) -> Result<(), SyncError> {
        let windows = self.host.query_windows().await.map_err(|e| {
            error!(error = %e, "window query failed");
            SyncError::from(e)
        })?;
        let current = match self.host.current_window().await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(error = %e, "current window query failed");
                windows.iter().find(|w| w.focused).map(|w| w.id)
            }
        };

        let window_count = windows.len();
        let total = {
            let mut state = lock(&self.state);
            state.load(windows, current);
            state.total_tabs()
        };
        info!(windows = window_count, tabs = total, "reloaded all windows");

        match self.host.recent_tabs().await {
            Ok(lists) => {
                let seeded = lock(&self.state).seed_recent(lists);
                debug!(windows = seeded, "seeded recent tabs from background");
            }
            Err(e) => error!(error = %e, "recent tab lists unavailable, keeping reload seed"),
        }
        Ok(())
    }

    // === Browser events ===

    /// Applies one browser event and performs the effects it produced.
    pub async fn handle_event(&self, event: BrowserEvent) {
        let effects = lock(&self.state).apply(&event);
        for effect in effects {
            match effect {
                Effect::Place(plan) => self.place(plan).await,
                Effect::Resync { reason } => {
                    warn!(event = event.kind(), %reason, "resyncing after desync");
                    if let Err(e) = self.load_all().await {
                        error!(error = %e, "resync failed");
                    }
                }
                Effect::BadgeChanged => self.update_badge(true).await,
            }
        }
    }

    /// Moves a new tab next to its anchor, looking the anchor's index up live.
    /// Every miss leaves the tab where the browser put it.
    async fn place(&self, plan: PlacementPlan) {
        let anchor = match self.host.get_tab(plan.anchor).await {
            Ok(anchor) => anchor,
            Err(e) => {
                debug!(tab_id = %plan.tab_id, anchor = %plan.anchor, error = %e, "anchor lookup failed, skipping placement");
                return;
            }
        };
        if anchor.window_id != plan.window_id {
            debug!(tab_id = %plan.tab_id, anchor = %plan.anchor, "anchor left the window, skipping placement");
            return;
        }
        let tab_index = {
            let state = lock(&self.state);
            match state.registry().get(plan.tab_id) {
                Some(entry) if entry.window_id == plan.window_id => entry.tab.index,
                _ => {
                    debug!(tab_id = %plan.tab_id, "new tab gone before placement");
                    return;
                }
            }
        };

        let plan = PlacementPlan { tab_index, ..plan };
        let Some(target) = plan.target_index(anchor.index) else {
            debug!(tab_id = %plan.tab_id, anchor = %plan.anchor, "new tab already next to anchor");
            return;
        };
        match self.host.move_tab(plan.tab_id, None, target).await {
            Ok(_) => debug!(tab_id = %plan.tab_id, index = target, kind = ?plan.anchor_kind, "placed new tab"),
            Err(e) => error!(tab_id = %plan.tab_id, error = %e, "placement move failed"),
        }
    }

    // === Browser selection polling ===

    /// Re-reads the highlighted tabs and reconciles browser-selection flags.
    /// Returns how many tabs are marked; 0 when the query failed.
    pub async fn refresh_browser_selection(&self) -> usize {
        match self.host.query_highlighted().await {
            Ok(ids) => lock(&self.state).reconcile_highlighted(&ids),
            Err(e) => {
                error!(error = %e, "highlighted tab query failed");
                0
            }
        }
    }

    pub fn start_highlight_polling(self: &Arc<Self>) {
        let period = Duration::from_millis(self.settings.polling.highlight_interval_ms.max(1));
        let handle = spawn_ticker(Arc::downgrade(self), period, |sync| async move {
            sync.refresh_browser_selection().await;
        });
        if let Some(old) = lock(&self.highlight_task).replace(handle) {
            old.abort();
        }
        debug!(interval_ms = period.as_millis() as u64, "highlight polling started");
    }

    pub fn stop_highlight_polling(&self) {
        if let Some(handle) = lock(&self.highlight_task).take() {
            handle.abort();
            debug!("highlight polling stopped");
        }
    }

    pub fn is_polling_highlights(&self) -> bool {
        lock(&self.highlight_task).is_some()
    }

    // === Badge ===

    /// Pushes the next badge to the host. `restart` resets the alternation to
    /// the focused window's count.
    pub async fn update_badge(&self, restart: bool) {
        let badge = self.next_badge(restart);
        if let Err(e) = self
            .host
            .set_badge(badge.text, badge.color.to_string())
            .await
        {
            error!(error = %e, "badge update failed");
        }
    }

    fn next_badge(&self, restart: bool) -> BadgeText {
        let (current, total) = self.read(|s| (s.current_window_tab_count(), s.total_tabs()));
        let mut ticker = lock(&self.badge);
        if restart {
            ticker.reset();
        }
        ticker.tick(current, total)
    }

    pub fn start_badge_ticker(self: &Arc<Self>) {
        let period = Duration::from_millis(self.settings.polling.badge_interval_ms.max(1));
        let handle = spawn_ticker(Arc::downgrade(self), period, |sync| async move {
            sync.update_badge(false).await;
        });
        if let Some(old) = lock(&self.badge_task).replace(handle) {
            old.abort();
        }
    }

    pub fn stop_badge_ticker(&self) {
        if let Some(handle) = lock(&self.badge_task).take() {
            handle.abort();
        }
    }

    // === UI-facing operations ===

    /// Click on a rendered tab card.
    pub fn handle_tab_click(&self, tab_id: TabId, click: ClickModifiers, source: ClickSource) {
        lock(&self.state).handle_tab_click(tab_id, click, source);
    }

    pub fn clear_selection(&self) {
        lock(&self.state).clear_selection();
    }

    pub fn set_nickname(&self, window_id: WindowId, nickname: &str) -> Result<(), SyncError> {
        if lock(&self.state).set_nickname(window_id, nickname) {
            Ok(())
        } else {
            Err(SyncError::UnknownWindow(window_id))
        }
    }

    pub fn display_name(&self, window_id: WindowId) -> String {
        self.read(|s| s.display_name(window_id))
    }

    /// Activates a tab and focuses its window.
    pub async fn activate_tab(&self, tab_id: TabId) -> Result<(), SyncError> {
        let window_id = self
            .read(|s| s.registry().window_of(tab_id))
            .ok_or(SyncError::UnknownTab(tab_id))?;
        self.host.activate_tab(tab_id).await.map_err(|e| {
            error!(tab_id = %tab_id, error = %e, "activate failed");
            SyncError::from(e)
        })?;
        self.host.focus_window(window_id).await.map_err(|e| {
            error!(window_id = %window_id, error = %e, "focus failed");
            SyncError::from(e)
        })
    }

    pub async fn close_tab(&self, tab_id: TabId) -> Result<(), SyncError> {
        self.host.remove_tab(tab_id).await.map_err(|e| {
            error!(tab_id = %tab_id, error = %e, "close failed");
            SyncError::from(e)
        })
    }

    /// Runs a keyboard command against the focused window's active tab.
    pub async fn run_command(&self, command: TabCommand) -> Result<(), SyncError> {
        let action = self.read(|s| command.plan(s)).map_err(|e| {
            debug!(command = %command, error = %e, "command skipped");
            e
        })?;

        let result = match action {
            CommandAction::Move { tab_id, index } => {
                self.host.move_tab(tab_id, None, index).await.map(|_| ())
            }
            CommandAction::MoveToTab { tab_id, anchor } => {
                let anchor = self.host.get_tab(anchor).await.map_err(|e| {
                    debug!(command = %command, error = %e, "recent tab no longer exists");
                    SyncError::from(e)
                })?;
                self.host
                    .move_tab(tab_id, Some(anchor.window_id), anchor.index)
                    .await
                    .map(|_| ())
            }
            CommandAction::Duplicate { tab_id } => self.host.duplicate_tab(tab_id).await.map(|_| ()),
        };
        result.map_err(|e| {
            error!(command = %command, error = %e, "command failed");
            SyncError::from(e)
        })
    }

    // === Drag and drop ===

    pub fn on_drag_start(&self, tab_id: TabId) -> Result<(), SyncError> {
        let window_id = self
            .read(|s| s.registry().window_of(tab_id))
            .ok_or(SyncError::UnknownTab(tab_id))?;
        lock(&self.drag).on_drag_start(tab_id, window_id);
        Ok(())
    }

    /// Pointer moved during a drag. `Ok(None)` when the move was throttled.
    pub fn on_drag_move(&self, pointer: Point, container: Rect, items: &[Rect]) -> Result<Option<DropPosition>, SyncError> {
        lock(&self.drag).on_drag_move(pointer, container, items)
    }

    /// Ends the drag and issues the single move for the captured target.
    /// Drag state is cleared before the move, whatever its outcome.
    pub async fn on_drag_end(&self) -> Result<(), SyncError> {
        let command = lock(&self.drag).on_drag_end()?;
        let Some(command) = command else {
            return Ok(());
        };
        self.host
            .move_tab(command.tab_id, Some(command.window_id), command.index)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!(tab_id = %command.tab_id, error = %e, "drop move failed");
                SyncError::from(e)
            })
    }

    pub fn drag_indicator(&self) -> Option<Indicator> {
        lock(&self.drag).indicator()
    }

    pub fn is_dimmed(&self, tab_id: TabId) -> bool {
        lock(&self.drag).is_dimmed(tab_id)
    }

    pub fn is_dragging(&self) -> bool {
        lock(&self.drag).is_dragging()
    }
}

impl<H: BrowserHost> Drop for TabSync<H> {
    fn drop(&mut self) {
        for task in [&self.highlight_task, &self.badge_task] {
            if let Some(handle) = lock(task).take() {
                handle.abort();
            }
        }
    }
}

/// Spawns a task running `tick` every `period` while the driver is alive.
/// The first tick fires one period after start.
fn spawn_ticker<H, F, Fut>(sync: Weak<TabSync<H>>, period: Duration, tick: F) -> JoinHandle<()>
where
    H: BrowserHost,
    F: Fn(Arc<TabSync<H>>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        loop {
            interval.tick().await;
            let Some(sync) = sync.upgrade() else {
                break;
            };
            tick(sync).await;
        }
    })
}
