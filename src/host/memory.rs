//! In-memory browser for Tabkeeper.
//!
//! `MemoryHost` keeps a simulated set of windows and tabs, answers the
//! [`BrowserHost`] calls against it, and queues the same events a real browser
//! would emit for every change. Callers drain the queue with
//! [`MemoryHost::take_events`] and feed it to the sync driver. Individual calls
//! can be made to fail, and window queries/tab lookups can be given latency to
//! open suspension windows on a paused clock.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use super::BrowserHost;
use crate::types::errors::HostError;
use crate::types::event::BrowserEvent;
use crate::types::tab::{TabChange, TabId, TabInfo};
use crate::types::window::{WindowId, WindowInfo};

/// Host calls that can be counted and made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCall {
    QueryWindows,
    CurrentWindow,
    GetTab,
    MoveTab,
    RemoveTab,
    ActivateTab,
    FocusWindow,
    DuplicateTab,
    QueryHighlighted,
    RecentTabs,
    SetBadge,
}

/// A `move_tab` call as the host received it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRecord {
    pub tab_id: TabId,
    pub window_id: Option<WindowId>,
    pub index: usize,
}

#[derive(Debug, Clone)]
struct SimWindow {
    id: WindowId,
    tabs: Vec<TabInfo>,
}

impl SimWindow {
    fn reindex(&mut self) {
        for (index, tab) in self.tabs.iter_mut().enumerate() {
            tab.index = index;
            tab.window_id = self.id;
        }
    }
}

#[derive(Debug)]
struct Browser {
    windows: Vec<SimWindow>,
    focused: Option<WindowId>,
    next_tab_id: i32,
    next_window_id: i32,
    events: VecDeque<BrowserEvent>,
    recent: HashMap<WindowId, Vec<TabId>>,
    failing: HashSet<HostCall>,
    calls: HashMap<HostCall, usize>,
    moves: Vec<MoveRecord>,
    badges: Vec<(String, String)>,
    latency: Option<Duration>,
    attach_before_detach: bool,
}

impl Default for Browser {
    fn default() -> Self {
        Self {
            windows: Vec::new(),
            focused: None,
            next_tab_id: 1,
            next_window_id: 1,
            events: VecDeque::new(),
            recent: HashMap::new(),
            failing: HashSet::new(),
            calls: HashMap::new(),
            moves: Vec::new(),
            badges: Vec::new(),
            latency: None,
            attach_before_detach: false,
        }
    }
}

impl Browser {
    fn check(&mut self, call: HostCall) -> Result<(), HostError> {
        *self.calls.entry(call).or_default() += 1;
        if self.failing.contains(&call) {
            return Err(HostError::Rejected(format!("{:?} failed", call)));
        }
        Ok(())
    }

    fn window_pos(&self, window_id: WindowId) -> Option<usize> {
        self.windows.iter().position(|w| w.id == window_id)
    }

    fn locate(&self, tab_id: TabId) -> Option<(usize, usize)> {
        self.windows.iter().enumerate().find_map(|(w, window)| {
            window
                .tabs
                .iter()
                .position(|t| t.id == tab_id)
                .map(|t| (w, t))
        })
    }

    fn tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        self.locate(tab_id)
            .map(|(w, t)| self.windows[w].tabs[t].clone())
            .ok_or(HostError::TabNotFound(tab_id))
    }

    fn open_window(&mut self) -> WindowId {
        let id = WindowId(self.next_window_id);
        self.next_window_id += 1;
        self.windows.push(SimWindow { id, tabs: Vec::new() });
        if self.focused.is_none() {
            self.focused = Some(id);
        }
        self.events.push_back(BrowserEvent::WindowCreated { window_id: id });
        id
    }

    fn insert(&mut self, window: usize, index: usize, mut tab: TabInfo, active: bool) -> TabId {
        let index = index.min(self.windows[window].tabs.len());
        tab.active = false;
        tab.highlighted = false;
        let tab_id = tab.id;
        self.windows[window].tabs.insert(index, tab);
        self.windows[window].reindex();

        let mut created = self.windows[window].tabs[index].clone();
        created.active = active;
        created.highlighted = active;
        self.events.push_back(BrowserEvent::TabCreated { tab: created });
        if active {
            self.activate(tab_id);
        }
        tab_id
    }

    fn activate(&mut self, tab_id: TabId) {
        let Some((w, t)) = self.locate(tab_id) else {
            return;
        };
        let window = &mut self.windows[w];
        for tab in window.tabs.iter_mut() {
            tab.active = false;
            tab.highlighted = false;
        }
        window.tabs[t].active = true;
        window.tabs[t].highlighted = true;
        let window_id = window.id;

        let recent = self.recent.entry(window_id).or_default();
        recent.retain(|id| *id != tab_id);
        recent.insert(0, tab_id);

        self.events
            .push_back(BrowserEvent::TabActivated { tab_id, window_id });
    }

    /// After the active tab left window `w`, activates the tab now at `index`.
    fn activate_neighbor(&mut self, w: usize, index: usize) {
        let window = &self.windows[w];
        if window.tabs.iter().any(|t| t.active) {
            return;
        }
        if let Some(tab) = window.tabs.get(index.min(window.tabs.len().saturating_sub(1))) {
            let id = tab.id;
            self.activate(id);
        }
    }

    fn remove_window(&mut self, w: usize) {
        let window = self.windows.remove(w);
        self.recent.remove(&window.id);
        if self.focused == Some(window.id) {
            self.focused = self.windows.first().map(|w| w.id);
        }
        self.events
            .push_back(BrowserEvent::WindowRemoved { window_id: window.id });
    }
}

/// A simulated browser implementing [`BrowserHost`].
#[derive(Debug, Default)]
pub struct MemoryHost {
    browser: Mutex<Browser>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn browser(&self) -> MutexGuard<'_, Browser> {
        self.browser.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        let latency = self.browser().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    // --- Simulated user actions. Each queues the events the browser would emit. ---

    pub fn open_window(&self) -> WindowId {
        self.browser().open_window()
    }

    /// Opens a tab at the end of `window_id`.
    pub fn open_tab(&self, window_id: WindowId, url: &str, active: bool) -> Result<TabId, HostError> {
        self.open_tab_at(window_id, None, url, active)
    }

    pub fn open_tab_at(
        &self,
        window_id: WindowId,
        index: Option<usize>,
        url: &str,
        active: bool,
    ) -> Result<TabId, HostError> {
        let mut browser = self.browser();
        let w = browser
            .window_pos(window_id)
            .ok_or(HostError::WindowNotFound(window_id))?;
        let id = TabId(browser.next_tab_id);
        browser.next_tab_id += 1;

        let mut tab = TabInfo::new(id, window_id, 0);
        tab.url = url.to_string();
        tab.title = url.to_string();
        let index = index.unwrap_or(browser.windows[w].tabs.len());
        Ok(browser.insert(w, index, tab, active))
    }

    /// Closes a window and every tab in it.
    pub fn close_window(&self, window_id: WindowId) -> Result<(), HostError> {
        let mut browser = self.browser();
        let w = browser
            .window_pos(window_id)
            .ok_or(HostError::WindowNotFound(window_id))?;
        let tab_ids: Vec<TabId> = browser.windows[w].tabs.iter().map(|t| t.id).collect();
        for tab_id in tab_ids {
            browser.events.push_back(BrowserEvent::TabRemoved {
                tab_id,
                window_id,
                is_window_closing: true,
            });
        }
        browser.remove_window(w);
        Ok(())
    }

    pub fn update_title(&self, tab_id: TabId, title: &str) -> Result<(), HostError> {
        let mut browser = self.browser();
        let (w, t) = browser.locate(tab_id).ok_or(HostError::TabNotFound(tab_id))?;
        browser.windows[w].tabs[t].title = title.to_string();
        browser.events.push_back(BrowserEvent::TabUpdated {
            tab_id,
            change: TabChange {
                title: Some(title.to_string()),
                ..TabChange::default()
            },
        });
        Ok(())
    }

    /// Highlights tabs in the native strip. The browser emits no event for this.
    pub fn set_highlighted(&self, tab_ids: &[TabId]) {
        let mut browser = self.browser();
        for window in browser.windows.iter_mut() {
            for tab in window.tabs.iter_mut() {
                tab.highlighted = tab.active || tab_ids.contains(&tab.id);
            }
        }
    }

    // --- Test controls and inspection. ---

    pub fn set_failing(&self, call: HostCall, failing: bool) {
        let mut browser = self.browser();
        if failing {
            browser.failing.insert(call);
        } else {
            browser.failing.remove(&call);
        }
    }

    /// Latency added to window queries and single-tab lookups.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.browser().latency = latency;
    }

    /// Emit attach before detach for cross-window moves.
    pub fn set_attach_before_detach(&self, enabled: bool) {
        self.browser().attach_before_detach = enabled;
    }

    pub fn set_recent(&self, window_id: WindowId, tab_ids: Vec<TabId>) {
        self.browser().recent.insert(window_id, tab_ids);
    }

    /// Drains the queued events in emission order.
    pub fn take_events(&self) -> Vec<BrowserEvent> {
        self.browser().events.drain(..).collect()
    }

    pub fn has_events(&self) -> bool {
        !self.browser().events.is_empty()
    }

    pub fn moves(&self) -> Vec<MoveRecord> {
        self.browser().moves.clone()
    }

    pub fn badges(&self) -> Vec<(String, String)> {
        self.browser().badges.clone()
    }

    pub fn call_count(&self, call: HostCall) -> usize {
        self.browser().calls.get(&call).copied().unwrap_or(0)
    }

    /// Tab ids of a window in strip order.
    pub fn window_tab_ids(&self, window_id: WindowId) -> Vec<TabId> {
        let browser = self.browser();
        browser
            .window_pos(window_id)
            .map(|w| browser.windows[w].tabs.iter().map(|t| t.id).collect())
            .unwrap_or_default()
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.browser().focused
    }
}

impl BrowserHost for MemoryHost {
    async fn query_windows(&self) -> Result<Vec<WindowInfo>, HostError> {
        self.delay().await;
        let mut browser = self.browser();
        browser.check(HostCall::QueryWindows)?;
        let focused = browser.focused;
        Ok(browser
            .windows
            .iter()
            .map(|w| WindowInfo {
                id: w.id,
                focused: focused == Some(w.id),
                tabs: w.tabs.clone(),
            })
            .collect())
    }

    async fn current_window(&self) -> Result<WindowId, HostError> {
        let mut browser = self.browser();
        browser.check(HostCall::CurrentWindow)?;
        browser
            .focused
            .ok_or_else(|| HostError::Rejected("no focused window".to_string()))
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        self.delay().await;
        let mut browser = self.browser();
        browser.check(HostCall::GetTab)?;
        browser.tab(tab_id)
    }

    async fn move_tab(
        &self,
        tab_id: TabId,
        window_id: Option<WindowId>,
        index: usize,
    ) -> Result<TabInfo, HostError> {
        let mut browser = self.browser();
        browser.check(HostCall::MoveTab)?;
        browser.moves.push(MoveRecord {
            tab_id,
            window_id,
            index,
        });

        let (w, from) = browser.locate(tab_id).ok_or(HostError::TabNotFound(tab_id))?;
        let source_id = browser.windows[w].id;
        let target_id = window_id.unwrap_or(source_id);
        let target = browser
            .window_pos(target_id)
            .ok_or(HostError::WindowNotFound(target_id))?;

        if target == w {
            let mut tab = browser.windows[w].tabs.remove(from);
            let to = index.min(browser.windows[w].tabs.len());
            tab.index = to;
            browser.windows[w].tabs.insert(to, tab);
            browser.windows[w].reindex();
            if to != from {
                browser.events.push_back(BrowserEvent::TabMoved {
                    tab_id,
                    window_id: source_id,
                    from_index: from,
                    to_index: to,
                });
            }
            return browser.tab(tab_id);
        }

        let mut tab = browser.windows[w].tabs.remove(from);
        let was_active = tab.active;
        tab.active = false;
        tab.highlighted = false;
        browser.windows[w].reindex();
        if let Some(recent) = browser.recent.get_mut(&source_id) {
            recent.retain(|id| *id != tab_id);
        }

        let to = index.min(browser.windows[target].tabs.len());
        browser.windows[target].tabs.insert(to, tab);
        browser.windows[target].reindex();

        let detached = BrowserEvent::TabDetached {
            tab_id,
            old_window_id: source_id,
            old_position: from,
        };
        let attached = BrowserEvent::TabAttached {
            tab_id,
            new_window_id: target_id,
            new_position: to,
        };
        if browser.attach_before_detach {
            browser.events.push_back(attached);
            browser.events.push_back(detached);
        } else {
            browser.events.push_back(detached);
            browser.events.push_back(attached);
        }
        if was_active {
            browser.activate_neighbor(w, from);
        }
        debug!(tab_id = %tab_id, from = %source_id, to = %target_id, "simulated cross-window move");
        browser.tab(tab_id)
    }

    async fn remove_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        let mut browser = self.browser();
        browser.check(HostCall::RemoveTab)?;
        let (w, t) = browser.locate(tab_id).ok_or(HostError::TabNotFound(tab_id))?;
        let tab = browser.windows[w].tabs.remove(t);
        browser.windows[w].reindex();
        let window_id = browser.windows[w].id;
        if let Some(recent) = browser.recent.get_mut(&window_id) {
            recent.retain(|id| *id != tab_id);
        }
        browser.events.push_back(BrowserEvent::TabRemoved {
            tab_id,
            window_id,
            is_window_closing: false,
        });

        if browser.windows[w].tabs.is_empty() {
            browser.remove_window(w);
        } else if tab.active {
            browser.activate_neighbor(w, t);
        }
        Ok(())
    }

    async fn activate_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        let mut browser = self.browser();
        browser.check(HostCall::ActivateTab)?;
        browser.tab(tab_id)?;
        browser.activate(tab_id);
        Ok(())
    }

    async fn focus_window(&self, window_id: WindowId) -> Result<(), HostError> {
        let mut browser = self.browser();
        browser.check(HostCall::FocusWindow)?;
        browser
            .window_pos(window_id)
            .ok_or(HostError::WindowNotFound(window_id))?;
        if browser.focused != Some(window_id) {
            browser.focused = Some(window_id);
            browser
                .events
                .push_back(BrowserEvent::WindowFocusChanged { window_id });
        }
        Ok(())
    }

    async fn duplicate_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        let mut browser = self.browser();
        browser.check(HostCall::DuplicateTab)?;
        let source = browser.tab(tab_id)?;
        let w = browser
            .window_pos(source.window_id)
            .ok_or(HostError::WindowNotFound(source.window_id))?;

        let id = TabId(browser.next_tab_id);
        browser.next_tab_id += 1;
        let mut copy = source.clone();
        copy.id = id;
        browser.insert(w, source.index + 1, copy, true);
        browser.tab(id)
    }

    async fn query_highlighted(&self) -> Result<Vec<TabId>, HostError> {
        let mut browser = self.browser();
        browser.check(HostCall::QueryHighlighted)?;
        Ok(browser
            .windows
            .iter()
            .flat_map(|w| w.tabs.iter().filter(|t| t.highlighted).map(|t| t.id))
            .collect())
    }

    async fn recent_tabs(&self) -> Result<HashMap<WindowId, Vec<TabId>>, HostError> {
        let mut browser = self.browser();
        browser.check(HostCall::RecentTabs)?;
        Ok(browser.recent.clone())
    }

    async fn set_badge(&self, text: String, color: String) -> Result<(), HostError> {
        let mut browser = self.browser();
        browser.check(HostCall::SetBadge)?;
        browser.badges.push((text, color));
        Ok(())
    }
}
