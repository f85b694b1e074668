//! Tabkeeper demo.
//!
//! Drives the sync core against the in-memory browser: loads windows, places new
//! tabs, moves tabs across windows out of order, selects, drags, and runs the
//! keyboard commands. Set `RUST_LOG=tabkeeper=debug` to watch the event handling.

use std::error::Error;
use std::sync::Arc;

use tabkeeper::app::TabSync;
use tabkeeper::host::memory::MemoryHost;
use tabkeeper::services::drag_position::layout_grid;
use tabkeeper::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tabkeeper::services::tab_commands::TabCommand;
use tabkeeper::state::SyncState;
use tabkeeper::types::input::{ClickModifiers, ClickSource, Point, Rect};
use tabkeeper::types::window::WindowId;
use tracing_subscriber::EnvFilter;

type Driver = Arc<TabSync<MemoryHost>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tabkeeper=info")))
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Tabkeeper v{} - Demo Mode                 ║", env!("CARGO_PKG_VERSION"));
    println!("║        Open-tab synchronization against a fake browser       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let settings = demo_settings()?;
    let host = Arc::new(MemoryHost::new());
    let w1 = host.open_window();
    let w2 = host.open_window();
    for url in ["https://github.com", "https://docs.rs", "https://crates.io"] {
        host.open_tab(w1, url, url.contains("github"))?;
    }
    host.open_tab(w2, "https://rust-lang.org", true)?;
    host.take_events();

    let sync: Driver = Arc::new(TabSync::new(host.clone(), settings));
    sync.init().await?;
    print_windows("Loaded", &sync);

    demo_placement(&sync).await?;
    demo_cross_window(&sync, w1, w2).await?;
    demo_selection(&sync, w1);
    demo_drag(&sync, w1).await?;
    demo_commands(&sync).await?;

    sync.set_nickname(w2, "  Reading  ")?;
    println!("  Window {} is shown as \"{}\"", w2, sync.display_name(w2));
    println!("  Badges pushed: {:?}", host.badges());

    let violations = sync.read(SyncState::invariant_violations);
    sync.teardown();

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    if violations.is_empty() {
        println!("  ✅ State consistent after every step");
    } else {
        println!("  ❌ Invariant violations: {:?}", violations);
    }
    println!("═══════════════════════════════════════════════════════════════");
    Ok(())
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
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

fn print_windows(label: &str, sync: &Driver) {
    sync.read(|state| {
        println!("  {}:", label);
        for window in state.windows() {
            let tabs: Vec<String> = state
                .window_tabs(window.id)
                .iter()
                .map(|t| {
                    let mut marks = String::new();
                    if t.is_active {
                        marks.push('*');
                    }
                    if t.is_last_active {
                        marks.push('^');
                    }
                    if t.is_ui_selected {
                        marks.push('+');
                    }
                    format!("{}{}", t.id, marks)
                })
                .collect();
            println!("    {:<16} [{}]", state.display_name(window.id), tabs.join(", "));
        }
    });
}

fn demo_settings() -> Result<tabkeeper::types::settings::SyncSettings, Box<dyn Error>> {
    section("Settings");
    let dir = std::env::temp_dir().join("tabkeeper-demo");
    let path = dir.join("settings.json").to_string_lossy().to_string();
    let mut engine = SettingsEngine::new(Some(path));
    engine.load()?;
    engine.set_value("history.recent_capacity", serde_json::json!(10))?;
    println!("  Recent capacity: {}", engine.get_settings().history.recent_capacity);
    println!("  Drop threshold: {}", engine.get_settings().drag.insert_after_threshold);
    let settings = engine.get_settings().clone();
    let _ = std::fs::remove_dir_all(dir);
    println!();
    Ok(settings)
}

async fn demo_placement(sync: &Driver) -> Result<(), Box<dyn Error>> {
    section("New-tab placement");
    let w1 = sync.read(|s| s.current_window_id()).unwrap_or(WindowId::NONE);

    sync.host().open_tab(w1, "https://background.example", false)?;
    pump(sync).await;
    print_windows("Background tab opened next to the active one", sync);

    sync.host().open_tab(w1, "https://focused.example", true)?;
    pump(sync).await;
    print_windows("Focused tab opened next to the previously active one", sync);
    println!();
    Ok(())
}

async fn demo_cross_window(sync: &Driver, w1: WindowId, w2: WindowId) -> Result<(), Box<dyn Error>> {
    section("Cross-window move, attach delivered before detach");
    let host = sync.host();
    host.set_attach_before_detach(true);
    let Some(moving) = host.window_tab_ids(w1).get(2).copied() else {
        return Ok(());
    };
    tabkeeper::host::BrowserHost::move_tab(host.as_ref(), moving, Some(w2), 0).await?;
    host.set_attach_before_detach(false);
    pump(sync).await;
    print_windows(&format!("Tab {} moved to window {}", moving, w2), sync);
    println!();
    Ok(())
}

fn demo_selection(sync: &Driver, w1: WindowId) {
    section("Selection");
    let ids = sync.host().window_tab_ids(w1);
    if let (Some(first), Some(last)) = (ids.first(), ids.last()) {
        sync.handle_tab_click(*first, ClickModifiers::plain(), ClickSource::WindowGrid);
        sync.handle_tab_click(*last, ClickModifiers::range(), ClickSource::WindowGrid);
    }
    print_windows("Shift-click range across window 1", sync);
    sync.clear_selection();
    println!();
}

async fn demo_drag(sync: &Driver, w1: WindowId) -> Result<(), Box<dyn Error>> {
    section("Drag and drop");
    let ids = sync.host().window_tab_ids(w1);
    let Some(first) = ids.first().copied() else {
        return Ok(());
    };
    let container = Rect::new(0.0, 0.0, 400.0, 400.0);
    let items = layout_grid(container, Point::new(8.0, 8.0), 120.0, 80.0, 10.0, 2, ids.len());

    sync.on_drag_start(first)?;
    if let Some(position) = sync.on_drag_move(Point::new(390.0, 390.0), container, &items)? {
        println!("  Drop target {} (indicator at {:.0},{:.0})", position.target_index, position.indicator.x, position.indicator.y);
    }
    sync.on_drag_end().await?;
    pump(sync).await;
    print_windows("Dragged the first tab to the end", sync);
    println!();
    Ok(())
}

async fn demo_commands(sync: &Driver) -> Result<(), Box<dyn Error>> {
    section("Keyboard commands");
    for command in [TabCommand::MoveToFirst, TabCommand::MoveRecentToCurrent, TabCommand::Duplicate] {
        match sync.run_command(command).await {
            Ok(()) => println!("  Ran {}", command),
            Err(e) => println!("  Skipped {}: {}", command, e),
        }
        pump(sync).await;
    }
    print_windows("After commands", sync);
    println!();
    Ok(())
}
