use serde::{Deserialize, Serialize};

/// Modifier state of a click on a rendered tab card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickModifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl ClickModifiers {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn toggle() -> Self {
        Self {
            ctrl: true,
            ..Self::default()
        }
    }

    pub fn range() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }

    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub fn is_toggle(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Which rendered list a click came from. Decides the order a shift-click range
/// is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickSource {
    /// Per-window grid: ranges stay within the clicked tab's window.
    #[default]
    WindowGrid,
    /// Flat list of every open tab: ranges span windows in topology order.
    AllWindows,
}

/// A point in client (viewport) pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A bounding rectangle in client pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}
