// Tabkeeper toolbar badge
// Alternates the badge between the focused window's tab count and the total tab count.

/// Background color while the badge shows the focused window's count.
pub const CURRENT_WINDOW_COLOR: &str = "#157017";
/// Background color while the badge shows the total count.
pub const TOTAL_COLOR: &str = "#C72A1C";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeText {
    pub text: String,
    pub color: &'static str,
}

/// Which count the next badge update shows.
#[derive(Debug)]
pub struct BadgeTicker {
    show_current: bool,
}

impl BadgeTicker {
    pub fn new() -> Self {
        Self { show_current: true }
    }

    /// Restarts the alternation on the focused window's count.
    pub fn reset(&mut self) {
        self.show_current = true;
    }

    pub fn shows_current(&self) -> bool {
        self.show_current
    }

    /// Badge for this tick; the following tick shows the other count.
    pub fn tick(&mut self, current_window_tabs: usize, total_tabs: usize) -> BadgeText {
        let badge = if self.show_current {
            BadgeText {
                text: current_window_tabs.to_string(),
                color: CURRENT_WINDOW_COLOR,
            }
        } else {
            BadgeText {
                text: total_tabs.to_string(),
                color: TOTAL_COLOR,
            }
        };
        self.show_current = !self.show_current;
        badge
    }
}

impl Default for BadgeTicker {
    fn default() -> Self {
        Self::new()
    }
}
