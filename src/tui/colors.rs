//! Color constants for the terminal user interface.

use ratatui::style::Color;

// Column accents mirror the board's status semantics.

/// Used for the Backlog column
pub const SLATE: Color = Color::Rgb(100, 116, 139);
/// Used for the To Do column
pub const STEEL_BLUE: Color = Color::Rgb(70, 130, 180);
/// Used for the Doing column
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Used for the Blocked column
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
/// Used for the Review column
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);
/// Used for the Done column
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
