//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::{Priority, Status};
use crate::task::User;
use crate::users;

pub const SLATE: Color = Color::Rgb(100, 116, 139);
pub const SKY: Color = Color::Rgb(14, 165, 233);
pub const EMERALD: Color = Color::Rgb(16, 185, 129);
pub const AMBER: Color = Color::Rgb(245, 158, 11);
pub const ORANGE: Color = Color::Rgb(249, 115, 22);
pub const ROSE: Color = Color::Rgb(225, 29, 72);

pub fn status_color(status: Status) -> Color {
    match status {
        Status::NotStarted => SLATE,
        Status::InProgress => SKY,
        Status::Completed => EMERALD,
    }
}

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::None => Color::DarkGray,
        Priority::Low => SLATE,
        Priority::Medium => AMBER,
        Priority::High => ORANGE,
        Priority::Urgent => ROSE,
    }
}

/// Terminal colour for a palette class such as `bg-pink-500` or `text-white`.
pub fn palette_color(class: &str) -> Color {
    let name = class
        .trim_start_matches("bg-")
        .trim_start_matches("text-")
        .split('-')
        .next()
        .unwrap_or_default();
    match name {
        "white" => Color::White,
        "black" => Color::Black,
        "pink" => Color::Rgb(236, 72, 153),
        "blue" => Color::Rgb(59, 130, 246),
        "amber" => AMBER,
        "emerald" => EMERALD,
        "purple" => Color::Rgb(168, 85, 247),
        "red" => Color::Rgb(239, 68, 68),
        "indigo" => Color::Rgb(99, 102, 241),
        "teal" => Color::Rgb(20, 184, 166),
        "gray" | "slate" => SLATE,
        _ => Color::Reset,
    }
}

/// Foreground and background for an assignee badge. Styles with no
/// terminal colour fall back to the one derived from the user id.
pub fn avatar_colors(user: &User) -> (Color, Color) {
    let bg = palette_color(&user.style.bg);
    if bg != Color::Reset {
        return (palette_color(&user.style.text), bg);
    }
    let style = users::avatar_style(&user.id);
    (palette_color(&style.text), palette_color(&style.bg))
}
