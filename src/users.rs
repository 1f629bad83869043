//! Static collaborator directory.
//!
//! The directory is a read-only fixture consumed by the assignee filter and
//! picker. Users are embedded into tasks by value, so nothing here is ever
//! mutated at runtime.

use crate::task::{AvatarStyle, User};

/// Avatar palette, indexed by a hash of the user id.
const AVATAR_PALETTE: [(&str, &str); 8] = [
    ("bg-pink-500", "text-white"),
    ("bg-blue-500", "text-white"),
    ("bg-amber-500", "text-white"),
    ("bg-emerald-500", "text-white"),
    ("bg-purple-500", "text-white"),
    ("bg-red-500", "text-white"),
    ("bg-indigo-500", "text-white"),
    ("bg-teal-500", "text-white"),
];

const PLACEHOLDER_AVATAR: &str = "/placeholder.svg?height=32&width=32";

/// Pick an avatar style for a user id: sum of char codes modulo palette size.
pub fn avatar_style(user_id: &str) -> AvatarStyle {
    let sum: u32 = user_id.chars().map(|c| c as u32).sum();
    let (bg, text) = AVATAR_PALETTE[sum as usize % AVATAR_PALETTE.len()];
    AvatarStyle {
        bg: bg.to_string(),
        text: text.to_string(),
    }
}

fn user(id: &str, name: &str, email: &str) -> User {
    let style = avatar_style(id);
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        avatar: Some(PLACEHOLDER_AVATAR.to_string()),
        color: style.bg.clone(),
        style,
    }
}

/// The collaborator list, in display order.
pub fn directory() -> Vec<User> {
    vec![
        user("dd", "Daniel Denis", "daniel@example.com"),
        user("js", "Jane Smith", "jane@example.com"),
        user("jd", "John Doe", "john@example.com"),
        user("ak", "Alice Kim", "alice@example.com"),
    ]
}

/// Find a collaborator by id.
pub fn find(user_id: &str) -> Option<User> {
    directory().into_iter().find(|u| u.id == user_id)
}
