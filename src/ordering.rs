//! Adjacent-swap reordering for user-ordered lists.

use serde::{Deserialize, Serialize};

use crate::model::{Category, MenuItem, Subcategory};

/// Anything addressable by a string id.
pub trait HasId {
    fn id(&self) -> &str;
}

impl HasId for Subcategory {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for Category {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for MenuItem {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

/// Swap the element identified by `target_id` with its neighbour.
///
/// Always returns a fresh vector. An unknown id, or a move past either end,
/// yields an unchanged copy.
pub fn move_by_id<T: HasId + Clone>(sequence: &[T], target_id: &str, direction: Direction) -> Vec<T> {
    let mut out = sequence.to_vec();
    let Some(idx) = out.iter().position(|el| el.id() == target_id) else {
        return out;
    };
    match direction {
        Direction::Up if idx > 0 => out.swap(idx - 1, idx),
        Direction::Down if idx + 1 < out.len() => out.swap(idx, idx + 1),
        _ => {}
    }
    out
}

/// Whether a move would change the sequence.
pub fn can_move<T: HasId>(sequence: &[T], target_id: &str, direction: Direction) -> bool {
    match sequence.iter().position(|el| el.id() == target_id) {
        Some(idx) => match direction {
            Direction::Up => idx > 0,
            Direction::Down => idx + 1 < sequence.len(),
        },
        None => false,
    }
}
