//! Derived views: filtering, sorting and summary statistics.
//!
//! Everything here is a pure function over a slice. Statistics are always
//! computed over the full collection, never over a filtered projection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::model::{Category, MenuItem, Status, StockLevel};

/// Fields shared by everything that shows up in a searchable list.
pub trait Listing {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn status(&self) -> Status;
}

impl Listing for Category {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn status(&self) -> Status {
        self.status
    }
}

impl Listing for MenuItem {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn status(&self) -> Status {
        self.status
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    /// Parse a filter dropdown value; `All` (any case) is the sentinel.
    pub fn parse(value: &str) -> Option<Self> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        Status::parse(value).map(Self::Only)
    }

    pub fn matches(&self, status: Status) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == status,
        }
    }
}

fn matches_search<T: Listing>(entity: &T, needle: &str) -> bool {
    needle.is_empty()
        || entity.name().to_lowercase().contains(needle)
        || entity.description().to_lowercase().contains(needle)
}

/// Keep entities whose name or description contains `term`
/// (case-insensitive) and whose status passes `status`.
pub fn filter<T: Listing + Clone>(entities: &[T], term: &str, status: StatusFilter) -> Vec<T> {
    let needle = term.trim().to_lowercase();
    entities
        .iter()
        .filter(|e| matches_search(*e, &needle) && status.matches(e.status()))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    Name,
    ItemsCount,
    DateCreated,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => Some(Self::Name),
            "items count" | "items_count" | "itemscount" => Some(Self::ItemsCount),
            "date created" | "date_created" | "created_at" | "createdat" => Some(Self::DateCreated),
            _ => None,
        }
    }
}

/// Case-insensitive name comparison. Names equal up to case compare equal,
/// so a stable sort keeps their input order.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Stable sort into a new vector.
pub fn sort_categories(categories: &[Category], key: SortKey) -> Vec<Category> {
    let mut out = categories.to_vec();
    match key {
        SortKey::Name => out.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortKey::ItemsCount => out.sort_by(|a, b| b.items_count.cmp(&a.items_count)),
        SortKey::DateCreated => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    out
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MostUsed {
    pub id: String,
    pub name: String,
    pub items_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub most_used: Option<MostUsed>,
    /// Categories with no items attributed.
    pub unused: usize,
}

pub fn category_stats(categories: &[Category]) -> CategoryStats {
    let mut stats = CategoryStats {
        total: categories.len(),
        ..CategoryStats::default()
    };
    let mut most_used: Option<&Category> = None;

    for category in categories {
        if category.status.is_active() {
            stats.active += 1;
        } else {
            stats.inactive += 1;
        }
        if category.items_count == 0 {
            stats.unused += 1;
        }
        // strict comparison keeps the first of equal maxima
        match most_used {
            Some(best) if best.items_count >= category.items_count => {}
            _ => most_used = Some(category),
        }
    }

    stats.most_used = most_used.map(|c| MostUsed {
        id: c.id.clone(),
        name: c.name.clone(),
        items_count: c.items_count,
    });
    stats
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MostOrdered {
    pub id: String,
    pub name: String,
    pub total_ordered: u64,
}

/// Aggregates the backend reports alongside the category list. These count
/// orders, which the local reductions above cannot see.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategorySummary {
    pub total: u64,
    pub active: u64,
    pub most_ordered: Option<MostOrdered>,
}

// ---------------------------------------------------------------------------
// Menu items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Category(trimmed.to_string())
        }
    }

    pub fn matches(&self, item: &MenuItem) -> bool {
        match self {
            Self::All => true,
            Self::Category(id) => item.category == *id,
        }
    }
}

pub fn filter_items(
    items: &[MenuItem],
    term: &str,
    status: StatusFilter,
    category: &CategoryFilter,
) -> Vec<MenuItem> {
    filter(items, term, status)
        .into_iter()
        .filter(|item| category.matches(item))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MenuStats {
    pub total: usize,
    pub active: usize,
    /// In stock or low stock.
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
}

/// The product list's `summary` block as the backend reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MenuSummary {
    pub total: u64,
    pub active: u64,
    pub in_stock: u64,
    pub out_of_stock: u64,
}

pub fn menu_stats(items: &[MenuItem]) -> MenuStats {
    items.iter().fold(
        MenuStats {
            total: items.len(),
            ..MenuStats::default()
        },
        |mut acc, item| {
            if item.status.is_active() {
                acc.active += 1;
            }
            match item.stock {
                StockLevel::InStock => acc.in_stock += 1,
                StockLevel::LowStock => {
                    acc.in_stock += 1;
                    acc.low_stock += 1;
                }
                StockLevel::OutOfStock => acc.out_of_stock += 1,
            }
            acc
        },
    )
}
