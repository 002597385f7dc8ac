//! Menu catalog state engine.
//!
//! Holds the admin dashboard's categories (with their ordered
//! subcategories) and menu items, derives filtered/sorted views and summary
//! statistics, and pushes create/update/delete through an injected
//! [`api::Transport`], committing the backend's answer only once it
//! confirms.
//!
//! ```ignore
//! let config = CatalogConfig::from_env();
//! let _guard = logging::init_logging(&config.log);
//! let mut store = CatalogStore::new(HttpTransport::from_config(&config)?);
//! store.load().await?;
//! let view = store.current_view();
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod mutation;
pub mod ordering;
pub mod store;
pub mod view;

pub use api::{FormPayload, FormValue, HttpTransport, Transport};
pub use config::CatalogConfig;
pub use error::{CatalogError, CatalogResult, EntityKind, Operation, TransportError};
pub use model::{Category, ImageRef, MenuItem, Status, StockLevel, Subcategory};
pub use mutation::{FetchedList, MutationCoordinator};
pub use ordering::Direction;
pub use store::{CatalogSnapshot, CatalogStore, CatalogView, MenuView};
pub use view::{CategoryFilter, CategorySummary, MenuSummary, SortKey, StatusFilter};

pub(crate) fn value_str(v: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = v.get(*key).and_then(|x| x.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Numbers may arrive as JSON numbers or numeric strings.
pub(crate) fn value_f64(v: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match v.get(*key) {
            Some(serde_json::Value::Number(n)) => return n.as_f64(),
            Some(serde_json::Value::String(s)) => {
                if let Ok(n) = s.trim().parse::<f64>() {
                    return Some(n);
                }
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn value_u64(v: &serde_json::Value, keys: &[&str]) -> Option<u64> {
    value_f64(v, keys)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64)
}
