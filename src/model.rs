//! Catalog entity shapes.
//!
//! Categories own an ordered list of subcategories; menu items point at a
//! category by id and optionally at one of that category's subcategories.
//! These are plain data types: wire translation lives in
//! [`crate::mutation`], derived views in [`crate::view`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Prefix of identifiers minted locally before the backend assigns one.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Whether an id was generated client-side and must never be sent as an id.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

// ---------------------------------------------------------------------------
// Status / stock
// ---------------------------------------------------------------------------

/// Availability status shared by categories and menu items.
///
/// The backend spells it `Active`/`Inactive` for categories and
/// `active`/`inactive` for products; both forms parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "inactive")]
    Inactive,
}

impl Status {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    /// Category spelling.
    pub fn as_title(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }

    /// Product spelling.
    pub fn as_lower(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StockLevel {
    #[default]
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl StockLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in stock" | "in_stock" | "instock" => Some(Self::InStock),
            "low stock" | "low_stock" | "lowstock" => Some(Self::LowStock),
            "out of stock" | "out_of_stock" | "outofstock" => Some(Self::OutOfStock),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "In Stock",
            Self::LowStock => "Low Stock",
            Self::OutOfStock => "Out of Stock",
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Self::OutOfStock)
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Reference to an entity's image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageRef {
    #[default]
    None,
    /// Asset already stored by the backend.
    Remote { url: String },
    /// Local file chosen by the user, held as a `data:` URI until uploaded.
    Pending { data_uri: String },
}

/// Decoded content of a pending image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "jpg",
        }
    }
}

impl ImageRef {
    /// Classify a raw image field as typed by a form or returned by an API.
    pub fn from_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::None
        } else if trimmed.starts_with("data:") {
            Self::Pending {
                data_uri: trimmed.to_string(),
            }
        } else {
            Self::Remote {
                url: trimmed.to_string(),
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Remote { url } => Some(url),
            _ => None,
        }
    }

    /// Decode a pending `data:<mime>;base64,<payload>` URI.
    ///
    /// Returns `Ok(None)` for remote and empty references.
    pub fn decode_upload(&self) -> CatalogResult<Option<ImageUpload>> {
        let Self::Pending { data_uri } = self else {
            return Ok(None);
        };
        let rest = data_uri
            .strip_prefix("data:")
            .ok_or_else(|| CatalogError::validation("image", "not a data URI"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| CatalogError::validation("image", "data URI has no payload"))?;
        let Some(mime) = header.strip_suffix(";base64") else {
            return Err(CatalogError::validation(
                "image",
                "only base64 data URIs are supported",
            ));
        };
        let mime = if mime.is_empty() {
            "application/octet-stream".to_string()
        } else {
            mime.to_ascii_lowercase()
        };

        use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
        use base64::Engine as _;
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64_STANDARD
            .decode(compact)
            .map_err(|e| CatalogError::validation("image", format!("bad base64 payload: {e}")))?;
        if bytes.is_empty() {
            return Err(CatalogError::validation("image", "image file is empty"));
        }
        Ok(Some(ImageUpload { mime, bytes }))
    }
}

// ---------------------------------------------------------------------------
// Clock / id sources
// ---------------------------------------------------------------------------

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of temporary ids for drafts.
pub trait IdSource: Send + Sync {
    fn temp_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TempIdSource;

impl IdSource for TempIdSource {
    fn temp_id(&self) -> String {
        format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4())
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Subcategory {
    pub fn draft(name: &str, description: Option<&str>, ids: &dyn IdSource) -> Self {
        Self {
            id: ids.temp_id(),
            name: name.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: Status,
    pub image: ImageRef,
    /// Server-maintained usage metric.
    pub items_count: u64,
    pub created_at: DateTime<Utc>,
    pub subcategories: Vec<Subcategory>,
}

impl Category {
    /// A blank category for an "add new" form. Its id and timestamp are
    /// placeholders until the backend confirms the create.
    pub fn draft(clock: &dyn Clock, ids: &dyn IdSource) -> Self {
        Self {
            id: ids.temp_id(),
            name: String::new(),
            description: String::new(),
            status: Status::Active,
            image: ImageRef::None,
            items_count: 0,
            created_at: clock.now(),
            subcategories: Vec::new(),
        }
    }

    pub fn subcategory(&self, id_or_name: &str) -> Option<&Subcategory> {
        self.subcategories
            .iter()
            .find(|s| s.id == id_or_name || s.name == id_or_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub status: Status,
    pub stock: StockLevel,
    /// Owning category id.
    pub category: String,
    pub category_name: String,
    /// Id or name of a subcategory of `category`.
    pub sub_category: Option<String>,
    pub image: ImageRef,
}

impl Default for MenuItem {
    fn default() -> Self {
        Self::blank()
    }
}

impl MenuItem {
    /// A blank item for an "add new" form.
    pub fn blank() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            price: 0.0,
            status: Status::Active,
            stock: StockLevel::InStock,
            category: String::new(),
            category_name: String::new(),
            sub_category: None,
            image: ImageRef::None,
        }
    }

    /// Point the item at another category. A previously selected
    /// subcategory belongs to the old category and is dropped.
    pub fn set_category(&mut self, category_id: &str, category_name: &str) {
        if self.category != category_id {
            self.sub_category = None;
        }
        self.category = category_id.to_string();
        self.category_name = category_name.to_string();
    }

    pub fn is_available(&self) -> bool {
        self.status.is_active() && self.stock.is_available()
    }
}
