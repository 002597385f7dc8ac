//! Create/update/delete round-trips against the admin backend.
//!
//! Outbound: entities are validated locally, then encoded as multipart
//! bodies (whole entity on create, changed fields only on update).
//! Inbound: the backend's JSON is translated into canonical entities. The
//! backend owns ids and aggregates; fields it omits fall back to the
//! submitted values, never to blanks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{FormPayload, Transport};
use crate::error::{CatalogError, CatalogResult, EntityKind, Operation, TransportError};
use crate::model::{is_temp_id, Category, ImageRef, ImageUpload, MenuItem, Status, StockLevel, Subcategory};
use crate::view::{CategorySummary, MenuSummary, MostOrdered};
use crate::{value_f64, value_str, value_u64};

const CATEGORY_IMAGE_STEM: &str = "category-image";
const MENU_ITEM_IMAGE_STEM: &str = "menu-item-image";

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn require_text(field: &'static str, value: &str) -> CatalogResult<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::validation(field, "is required"));
    }
    Ok(())
}

pub fn validate_category(category: &Category) -> CatalogResult<()> {
    require_text("name", &category.name)?;
    require_text("description", &category.description)?;
    for sub in &category.subcategories {
        require_text("subcategory name", &sub.name)?;
    }
    category.image.decode_upload()?;
    Ok(())
}

pub fn validate_menu_item(item: &MenuItem) -> CatalogResult<()> {
    require_text("name", &item.name)?;
    require_text("category", &item.category)?;
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(CatalogError::validation(
            "price",
            format!("must be a non-negative number, got {}", item.price),
        ));
    }
    item.image.decode_upload()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SubcategoryWire<'a> {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

/// JSON form of a subcategory list. Temporary ids are left out so the
/// backend assigns real ones.
pub fn encode_subcategories(subcategories: &[Subcategory]) -> String {
    let wire: Vec<SubcategoryWire<'_>> = subcategories
        .iter()
        .map(|s| SubcategoryWire {
            id: Some(s.id.as_str()).filter(|id| !id.is_empty() && !is_temp_id(id)),
            name: s.name.trim(),
            description: s.description.as_deref(),
        })
        .collect();
    serde_json::to_string(&wire).unwrap_or_else(|_| "[]".to_string())
}

fn attach_image(form: &mut FormPayload, upload: ImageUpload, stem: &str) {
    let file_name = format!("{stem}.{}", upload.extension());
    form.file("image", &file_name, &upload.mime, upload.bytes);
}

fn format_price(price: f64) -> String {
    price.to_string()
}

/// Changed fields of a category edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub image: Option<ImageUpload>,
    pub subcategories: Option<Vec<Subcategory>>,
}

impl CategoryPatch {
    /// Field-level diff. `force_order` sends the subcategory list even when
    /// it matches `previous`, for locally reordered categories.
    pub fn diff(previous: &Category, edited: &Category, force_order: bool) -> CatalogResult<Self> {
        Ok(Self {
            name: (edited.name != previous.name).then(|| edited.name.trim().to_string()),
            description: (edited.description != previous.description)
                .then(|| edited.description.trim().to_string()),
            status: (edited.status != previous.status).then_some(edited.status),
            image: edited.image.decode_upload()?,
            subcategories: (force_order || edited.subcategories != previous.subcategories)
                .then(|| edited.subcategories.clone()),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn into_form(self) -> FormPayload {
        let mut form = FormPayload::new();
        if let Some(name) = self.name {
            form.text("name", name);
        }
        if let Some(description) = self.description {
            form.text("description", description);
        }
        if let Some(status) = self.status {
            form.text("status", status.as_title());
        }
        if let Some(upload) = self.image {
            attach_image(&mut form, upload, CATEGORY_IMAGE_STEM);
        }
        if let Some(subcategories) = self.subcategories {
            form.text("subcategories", encode_subcategories(&subcategories));
        }
        form
    }
}

/// Changed fields of a menu item edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub status: Option<Status>,
    pub stock: Option<StockLevel>,
    pub category: Option<String>,
    /// `Some(None)` clears the subcategory.
    pub sub_category: Option<Option<String>>,
    pub image: Option<ImageUpload>,
}

impl MenuItemPatch {
    pub fn diff(previous: &MenuItem, edited: &MenuItem) -> CatalogResult<Self> {
        Ok(Self {
            name: (edited.name != previous.name).then(|| edited.name.trim().to_string()),
            description: (edited.description != previous.description)
                .then(|| edited.description.trim().to_string()),
            price: (edited.price != previous.price).then_some(edited.price),
            status: (edited.status != previous.status).then_some(edited.status),
            stock: (edited.stock != previous.stock).then_some(edited.stock),
            category: (edited.category != previous.category).then(|| edited.category.clone()),
            sub_category: (edited.sub_category != previous.sub_category)
                .then(|| edited.sub_category.clone()),
            image: edited.image.decode_upload()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn into_form(self) -> FormPayload {
        let mut form = FormPayload::new();
        if let Some(name) = self.name {
            form.text("name", name);
        }
        if let Some(category) = self.category {
            form.text("category", category);
        }
        if let Some(sub_category) = self.sub_category {
            form.text("subCategory", sub_category.unwrap_or_default());
        }
        if let Some(price) = self.price {
            form.text("price", format_price(price));
        }
        if let Some(status) = self.status {
            form.text("status", status.as_lower());
        }
        if let Some(stock) = self.stock {
            form.text("stock", stock.as_str());
        }
        if let Some(description) = self.description {
            form.text("description", description);
        }
        if let Some(upload) = self.image {
            attach_image(&mut form, upload, MENU_ITEM_IMAGE_STEM);
        }
        form
    }
}

/// Full multipart body for a new category.
pub fn category_create_payload(draft: &Category) -> CatalogResult<FormPayload> {
    validate_category(draft)?;
    let mut form = FormPayload::new();
    form.text("name", draft.name.trim())
        .text("description", draft.description.trim())
        .text("status", draft.status.as_title());
    if let Some(upload) = draft.image.decode_upload()? {
        attach_image(&mut form, upload, CATEGORY_IMAGE_STEM);
    }
    if !draft.subcategories.is_empty() {
        form.text("subcategories", encode_subcategories(&draft.subcategories));
    }
    Ok(form)
}

/// Full multipart body for a new menu item.
pub fn menu_item_create_payload(draft: &MenuItem) -> CatalogResult<FormPayload> {
    validate_menu_item(draft)?;
    let mut form = FormPayload::new();
    form.text("name", draft.name.trim())
        .text("category", draft.category.as_str());
    if let Some(sub) = draft.sub_category.as_deref().filter(|s| !s.is_empty()) {
        form.text("subCategory", sub);
    }
    form.text("price", format_price(draft.price))
        .text("status", draft.status.as_lower())
        .text("stock", draft.stock.as_str())
        .text("description", draft.description.trim());
    if let Some(upload) = draft.image.decode_upload()? {
        attach_image(&mut form, upload, MENU_ITEM_IMAGE_STEM);
    }
    Ok(form)
}

// ---------------------------------------------------------------------------
// Inbound mapping
// ---------------------------------------------------------------------------

/// Strip the response envelope: `{data: ..}`, `{category: ..}`,
/// `{product: ..}`, or the bare entity.
fn unwrap_entity<'a>(resp: &'a Value, keys: &[&str]) -> &'a Value {
    for key in keys {
        if let Some(inner) = resp.get(*key).filter(|v| v.is_object()) {
            return inner;
        }
    }
    resp
}

fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn parse_image(v: &Value) -> Option<ImageRef> {
    let raw = match v.get("image")? {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str)?.to_string(),
        _ => return None,
    };
    match ImageRef::from_input(&raw) {
        ImageRef::None => None,
        image => Some(image),
    }
}

/// Image to keep when the backend does not echo one. Only fresh uploads
/// are ever sent, so an existing entity keeps its stored image; a new one
/// keeps a remote reference but not an unconfirmed upload.
fn fallback_image(submitted: &ImageRef, previous: Option<&ImageRef>) -> ImageRef {
    match previous {
        Some(stored) => stored.clone(),
        None if submitted.is_pending() => ImageRef::None,
        None => submitted.clone(),
    }
}

fn parse_subcategory(v: &Value, known: &[Subcategory]) -> Option<Subcategory> {
    match v {
        Value::String(id) => {
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            Some(
                known
                    .iter()
                    .find(|s| s.id == id)
                    .cloned()
                    .unwrap_or_else(|| Subcategory {
                        id: id.to_string(),
                        name: id.to_string(),
                        description: None,
                    }),
            )
        }
        Value::Object(_) => {
            let id = value_str(v, &["_id", "id"])?;
            let known_sub = known.iter().find(|s| s.id == id);
            let name = value_str(v, &["name"]).or_else(|| known_sub.map(|s| s.name.clone()))?;
            Some(Subcategory {
                id,
                name,
                description: value_str(v, &["description"])
                    .or_else(|| known_sub.and_then(|s| s.description.clone())),
            })
        }
        _ => None,
    }
}

/// Translate a backend category.
///
/// `submitted` is what the client last sent (the draft or the edited
/// entity) and `previous` the last confirmed state; both feed fallbacks.
pub fn map_category(
    v: &Value,
    submitted: Option<&Category>,
    previous: Option<&Category>,
) -> Result<Category, &'static str> {
    let id = value_str(v, &["_id", "id"]).ok_or("_id")?;
    let name = value_str(v, &["name"])
        .or_else(|| submitted.map(|c| c.name.clone()))
        .ok_or("name")?;
    let created_at = v
        .get("createdAt")
        .or_else(|| v.get("created_at"))
        .and_then(parse_timestamp)
        .or_else(|| previous.or(submitted).map(|c| c.created_at))
        .ok_or("createdAt")?;

    let subcategories = match v.get("subcategories").and_then(Value::as_array) {
        Some(arr) => {
            let known = submitted.map(|c| c.subcategories.as_slice()).unwrap_or(&[]);
            arr.iter().filter_map(|s| parse_subcategory(s, known)).collect()
        }
        None => {
            let fallback = submitted.map(|c| c.subcategories.clone()).unwrap_or_default();
            // a temporary id can only be replaced by the backend's answer
            if fallback.iter().any(|s| is_temp_id(&s.id)) {
                return Err("subcategories");
            }
            fallback
        }
    };

    Ok(Category {
        id,
        name,
        description: value_str(v, &["description"])
            .or_else(|| submitted.map(|c| c.description.clone()))
            .unwrap_or_default(),
        status: value_str(v, &["status"])
            .and_then(|s| Status::parse(&s))
            .or_else(|| submitted.map(|c| c.status))
            .unwrap_or_default(),
        image: parse_image(v)
            .or_else(|| submitted.map(|c| fallback_image(&c.image, previous.map(|p| &p.image))))
            .unwrap_or_default(),
        items_count: value_u64(v, &["itemsCount", "itemCount", "items_count"])
            .or_else(|| previous.map(|c| c.items_count))
            .unwrap_or(0),
        created_at,
        subcategories,
    })
}

/// Translate a backend product. Nested `category: {_id, name}` is
/// flattened into `category` / `category_name`; `categories` resolves the
/// name when the backend sends a bare id.
pub fn map_menu_item(
    v: &Value,
    submitted: Option<&MenuItem>,
    previous: Option<&MenuItem>,
    categories: &[Category],
) -> Result<MenuItem, &'static str> {
    let id = value_str(v, &["_id", "id"]).ok_or("_id")?;
    let name = value_str(v, &["name"])
        .or_else(|| submitted.map(|i| i.name.clone()))
        .ok_or("name")?;
    let price = value_f64(v, &["price"])
        .or_else(|| submitted.map(|i| i.price))
        .ok_or("price")?;

    let (category, nested_name) = match v.get("category") {
        Some(cat @ Value::Object(_)) => (value_str(cat, &["_id", "id"]), value_str(cat, &["name"])),
        Some(Value::String(s)) if !s.trim().is_empty() => (Some(s.trim().to_string()), None),
        _ => (None, None),
    };
    let category = category
        .or_else(|| submitted.map(|i| i.category.clone()))
        .filter(|c| !c.is_empty())
        .ok_or("category")?;
    let category_name = nested_name
        .or_else(|| {
            categories
                .iter()
                .find(|c| c.id == category)
                .map(|c| c.name.clone())
        })
        .or_else(|| {
            submitted
                .filter(|i| i.category == category)
                .map(|i| i.category_name.clone())
        })
        .unwrap_or_default();

    let sub_category = match v.get("subCategory").or_else(|| v.get("subcategory")) {
        Some(sub @ Value::Object(_)) => value_str(sub, &["_id", "id", "name"]),
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(Value::Null) => None,
        _ => submitted
            .filter(|i| i.category == category)
            .and_then(|i| i.sub_category.clone()),
    };

    let status = value_str(v, &["status"])
        .and_then(|s| Status::parse(&s))
        .or_else(|| submitted.map(|i| i.status))
        .unwrap_or_default();
    let stock = value_str(v, &["stock"])
        .and_then(|s| StockLevel::parse(&s))
        .or_else(|| submitted.map(|i| i.stock))
        .unwrap_or_default();
    // inactive products are never offered
    let stock = if status.is_active() {
        stock
    } else {
        StockLevel::OutOfStock
    };

    Ok(MenuItem {
        id,
        name,
        description: value_str(v, &["description"])
            .or_else(|| submitted.map(|i| i.description.clone()))
            .unwrap_or_default(),
        price,
        status,
        stock,
        category,
        category_name,
        sub_category,
        image: parse_image(v)
            .or_else(|| submitted.map(|i| fallback_image(&i.image, previous.map(|p| &p.image))))
            .unwrap_or_default(),
    })
}

/// Entity of a single-entity read: `{data: [entity]}`, `{data: entity}`,
/// `{product: entity}` or the bare entity.
fn single_entity<'a>(resp: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    for key in keys {
        match resp.get(*key) {
            Some(Value::Array(arr)) => return arr.first(),
            Some(inner @ Value::Object(_)) => return Some(inner),
            _ => {}
        }
    }
    match resp {
        Value::Array(arr) => arr.first(),
        Value::Object(_) => Some(resp),
        _ => None,
    }
}

/// Top-level fields of a list response, or of its `data` object.
fn summary_source<'a>(resp: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    [Some(resp), resp.get("data")]
        .into_iter()
        .flatten()
        .find(|v| keys.iter().any(|k| v.get(*k).is_some()))
}

pub fn parse_category_summary(resp: &Value) -> Option<CategorySummary> {
    let src = summary_source(
        resp,
        &["totalCategories", "totalActiveCategories", "mostOrderedCategory"],
    )?;
    let most_ordered = src
        .get("mostOrderedCategory")
        .filter(|v| v.is_object())
        .and_then(|v| {
            let id = value_str(v, &["_id", "id"]).unwrap_or_default();
            let name = value_str(v, &["name"]).unwrap_or_default();
            if id.is_empty() && name.is_empty() {
                return None;
            }
            Some(MostOrdered {
                id,
                name,
                total_ordered: value_u64(v, &["totalOrdered"]).unwrap_or(0),
            })
        });
    Some(CategorySummary {
        total: value_u64(src, &["totalCategories"]).unwrap_or(0),
        active: value_u64(src, &["totalActiveCategories"]).unwrap_or(0),
        most_ordered,
    })
}

pub fn parse_menu_summary(resp: &Value) -> Option<MenuSummary> {
    let summary = summary_source(resp, &["summary"])?
        .get("summary")
        .filter(|v| v.is_object())?;
    Some(MenuSummary {
        total: value_u64(summary, &["totalProducts"]).unwrap_or(0),
        active: value_u64(summary, &["totalActive"]).unwrap_or(0),
        in_stock: value_u64(summary, &["totalInStock"]).unwrap_or(0),
        out_of_stock: value_u64(summary, &["totalOutOfStock"]).unwrap_or(0),
    })
}

/// A list read: the mapped entries plus whatever aggregates the backend
/// computed over its full table.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedList<T, S> {
    pub entries: Vec<T>,
    pub summary: Option<S>,
}

fn list_section<'a>(resp: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    resp.as_array()
        .or_else(|| resp.get(key).and_then(Value::as_array))
        .or_else(|| resp.get("data").and_then(|d| d.get(key)).and_then(Value::as_array))
        .or_else(|| resp.get("data").and_then(Value::as_array))
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

fn transport_failure(
    operation: Operation,
    entity: EntityKind,
    id: Option<&str>,
) -> impl FnOnce(TransportError) -> CatalogError {
    let id = id.map(ToString::to_string);
    move |source| {
        warn!(
            operation = %operation,
            entity = %entity,
            id = id.as_deref().unwrap_or("-"),
            error = %source,
            "catalog request failed"
        );
        CatalogError::Transport {
            operation,
            entity,
            id,
            source,
        }
    }
}

fn reconciliation_failure(
    operation: Operation,
    entity: EntityKind,
    id: Option<&str>,
) -> impl FnOnce(&'static str) -> CatalogError {
    let id = id.map(ToString::to_string);
    move |field| {
        warn!(
            operation = %operation,
            entity = %entity,
            id = id.as_deref().unwrap_or("-"),
            field,
            "backend response cannot be reconciled"
        );
        CatalogError::Reconciliation {
            operation,
            entity,
            id,
            field,
        }
    }
}

/// Runs entity writes against a [`Transport`] and returns confirmed
/// entities. Holds no catalog state itself.
pub struct MutationCoordinator<T> {
    transport: T,
}

impl<T: Transport> MutationCoordinator<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -- categories ---------------------------------------------------------

    pub async fn fetch_categories(&self) -> CatalogResult<FetchedList<Category, CategorySummary>> {
        let resp = self
            .transport
            .get("/category")
            .await
            .map_err(transport_failure(Operation::Load, EntityKind::Category, None))?;
        let entries = list_section(&resp, "categories").ok_or_else(|| {
            reconciliation_failure(Operation::Load, EntityKind::Category, None)("categories")
        })?;

        let mut categories = Vec::with_capacity(entries.len());
        for entry in entries {
            match map_category(entry, None, None) {
                Ok(category) => categories.push(category),
                Err(field) => warn!(field, "skipping category without `{field}`"),
            }
        }
        info!(count = categories.len(), "categories loaded");
        Ok(FetchedList {
            entries: categories,
            summary: parse_category_summary(&resp),
        })
    }

    /// Re-read one category. Fields the backend omits keep their `known`
    /// values.
    pub async fn fetch_category(&self, id: &str, known: Option<&Category>) -> CatalogResult<Category> {
        let resp = self
            .transport
            .get(&format!("/category/{id}"))
            .await
            .map_err(transport_failure(Operation::Load, EntityKind::Category, Some(id)))?;
        let body = single_entity(&resp, &["data", "category"])
            .ok_or_else(|| reconciliation_failure(Operation::Load, EntityKind::Category, Some(id))("_id"))?;
        let category = map_category(body, known, known)
            .map_err(reconciliation_failure(Operation::Load, EntityKind::Category, Some(id)))?;
        debug!(id = %category.id, "category fetched");
        Ok(category)
    }

    pub async fn create_category(&self, draft: &Category) -> CatalogResult<Category> {
        let form = category_create_payload(draft)?;
        debug!(fields = ?form.names(), "create category payload");
        let resp = self
            .transport
            .post("/category/create", form)
            .await
            .map_err(transport_failure(Operation::Create, EntityKind::Category, None))?;
        let created = map_category(unwrap_entity(&resp, &["data", "category"]), Some(draft), None)
            .map_err(reconciliation_failure(Operation::Create, EntityKind::Category, None))?;
        info!(id = %created.id, name = %created.name, "category created");
        Ok(created)
    }

    /// Diff-based update. Returns `previous` untouched, without a request,
    /// when nothing changed.
    pub async fn update_category(
        &self,
        id: &str,
        previous: &Category,
        edited: &Category,
        force_order: bool,
    ) -> CatalogResult<Category> {
        validate_category(edited)?;
        let patch = CategoryPatch::diff(previous, edited, force_order)?;
        if patch.is_empty() {
            debug!(id = %id, "category unchanged; skipping update");
            return Ok(previous.clone());
        }
        let form = patch.into_form();
        debug!(id = %id, fields = ?form.names(), "update category payload");
        let resp = self
            .transport
            .patch(&format!("/category/{id}"), form)
            .await
            .map_err(transport_failure(Operation::Update, EntityKind::Category, Some(id)))?;

        let body = unwrap_entity(&resp, &["data", "category"]);
        // some update handlers answer with a bare acknowledgement
        let mut updated = if body.is_object() {
            map_category(body, Some(edited), Some(previous))
        } else {
            map_category(&serde_json::json!({ "_id": id }), Some(edited), Some(previous))
        }
        .map_err(reconciliation_failure(Operation::Update, EntityKind::Category, Some(id)))?;
        if updated.image.is_pending() {
            updated.image = previous.image.clone();
        }
        if updated.subcategories.iter().any(|s| is_temp_id(&s.id)) {
            return Err(reconciliation_failure(
                Operation::Update,
                EntityKind::Category,
                Some(id),
            )("subcategories"));
        }
        info!(id = %updated.id, "category updated");
        Ok(updated)
    }

    pub async fn delete_category(&self, id: &str) -> CatalogResult<()> {
        self.transport
            .delete(&format!("/category/{id}"))
            .await
            .map_err(transport_failure(Operation::Delete, EntityKind::Category, Some(id)))?;
        info!(id = %id, "category deleted");
        Ok(())
    }

    // -- subcategory pool ---------------------------------------------------

    pub async fn fetch_subcategories(&self) -> CatalogResult<Vec<Subcategory>> {
        let resp = self
            .transport
            .get("/subcategory")
            .await
            .map_err(transport_failure(Operation::Load, EntityKind::Subcategory, None))?;
        let entries = list_section(&resp, "subcategories").ok_or_else(|| {
            reconciliation_failure(Operation::Load, EntityKind::Subcategory, None)("subcategories")
        })?;
        let subcategories: Vec<Subcategory> = entries
            .iter()
            .filter_map(|s| parse_subcategory(s, &[]))
            .collect();
        info!(count = subcategories.len(), "subcategories loaded");
        Ok(subcategories)
    }

    pub async fn create_subcategory(&self, name: &str) -> CatalogResult<Subcategory> {
        require_text("name", name)?;
        let mut form = FormPayload::new();
        form.text("name", name.trim());
        let resp = self
            .transport
            .post("/subcategory/create", form)
            .await
            .map_err(transport_failure(Operation::Create, EntityKind::Subcategory, None))?;
        let body = unwrap_entity(&resp, &["data", "subcategory"]);
        let id = value_str(body, &["_id", "id"]).ok_or_else(|| {
            reconciliation_failure(Operation::Create, EntityKind::Subcategory, None)("_id")
        })?;
        let created = Subcategory {
            id,
            name: value_str(body, &["name"]).unwrap_or_else(|| name.trim().to_string()),
            description: value_str(body, &["description"]),
        };
        info!(id = %created.id, name = %created.name, "subcategory created");
        Ok(created)
    }

    // -- menu items ---------------------------------------------------------

    pub async fn fetch_menu_items(
        &self,
        categories: &[Category],
    ) -> CatalogResult<FetchedList<MenuItem, MenuSummary>> {
        let resp = self
            .transport
            .get("/product")
            .await
            .map_err(transport_failure(Operation::Load, EntityKind::MenuItem, None))?;
        let entries = list_section(&resp, "products").ok_or_else(|| {
            reconciliation_failure(Operation::Load, EntityKind::MenuItem, None)("products")
        })?;

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            match map_menu_item(entry, None, None, categories) {
                Ok(item) => items.push(item),
                Err(field) => warn!(field, "skipping product without `{field}`"),
            }
        }
        info!(count = items.len(), "menu items loaded");
        Ok(FetchedList {
            entries: items,
            summary: parse_menu_summary(&resp),
        })
    }

    pub async fn fetch_menu_item(
        &self,
        id: &str,
        known: Option<&MenuItem>,
        categories: &[Category],
    ) -> CatalogResult<MenuItem> {
        let resp = self
            .transport
            .get(&format!("/product/{id}"))
            .await
            .map_err(transport_failure(Operation::Load, EntityKind::MenuItem, Some(id)))?;
        let body = single_entity(&resp, &["product", "data"])
            .ok_or_else(|| reconciliation_failure(Operation::Load, EntityKind::MenuItem, Some(id))("_id"))?;
        let item = map_menu_item(body, known, known, categories)
            .map_err(reconciliation_failure(Operation::Load, EntityKind::MenuItem, Some(id)))?;
        debug!(id = %item.id, "menu item fetched");
        Ok(item)
    }

    pub async fn create_menu_item(&self, draft: &MenuItem, categories: &[Category]) -> CatalogResult<MenuItem> {
        let form = menu_item_create_payload(draft)?;
        debug!(fields = ?form.names(), "create menu item payload");
        let resp = self
            .transport
            .post("/product/create", form)
            .await
            .map_err(transport_failure(Operation::Create, EntityKind::MenuItem, None))?;
        let created = map_menu_item(
            unwrap_entity(&resp, &["product", "data"]),
            Some(draft),
            None,
            categories,
        )
        .map_err(reconciliation_failure(Operation::Create, EntityKind::MenuItem, None))?;
        info!(id = %created.id, name = %created.name, "menu item created");
        Ok(created)
    }

    pub async fn update_menu_item(
        &self,
        id: &str,
        previous: &MenuItem,
        edited: &MenuItem,
        categories: &[Category],
    ) -> CatalogResult<MenuItem> {
        validate_menu_item(edited)?;
        let patch = MenuItemPatch::diff(previous, edited)?;
        if patch.is_empty() {
            debug!(id = %id, "menu item unchanged; skipping update");
            return Ok(previous.clone());
        }
        let form = patch.into_form();
        debug!(id = %id, fields = ?form.names(), "update menu item payload");
        let resp = self
            .transport
            .patch(&format!("/product/{id}"), form)
            .await
            .map_err(transport_failure(Operation::Update, EntityKind::MenuItem, Some(id)))?;

        let body = unwrap_entity(&resp, &["product", "data"]);
        let updated = if body.is_object() {
            map_menu_item(body, Some(edited), Some(previous), categories)
        } else {
            map_menu_item(&serde_json::json!({ "_id": id }), Some(edited), Some(previous), categories)
        }
        .map_err(reconciliation_failure(Operation::Update, EntityKind::MenuItem, Some(id)))?;
        info!(id = %updated.id, "menu item updated");
        Ok(updated)
    }

    pub async fn delete_menu_item(&self, id: &str) -> CatalogResult<()> {
        self.transport
            .delete(&format!("/product/{id}"))
            .await
            .map_err(transport_failure(Operation::Delete, EntityKind::MenuItem, Some(id)))?;
        info!(id = %id, "menu item deleted");
        Ok(())
    }
}
