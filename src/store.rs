//! Catalog store: the single owner of catalog state.
//!
//! Commands that touch the backend commit only what the backend confirmed;
//! a failed command leaves every collection exactly as it was. Subcategory
//! reordering is the one local-only change and is carried into the owning
//! category's next update.
//!
//! The categories screen and the menu screen each keep their own search
//! term and status filter.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::Transport;
use crate::error::{CatalogError, CatalogResult, EntityKind};
use crate::export;
use crate::model::{
    Category, Clock, IdSource, MenuItem, StockLevel, Subcategory, SystemClock, TempIdSource,
};
use crate::mutation::MutationCoordinator;
use crate::ordering::{move_by_id, Direction};
use crate::view::{
    self, CategoryFilter, CategoryStats, CategorySummary, MenuStats, MenuSummary, SortKey,
    StatusFilter,
};

/// Filtered, sorted categories with statistics over the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogView {
    pub categories: Vec<Category>,
    pub stats: CategoryStats,
    /// Backend aggregates from the last load.
    pub server_summary: Option<CategorySummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuView {
    pub items: Vec<MenuItem>,
    pub stats: MenuStats,
    pub server_summary: Option<MenuSummary>,
}

/// What subscribers receive after every command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub catalog: CatalogView,
    pub menu: MenuView,
}

pub struct CatalogStore<T> {
    coordinator: MutationCoordinator<T>,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdSource>,
    categories: Vec<Category>,
    menu_items: Vec<MenuItem>,
    subcategory_pool: Vec<Subcategory>,
    category_summary: Option<CategorySummary>,
    menu_summary: Option<MenuSummary>,
    search: String,
    status_filter: StatusFilter,
    sort: SortKey,
    item_search: String,
    item_status_filter: StatusFilter,
    category_filter: CategoryFilter,
    /// Categories whose subcategory order changed locally and is unsaved.
    reordered: HashSet<String>,
    publisher: watch::Sender<CatalogSnapshot>,
}

impl<T: Transport> CatalogStore<T> {
    pub fn new(transport: T) -> Self {
        Self::with_sources(transport, Box::new(SystemClock), Box::new(TempIdSource))
    }

    pub fn with_sources(transport: T, clock: Box<dyn Clock>, ids: Box<dyn IdSource>) -> Self {
        let (publisher, _) = watch::channel(CatalogSnapshot::default());
        Self {
            coordinator: MutationCoordinator::new(transport),
            clock,
            ids,
            categories: Vec::new(),
            menu_items: Vec::new(),
            subcategory_pool: Vec::new(),
            category_summary: None,
            menu_summary: None,
            search: String::new(),
            status_filter: StatusFilter::All,
            sort: SortKey::Name,
            item_search: String::new(),
            item_status_filter: StatusFilter::All,
            category_filter: CategoryFilter::All,
            reordered: HashSet::new(),
            publisher,
        }
    }

    pub fn coordinator(&self) -> &MutationCoordinator<T> {
        &self.coordinator
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn current_view(&self) -> CatalogView {
        let filtered = view::filter(&self.categories, &self.search, self.status_filter);
        CatalogView {
            categories: view::sort_categories(&filtered, self.sort),
            stats: view::category_stats(&self.categories),
            server_summary: self.category_summary.clone(),
        }
    }

    pub fn current_menu_view(&self) -> MenuView {
        MenuView {
            items: view::filter_items(
                &self.menu_items,
                &self.item_search,
                self.item_status_filter,
                &self.category_filter,
            ),
            stats: view::menu_stats(&self.menu_items),
            server_summary: self.menu_summary,
        }
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            catalog: self.current_view(),
            menu: self.current_menu_view(),
        }
    }

    /// Receiver that observes a fresh snapshot after every command.
    pub fn subscribe(&self) -> watch::Receiver<CatalogSnapshot> {
        self.publisher.subscribe()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn menu_items(&self) -> &[MenuItem] {
        &self.menu_items
    }

    pub fn menu_item(&self, id: &str) -> Option<&MenuItem> {
        self.menu_items.iter().find(|i| i.id == id)
    }

    pub fn subcategory_pool(&self) -> &[Subcategory] {
        &self.subcategory_pool
    }

    /// Subcategories offered for an item in `category_id`, in display order.
    pub fn subcategories_for(&self, category_id: &str) -> &[Subcategory] {
        self.category(category_id)
            .map(|c| c.subcategories.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_unsaved_order(&self, category_id: &str) -> bool {
        self.reordered.contains(category_id)
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.status_filter
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort
    }

    pub fn item_search(&self) -> &str {
        &self.item_search
    }

    pub fn item_status_filter(&self) -> StatusFilter {
        self.item_status_filter
    }

    pub fn category_filter(&self) -> &CategoryFilter {
        &self.category_filter
    }

    /// CSV of the categories currently on screen.
    pub fn export_categories(&self) -> String {
        export::categories_csv(&self.current_view().categories)
    }

    pub fn export_menu_items(&self) -> String {
        export::menu_items_csv(&self.current_menu_view().items)
    }

    // -----------------------------------------------------------------------
    // Drafts
    // -----------------------------------------------------------------------

    pub fn draft_category(&self) -> Category {
        Category::draft(self.clock.as_ref(), self.ids.as_ref())
    }

    pub fn draft_subcategory(&self, name: &str, description: Option<&str>) -> Subcategory {
        Subcategory::draft(name, description, self.ids.as_ref())
    }

    pub fn draft_menu_item(&self) -> MenuItem {
        MenuItem::blank()
    }

    // -----------------------------------------------------------------------
    // Local commands
    // -----------------------------------------------------------------------

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.publish();
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.status_filter = filter;
        self.publish();
    }

    pub fn set_sort(&mut self, key: SortKey) {
        self.sort = key;
        self.publish();
    }

    pub fn set_item_search(&mut self, term: &str) {
        self.item_search = term.to_string();
        self.publish();
    }

    pub fn set_item_filter(&mut self, filter: StatusFilter) {
        self.item_status_filter = filter;
        self.publish();
    }

    pub fn set_category_filter(&mut self, filter: CategoryFilter) {
        self.category_filter = filter;
        self.publish();
    }

    /// Move a subcategory one slot within its category. Returns whether the
    /// order changed; unknown ids and boundary moves are no-ops.
    pub fn reorder_subcategory(
        &mut self,
        category_id: &str,
        subcategory_id: &str,
        direction: Direction,
    ) -> bool {
        let Some(category) = self.categories.iter_mut().find(|c| c.id == category_id) else {
            return false;
        };
        let moved = move_by_id(&category.subcategories, subcategory_id, direction);
        if moved == category.subcategories {
            return false;
        }
        category.subcategories = moved;
        self.reordered.insert(category_id.to_string());
        debug!(
            category_id = %category_id,
            subcategory_id = %subcategory_id,
            direction = ?direction,
            "subcategory reordered locally"
        );
        self.publish();
        true
    }

    // -----------------------------------------------------------------------
    // Backend commands
    // -----------------------------------------------------------------------

    /// Replace categories and menu items with the backend's lists.
    pub async fn load(&mut self) -> CatalogResult<()> {
        let categories = self.coordinator.fetch_categories().await?;
        let menu_items = self
            .coordinator
            .fetch_menu_items(&categories.entries)
            .await?;
        info!(
            categories = categories.entries.len(),
            menu_items = menu_items.entries.len(),
            "catalog loaded"
        );
        self.categories = categories.entries;
        self.category_summary = categories.summary;
        self.menu_items = menu_items.entries;
        self.menu_summary = menu_items.summary;
        self.reordered.clear();
        self.publish();
        Ok(())
    }

    /// Re-read one category from the backend and replace it in place. An
    /// unsaved local subcategory order is discarded.
    pub async fn refresh(&mut self, id: &str) -> CatalogResult<Category> {
        let known = self
            .category(id)
            .cloned()
            .ok_or_else(|| unknown(EntityKind::Category, id))?;
        let fetched = self.coordinator.fetch_category(id, Some(&known)).await?;
        if let Some(slot) = self.categories.iter_mut().find(|c| c.id == id) {
            *slot = fetched.clone();
        }
        self.reordered.remove(id);
        self.publish();
        Ok(fetched)
    }

    pub async fn refresh_item(&mut self, id: &str) -> CatalogResult<MenuItem> {
        let known = self
            .menu_item(id)
            .cloned()
            .ok_or_else(|| unknown(EntityKind::MenuItem, id))?;
        let fetched = self
            .coordinator
            .fetch_menu_item(id, Some(&known), &self.categories)
            .await?;
        if let Some(slot) = self.menu_items.iter_mut().find(|i| i.id == id) {
            *slot = fetched.clone();
        }
        self.publish();
        Ok(fetched)
    }

    pub async fn load_subcategories(&mut self) -> CatalogResult<()> {
        self.subcategory_pool = self.coordinator.fetch_subcategories().await?;
        self.publish();
        Ok(())
    }

    pub async fn create_subcategory(&mut self, name: &str) -> CatalogResult<Subcategory> {
        let created = self.coordinator.create_subcategory(name).await?;
        self.subcategory_pool.push(created.clone());
        self.publish();
        Ok(created)
    }

    pub async fn add(&mut self, draft: &Category) -> CatalogResult<Category> {
        let created = self.coordinator.create_category(draft).await?;
        self.categories.push(created.clone());
        self.publish();
        Ok(created)
    }

    pub async fn edit(&mut self, id: &str, edited: &Category) -> CatalogResult<Category> {
        let previous = self
            .category(id)
            .cloned()
            .ok_or_else(|| unknown(EntityKind::Category, id))?;
        let force_order = self.reordered.contains(id);
        let updated = self
            .coordinator
            .update_category(id, &previous, edited, force_order)
            .await?;
        if let Some(slot) = self.categories.iter_mut().find(|c| c.id == id) {
            *slot = updated.clone();
        }
        self.reordered.remove(id);
        self.publish();
        Ok(updated)
    }

    /// Persist a locally reordered subcategory list right away.
    pub async fn save_subcategory_order(&mut self, category_id: &str) -> CatalogResult<Category> {
        let current = self
            .category(category_id)
            .cloned()
            .ok_or_else(|| unknown(EntityKind::Category, category_id))?;
        self.edit(category_id, &current).await
    }

    pub async fn remove(&mut self, id: &str) -> CatalogResult<()> {
        if self.category(id).is_none() {
            return Err(unknown(EntityKind::Category, id));
        }
        self.coordinator.delete_category(id).await?;
        self.categories.retain(|c| c.id != id);
        self.reordered.remove(id);
        self.publish();
        Ok(())
    }

    pub async fn add_item(&mut self, draft: &MenuItem) -> CatalogResult<MenuItem> {
        let draft = self.with_valid_subcategory(draft);
        let created = self
            .coordinator
            .create_menu_item(&draft, &self.categories)
            .await?;
        self.menu_items.push(created.clone());
        self.publish();
        Ok(created)
    }

    pub async fn edit_item(&mut self, id: &str, edited: &MenuItem) -> CatalogResult<MenuItem> {
        let previous = self
            .menu_item(id)
            .cloned()
            .ok_or_else(|| unknown(EntityKind::MenuItem, id))?;
        let edited = self.with_valid_subcategory(edited);
        let updated = self
            .coordinator
            .update_menu_item(id, &previous, &edited, &self.categories)
            .await?;
        if let Some(slot) = self.menu_items.iter_mut().find(|i| i.id == id) {
            *slot = updated.clone();
        }
        self.publish();
        Ok(updated)
    }

    pub async fn remove_item(&mut self, id: &str) -> CatalogResult<()> {
        if self.menu_item(id).is_none() {
            return Err(unknown(EntityKind::MenuItem, id));
        }
        self.coordinator.delete_menu_item(id).await?;
        self.menu_items.retain(|i| i.id != id);
        self.publish();
        Ok(())
    }

    /// Flip an item between in stock and out of stock via the backend.
    pub async fn toggle_stock(&mut self, id: &str) -> CatalogResult<MenuItem> {
        let mut edited = self
            .menu_item(id)
            .cloned()
            .ok_or_else(|| unknown(EntityKind::MenuItem, id))?;
        edited.stock = if edited.stock.is_available() {
            StockLevel::OutOfStock
        } else {
            StockLevel::InStock
        };
        self.edit_item(id, &edited).await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Drop a subcategory that does not belong to the item's category.
    fn with_valid_subcategory(&self, item: &MenuItem) -> MenuItem {
        let mut item = item.clone();
        let outside = match (item.sub_category.as_deref(), self.category(&item.category)) {
            (Some(sub), Some(category)) => category.subcategory(sub).is_none(),
            _ => false,
        };
        if outside {
            debug!(
                category = %item.category,
                sub_category = ?item.sub_category,
                "clearing subcategory outside the item's category"
            );
            item.sub_category = None;
        }
        item
    }

    fn publish(&self) {
        self.publisher.send_replace(self.snapshot());
    }
}

fn unknown(entity: EntityKind, id: &str) -> CatalogError {
    CatalogError::UnknownEntity {
        entity,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeTransport;
    use crate::error::TransportError;
    use crate::model::fixtures::{day, sub, FixedClock, SeqIds};
    use crate::model::{is_temp_id, Status};
    use serde_json::{json, Value};

    fn category_json(id: &str, name: &str, items: u64, subs: Value) -> Value {
        json!({
            "_id": id,
            "name": name,
            "description": format!("{name} description"),
            "status": "Active",
            "image": { "url": format!("https://cdn.example.com/{id}.jpg") },
            "itemsCount": items,
            "createdAt": "2024-03-01T12:00:00Z",
            "subcategories": subs
        })
    }

    fn catalog_json() -> Value {
        json!({
            "categories": [
                category_json("c1", "Drinks", 5, json!([
                    { "_id": "s1", "name": "Soda" },
                    { "_id": "s2", "name": "Juice" }
                ])),
                category_json("c2", "Burgers", 5, json!([]))
            ],
            "totalCategories": 2,
            "totalActiveCategories": 2,
            "mostOrderedCategory": { "_id": "c2", "name": "Burgers", "totalOrdered": 31 }
        })
    }

    fn products_json() -> Value {
        json!({
            "products": [
                {
                    "_id": "p1", "name": "Cola", "price": 2.5, "status": "active",
                    "stock": "In Stock", "category": { "_id": "c1", "name": "Drinks" },
                    "subCategory": "s1", "description": "Fizzy"
                },
                {
                    "_id": "p2", "name": "Cheeseburger", "price": 8, "status": "active",
                    "stock": "Low Stock", "category": "c2", "description": "Classic"
                }
            ],
            "summary": { "totalProducts": 2 }
        })
    }

    async fn loaded_store() -> CatalogStore<FakeTransport> {
        let fake = FakeTransport::new();
        fake.respond(catalog_json()).respond(products_json());
        let mut store = CatalogStore::with_sources(
            fake,
            Box::new(FixedClock(day(15))),
            Box::new(SeqIds(0.into())),
        );
        store.load().await.unwrap();
        store
    }

    fn sub_ids(category: &Category) -> Vec<&str> {
        category.subcategories.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn load_populates_views() {
        let store = loaded_store().await;
        let view = store.current_view();
        assert_eq!(view.stats.total, 2);
        // tie on items count: first in input order wins
        assert_eq!(view.stats.most_used.unwrap().id, "c1");
        let names: Vec<&str> = view.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Burgers", "Drinks"]);

        let menu = store.current_menu_view();
        assert_eq!(menu.stats.total, 2);
        assert_eq!(menu.stats.low_stock, 1);
        assert_eq!(store.menu_item("p2").unwrap().category_name, "Burgers");
    }

    #[tokio::test]
    async fn load_keeps_backend_summaries_next_to_local_stats() {
        let store = loaded_store().await;
        let view = store.current_view();
        let summary = view.server_summary.unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.most_ordered.unwrap().id, "c2");
        assert_eq!(view.stats.most_used.unwrap().id, "c1");

        let menu = store.current_menu_view().server_summary.unwrap();
        assert_eq!(menu.total, 2);
        assert_eq!(menu.in_stock, 0);
    }

    #[tokio::test]
    async fn screens_keep_separate_search_and_filter() {
        let mut store = loaded_store().await;
        store.set_search("drink");
        store.set_filter(StatusFilter::Only(Status::Active));
        assert_eq!(store.current_view().categories.len(), 1);
        assert_eq!(store.current_menu_view().items.len(), 2);

        store.set_item_search("cheese");
        store.set_item_filter(StatusFilter::Only(Status::Inactive));
        assert!(store.current_menu_view().items.is_empty());
        store.set_item_filter(StatusFilter::All);
        assert_eq!(store.current_menu_view().items[0].id, "p2");
        assert_eq!(store.search(), "drink");
        assert_eq!(store.item_search(), "cheese");
        assert_eq!(store.current_view().categories.len(), 1);
    }

    #[tokio::test]
    async fn refresh_replaces_category_and_drops_unsaved_order() {
        let mut store = loaded_store().await;
        store.reorder_subcategory("c1", "s2", Direction::Up);
        store
            .coordinator()
            .transport()
            .fail(TransportError::Timeout("x".into()))
            .respond(json!({
                "data": [category_json("c1", "Drinks", 7, json!([
                    { "_id": "s1", "name": "Soda" },
                    { "_id": "s2", "name": "Juice" }
                ]))]
            }));

        assert!(store.refresh("c1").await.is_err());
        assert_eq!(sub_ids(store.category("c1").unwrap()), ["s2", "s1"]);
        assert!(store.has_unsaved_order("c1"));

        let fetched = store.refresh("c1").await.unwrap();
        assert_eq!(fetched.items_count, 7);
        assert_eq!(store.category("c1"), Some(&fetched));
        assert_eq!(sub_ids(&fetched), ["s1", "s2"]);
        assert!(!store.has_unsaved_order("c1"));
        assert_eq!(store.coordinator().transport().calls().last().unwrap().path, "/category/c1");
        assert_eq!(store.categories().len(), 2);
    }

    #[tokio::test]
    async fn refresh_item_replaces_in_place() {
        let mut store = loaded_store().await;
        store.coordinator().transport().respond(json!({
            "product": { "_id": "p1", "stock": "Out of Stock", "category": { "_id": "c1", "name": "Drinks" } }
        }));
        let fetched = store.refresh_item("p1").await.unwrap();
        assert_eq!(fetched.stock, StockLevel::OutOfStock);
        assert_eq!(fetched.name, "Cola");
        assert_eq!(store.menu_items()[0], fetched);
        assert_eq!(store.current_menu_view().stats.out_of_stock, 1);

        let calls = store.coordinator().transport().calls().len();
        assert!(matches!(
            store.refresh_item("p9").await,
            Err(CatalogError::UnknownEntity { .. })
        ));
        assert_eq!(store.coordinator().transport().calls().len(), calls);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_state() {
        let mut store = loaded_store().await;
        store.coordinator().transport().respond(catalog_json()).fail(TransportError::Connect("x".into()));
        let err = store.load().await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(store.categories().len(), 2);
        assert_eq!(store.menu_items().len(), 2);
    }

    #[tokio::test]
    async fn filters_apply_to_view_not_stats() {
        let mut store = loaded_store().await;
        store.set_search("drink");
        let view = store.current_view();
        assert_eq!(view.categories.len(), 1);
        assert_eq!(view.stats.total, 2);

        store.set_search("");
        store.set_filter(StatusFilter::Only(Status::Inactive));
        assert!(store.current_view().categories.is_empty());

        store.set_filter(StatusFilter::All);
        store.set_search("drink");
        assert_eq!(store.export_categories().lines().count(), 2);
        store.set_search("");
        store.set_category_filter(CategoryFilter::parse("c2"));
        let menu = store.current_menu_view();
        assert_eq!(menu.items.len(), 1);
        assert_eq!(menu.items[0].id, "p2");
        assert_eq!(menu.stats.total, 2);
        assert!(store.export_menu_items().contains("p2,Cheeseburger,Classic,8.00"));
    }

    #[tokio::test]
    async fn subscribers_see_every_command() {
        let mut store = loaded_store().await;
        let mut rx = store.subscribe();
        store.set_sort(SortKey::DateCreated);
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot, store.snapshot());
        assert_eq!(store.sort_key(), SortKey::DateCreated);
    }

    #[tokio::test]
    async fn reorder_is_local_until_next_update() {
        let mut store = loaded_store().await;
        assert!(store.reorder_subcategory("c1", "s2", Direction::Up));
        assert_eq!(sub_ids(store.category("c1").unwrap()), ["s2", "s1"]);
        assert!(store.has_unsaved_order("c1"));
        // boundary and unknown ids
        assert!(!store.reorder_subcategory("c1", "s2", Direction::Up));
        assert!(!store.reorder_subcategory("nope", "s2", Direction::Up));
        assert_eq!(store.coordinator().transport().calls().len(), 2);

        // next edit carries the order even though only the name changed
        store.coordinator().transport().respond(json!({
            "data": category_json("c1", "Beverages", 5, json!([
                { "_id": "s2", "name": "Juice" },
                { "_id": "s1", "name": "Soda" }
            ]))
        }));
        let mut edited = store.category("c1").unwrap().clone();
        edited.name = "Beverages".into();
        store.edit("c1", &edited).await.unwrap();

        let body = store.coordinator().transport().last_body();
        assert_eq!(body.names(), ["name", "subcategories"]);
        let order: Value = serde_json::from_str(body.get_text("subcategories").unwrap()).unwrap();
        assert_eq!(order[0]["_id"], "s2");
        assert!(!store.has_unsaved_order("c1"));
        assert_eq!(store.category("c1").unwrap().name, "Beverages");
    }

    #[tokio::test]
    async fn save_subcategory_order_persists_immediately() {
        let mut store = loaded_store().await;
        store.reorder_subcategory("c1", "s1", Direction::Down);
        store.coordinator().transport().respond(json!({
            "data": category_json("c1", "Drinks", 5, json!([
                { "_id": "s2", "name": "Juice" },
                { "_id": "s1", "name": "Soda" }
            ]))
        }));
        let saved = store.save_subcategory_order("c1").await.unwrap();
        assert_eq!(sub_ids(&saved), ["s2", "s1"]);
        assert_eq!(store.coordinator().transport().last_body().names(), ["subcategories"]);
    }

    #[tokio::test]
    async fn add_appends_only_after_confirmation() {
        let mut store = loaded_store().await;
        let mut draft = store.draft_category();
        assert!(is_temp_id(&draft.id));
        assert_eq!(draft.created_at, day(15));
        draft.name = "Desserts".into();
        draft.description = "Sweet things".into();
        draft.subcategories.push(store.draft_subcategory("Cakes", None));

        store.coordinator().transport().fail(TransportError::Status {
            status: 500,
            message: "boom".into(),
        });
        assert!(store.add(&draft).await.is_err());
        assert_eq!(store.categories().len(), 2);

        store.coordinator().transport().respond(category_json(
            "c3",
            "Desserts",
            0,
            json!([{ "_id": "s9", "name": "Cakes" }]),
        ));
        let created = store.add(&draft).await.unwrap();
        assert_eq!(created.id, "c3");
        assert_eq!(created.subcategories, vec![sub("s9", "Cakes")]);
        assert_eq!(store.categories().last().unwrap().id, "c3");
        assert_eq!(store.current_view().stats.unused, 1);
    }

    #[tokio::test]
    async fn failed_edit_leaves_entity_untouched() {
        let mut store = loaded_store().await;
        let before = store.category("c2").unwrap().clone();
        let mut edited = before.clone();
        edited.description = "New desc".into();
        store.coordinator().transport().fail(TransportError::Timeout("x".into()));
        assert!(store.edit("c2", &edited).await.is_err());
        assert_eq!(store.category("c2"), Some(&before));
        assert_eq!(store.coordinator().transport().last_body().names(), ["description"]);
    }

    #[tokio::test]
    async fn failed_delete_keeps_entity_in_place() {
        let mut store = loaded_store().await;
        let before = store.current_view();
        store.coordinator().transport().fail(TransportError::Status {
            status: 404,
            message: "Category not found".into(),
        });
        let err = store.remove("c1").await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(store.current_view(), before);
    }

    #[tokio::test]
    async fn delete_removes_after_confirmation() {
        let mut store = loaded_store().await;
        store.coordinator().transport().respond(json!({ "message": "deleted" }));
        store.remove("c1").await.unwrap();
        assert!(store.category("c1").is_none());
        assert_eq!(store.current_view().stats.total, 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_rejected_without_network() {
        let mut store = loaded_store().await;
        let calls = store.coordinator().transport().calls().len();
        assert!(matches!(
            store.remove("missing").await,
            Err(CatalogError::UnknownEntity { .. })
        ));
        assert!(store.toggle_stock("missing").await.is_err());
        assert_eq!(store.coordinator().transport().calls().len(), calls);
    }

    #[tokio::test]
    async fn item_lifecycle() {
        let mut store = loaded_store().await;
        let mut draft = store.draft_menu_item();
        draft.name = "Lemonade".into();
        draft.price = 3.0;
        draft.set_category("c1", "Drinks");
        draft.sub_category = Some("s2".into());

        store.coordinator().transport().respond(json!({
            "product": {
                "_id": "p3", "name": "Lemonade", "price": 3, "status": "active",
                "stock": "In Stock", "category": { "_id": "c1", "name": "Drinks" },
                "subCategory": { "_id": "s2", "name": "Juice" }
            }
        }));
        let created = store.add_item(&draft).await.unwrap();
        assert_eq!(created.id, "p3");
        assert_eq!(created.sub_category.as_deref(), Some("s2"));

        // the backend drops stock in its answer; the submitted value stands
        store.coordinator().transport().respond(json!({ "product": { "_id": "p3" } }));
        let toggled = store.toggle_stock("p3").await.unwrap();
        assert_eq!(toggled.stock, StockLevel::OutOfStock);
        assert_eq!(
            store.coordinator().transport().last_body().get_text("stock"),
            Some("Out of Stock")
        );

        store.coordinator().transport().respond(Value::Null);
        store.remove_item("p3").await.unwrap();
        assert!(store.menu_item("p3").is_none());
    }

    #[tokio::test]
    async fn subcategory_outside_category_is_cleared() {
        let mut store = loaded_store().await;
        let mut edited = store.menu_item("p1").unwrap().clone();
        edited.category = "c2".into();
        // still pointing at a Drinks subcategory
        assert_eq!(edited.sub_category.as_deref(), Some("s1"));

        store.coordinator().transport().respond(json!({
            "product": { "_id": "p1", "category": { "_id": "c2", "name": "Burgers" }, "subCategory": null }
        }));
        let updated = store.edit_item("p1", &edited).await.unwrap();
        assert!(updated.sub_category.is_none());
        assert_eq!(updated.category_name, "Burgers");
        let body = store.coordinator().transport().last_body();
        assert_eq!(body.names(), ["category", "subCategory"]);
        assert_eq!(body.get_text("subCategory"), Some(""));
    }

    #[tokio::test]
    async fn subcategory_pool_commands() {
        let mut store = loaded_store().await;
        store
            .coordinator()
            .transport()
            .respond(json!({ "subcategories": [{ "_id": "s1", "name": "Soda" }] }))
            .respond(json!({ "data": { "_id": "s5", "name": "Wraps" } }));
        store.load_subcategories().await.unwrap();
        store.create_subcategory("Wraps").await.unwrap();
        assert_eq!(store.subcategory_pool(), [sub("s1", "Soda"), sub("s5", "Wraps")]);
        assert_eq!(store.subcategories_for("c1").len(), 2);
        assert!(store.subcategories_for("c9").is_empty());
    }
}
