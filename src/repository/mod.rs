//! Storage seams. Each repository hands back fully assembled aggregates, so
//! handlers never walk references themselves.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Category, CategoryChanges, CategoryRef, NewCategory, NewOrder, NewProduct, NewUser, Order,
        OrderItem, Product, ProductChanges, User, UserCredentials,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Category>>;
    async fn find(&self, id: Uuid) -> AppResult<Option<Category>>;
    async fn create(&self, new: NewCategory) -> AppResult<Category>;
    async fn update(&self, id: Uuid, changes: CategoryChanges) -> AppResult<Option<Category>>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Products with their category populated. An empty filter lists everything.
    async fn list(&self, categories: &[Uuid]) -> AppResult<Vec<Product>>;
    async fn find(&self, id: Uuid) -> AppResult<Option<Product>>;
    async fn create(&self, new: NewProduct) -> AppResult<Product>;
    async fn update(&self, id: Uuid, changes: ProductChanges) -> AppResult<Option<Product>>;
    async fn set_gallery(&self, id: Uuid, images: Vec<String>) -> AppResult<Option<Product>>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
    async fn count(&self) -> AppResult<u64>;
    /// `None` means no limit.
    async fn featured(&self, limit: Option<u64>) -> AppResult<Vec<Product>>;
    /// Unit prices of the requested products that exist.
    async fn prices(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Newest first, user populated, items left as ids.
    async fn list(&self) -> AppResult<Vec<Order>>;
    /// Fully populated: user, items, their products and categories.
    async fn find(&self, id: Uuid) -> AppResult<Option<Order>>;
    /// Writes the order and its items as one unit.
    async fn create(&self, new: NewOrder) -> AppResult<Order>;
    async fn update_status(&self, id: Uuid, status: String) -> AppResult<Option<Order>>;
    /// Removes the order, then its items.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
    async fn find_item(&self, id: Uuid) -> AppResult<Option<OrderItem>>;
    async fn total_sales(&self) -> AppResult<i64>;
    async fn count(&self) -> AppResult<u64>;
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Order>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<User>>;
    async fn find(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>>;
    async fn create(&self, new: NewUser) -> AppResult<User>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
    async fn count(&self) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct Repositories {
    pub categories: Arc<dyn CategoryRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            categories: store.clone(),
            products: store.clone(),
            orders: store.clone(),
            users: store,
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            categories: store.clone(),
            products: store.clone(),
            orders: store.clone(),
            users: store,
        }
    }
}

/// Swap a product's category id for the full category when it still exists.
pub(crate) fn populate_category(mut product: Product, categories: &HashMap<Uuid, Category>) -> Product {
    if let Some(category) = categories.get(&product.category.id()) {
        product.category = CategoryRef::Populated(category.clone());
    }
    product
}

/// Raised when a user is created with an email that is already stored.
pub fn email_taken() -> AppError {
    AppError::BadRequest("Email is already taken".into())
}
