use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CategoryRepository, OrderRepository, ProductRepository, UserRepository, email_taken,
    populate_category,
};
use crate::{
    error::AppResult,
    models::{
        Category, CategoryChanges, CategoryRef, NewCategory, NewOrder, NewProduct, NewUser, Order,
        OrderItem, OrderItemEntry, Product, ProductChanges, User, UserCredentials, UserRef,
    },
};

/// Process-local store with the same reference semantics as [`super::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Data>,
}

#[derive(Default)]
struct Data {
    categories: Vec<Category>,
    products: Vec<Product>,
    users: Vec<UserCredentials>,
    orders: Vec<OrderRow>,
    items: Vec<ItemRow>,
}

#[derive(Clone)]
struct OrderRow {
    id: Uuid,
    item_ids: Vec<Uuid>,
    shipping_address1: String,
    shipping_address2: Option<String>,
    city: String,
    zip: String,
    country: String,
    phone: String,
    status: String,
    total_price: i64,
    user_id: Option<Uuid>,
    date_ordered: DateTime<Utc>,
}

#[derive(Clone)]
struct ItemRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i32,
}

impl Data {
    fn category_map(&self) -> HashMap<Uuid, Category> {
        self.categories.iter().map(|c| (c.id, c.clone())).collect()
    }

    fn populated_product(&self, id: Uuid) -> Option<Product> {
        let product = self.products.iter().find(|p| p.id == id)?.clone();
        Some(populate_category(product, &self.category_map()))
    }

    fn user_ref(&self, id: Option<Uuid>) -> Option<UserRef> {
        let id = id?;
        self.users
            .iter()
            .find(|u| u.user.id == id)
            .map(|u| UserRef {
                id,
                name: u.user.name.clone(),
            })
    }

    fn item(&self, id: Uuid) -> Option<OrderItem> {
        let row = self.items.iter().find(|i| i.id == id)?;
        Some(OrderItem {
            id: row.id,
            quantity: row.quantity,
            product: self.populated_product(row.product_id),
        })
    }

    fn assemble(&self, row: &OrderRow, populate_items: bool) -> Order {
        let order_items = row
            .item_ids
            .iter()
            .map(|id| match self.item(*id) {
                Some(item) if populate_items => OrderItemEntry::Populated(item),
                _ => OrderItemEntry::Id(*id),
            })
            .collect();
        Order {
            id: row.id,
            order_items,
            shipping_address1: row.shipping_address1.clone(),
            shipping_address2: row.shipping_address2.clone(),
            city: row.city.clone(),
            zip: row.zip.clone(),
            country: row.country.clone(),
            phone: row.phone.clone(),
            status: row.status.clone(),
            total_price: row.total_price,
            user: self.user_ref(row.user_id),
            date_ordered: row.date_ordered,
        }
    }

    fn newest_first<'a>(&'a self, rows: impl DoubleEndedIterator<Item = &'a OrderRow>) -> Vec<&'a OrderRow> {
        let mut rows: Vec<&OrderRow> = rows.rev().collect();
        rows.sort_by(|a, b| b.date_ordered.cmp(&a.date_ordered));
        rows
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Category>> {
        Ok(self.data.read().await.categories.clone())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Category>> {
        let data = self.data.read().await;
        Ok(data.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, new: NewCategory) -> AppResult<Category> {
        let category = Category {
            id: Uuid::new_v4(),
            name: new.name,
            color: new.color,
            icon: new.icon,
        };
        self.data.write().await.categories.push(category.clone());
        Ok(category)
    }

    async fn update(&self, id: Uuid, changes: CategoryChanges) -> AppResult<Option<Category>> {
        let mut data = self.data.write().await;
        let Some(category) = data.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            category.name = name;
        }
        if changes.color.is_some() {
            category.color = changes.color;
        }
        if changes.icon.is_some() {
            category.icon = changes.icon;
        }
        Ok(Some(category.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut data = self.data.write().await;
        let before = data.categories.len();
        data.categories.retain(|c| c.id != id);
        Ok(data.categories.len() != before)
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self, categories: &[Uuid]) -> AppResult<Vec<Product>> {
        let data = self.data.read().await;
        let by_id = data.category_map();
        Ok(data
            .products
            .iter()
            .filter(|p| categories.is_empty() || categories.contains(&p.category.id()))
            .map(|p| populate_category(p.clone(), &by_id))
            .collect())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.data.read().await.populated_product(id))
    }

    async fn create(&self, new: NewProduct) -> AppResult<Product> {
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            rich_description: new.rich_description,
            image: new.image,
            images: Vec::new(),
            brand: new.brand,
            price: new.price,
            category: CategoryRef::Id(new.category_id),
            count_in_stock: new.count_in_stock,
            rating: new.rating,
            num_reviews: new.num_reviews,
            is_featured: new.is_featured,
            date_created: Utc::now(),
        };
        self.data.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: Uuid, changes: ProductChanges) -> AppResult<Option<Product>> {
        let mut data = self.data.write().await;
        let Some(product) = data.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(description) = changes.description {
            product.description = description;
        }
        if let Some(rich_description) = changes.rich_description {
            product.rich_description = rich_description;
        }
        if let Some(image) = changes.image {
            product.image = image;
        }
        if let Some(brand) = changes.brand {
            product.brand = brand;
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        product.category = CategoryRef::Id(changes.category_id);
        if let Some(count_in_stock) = changes.count_in_stock {
            product.count_in_stock = count_in_stock;
        }
        if let Some(rating) = changes.rating {
            product.rating = rating;
        }
        if let Some(num_reviews) = changes.num_reviews {
            product.num_reviews = num_reviews;
        }
        if let Some(is_featured) = changes.is_featured {
            product.is_featured = is_featured;
        }
        Ok(Some(product.clone()))
    }

    async fn set_gallery(&self, id: Uuid, images: Vec<String>) -> AppResult<Option<Product>> {
        let mut data = self.data.write().await;
        let Some(product) = data.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        product.images = images;
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut data = self.data.write().await;
        let before = data.products.len();
        data.products.retain(|p| p.id != id);
        Ok(data.products.len() != before)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.data.read().await.products.len() as u64)
    }

    async fn featured(&self, limit: Option<u64>) -> AppResult<Vec<Product>> {
        let data = self.data.read().await;
        let featured = data.products.iter().filter(|p| p.is_featured).cloned();
        Ok(match limit {
            Some(limit) => featured
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => featured.collect(),
        })
    }

    async fn prices(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>> {
        let data = self.data.read().await;
        Ok(data
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| (p.id, p.price))
            .collect())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Order>> {
        let data = self.data.read().await;
        Ok(data
            .newest_first(data.orders.iter())
            .into_iter()
            .map(|row| data.assemble(row, false))
            .collect())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Order>> {
        let data = self.data.read().await;
        Ok(data
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|row| data.assemble(row, true)))
    }

    async fn create(&self, new: NewOrder) -> AppResult<Order> {
        let mut data = self.data.write().await;
        let items: Vec<ItemRow> = new
            .items
            .iter()
            .map(|item| ItemRow {
                id: Uuid::new_v4(),
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();
        let row = OrderRow {
            id: Uuid::new_v4(),
            item_ids: items.iter().map(|i| i.id).collect(),
            shipping_address1: new.shipping_address1,
            shipping_address2: new.shipping_address2,
            city: new.city,
            zip: new.zip,
            country: new.country,
            phone: new.phone,
            status: new.status,
            total_price: new.total_price,
            user_id: new.user_id,
            date_ordered: Utc::now(),
        };
        data.items.extend(items);
        data.orders.push(row.clone());
        Ok(data.assemble(&row, false))
    }

    async fn update_status(&self, id: Uuid, status: String) -> AppResult<Option<Order>> {
        let mut data = self.data.write().await;
        let Some(row) = data.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        row.status = status;
        let row = row.clone();
        Ok(Some(data.assemble(&row, false)))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut data = self.data.write().await;
        let Some(position) = data.orders.iter().position(|o| o.id == id) else {
            return Ok(false);
        };
        let row = data.orders.remove(position);
        data.items.retain(|item| !row.item_ids.contains(&item.id));
        Ok(true)
    }

    async fn find_item(&self, id: Uuid) -> AppResult<Option<OrderItem>> {
        Ok(self.data.read().await.item(id))
    }

    async fn total_sales(&self) -> AppResult<i64> {
        Ok(self.data.read().await.orders.iter().map(|o| o.total_price).sum())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.data.read().await.orders.len() as u64)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Order>> {
        let data = self.data.read().await;
        let rows = data.orders.iter().filter(|o| o.user_id == Some(user_id));
        Ok(data
            .newest_first(rows)
            .into_iter()
            .map(|row| data.assemble(row, true))
            .collect())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().map(|u| u.user.clone()).collect())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .find(|u| u.user.id == id)
            .map(|u| u.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.user.email == email).cloned())
    }

    async fn create(&self, new: NewUser) -> AppResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            is_admin: new.is_admin,
            street: new.street,
            apartment: new.apartment,
            zip: new.zip,
            city: new.city,
            country: new.country,
            created_at: Utc::now(),
        };
        let mut data = self.data.write().await;
        if data.users.iter().any(|u| u.user.email == user.email) {
            return Err(email_taken());
        }
        data.users.push(UserCredentials {
            user: user.clone(),
            password_hash: new.password_hash,
        });
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut data = self.data.write().await;
        let before = data.users.len();
        data.users.retain(|u| u.user.id != id);
        Ok(data.users.len() != before)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.data.read().await.users.len() as u64)
    }
}
