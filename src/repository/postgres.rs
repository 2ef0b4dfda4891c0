use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::{
    CategoryRepository, OrderRepository, ProductRepository, UserRepository, email_taken,
};
use crate::{
    db::{DbPool, OrmConn, create_orm_conn},
    entity::{
        Categories, OrderItems, Orders, Products, Users, categories, order_items, orders,
        products, users,
    },
    error::{AppError, AppResult},
    models::{
        Category, CategoryChanges, CategoryRef, NewCategory, NewOrder, NewProduct, NewUser, Order,
        OrderItem, OrderItemEntry, Product, ProductChanges, User, UserCredentials, UserRef,
    },
};

/// Postgres-backed store. SeaORM for row access, the raw pool for aggregates.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    orm: OrmConn,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        let orm = create_orm_conn(&pool);
        Self { pool, orm }
    }

    async fn populated_products(&self, ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = Products::find()
            .filter(products::Column::Id.is_in(ids))
            .find_also_related(Categories)
            .all(&self.orm)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(product, category)| {
                let product = with_category(product, category);
                (product.id, product)
            })
            .collect())
    }

    async fn assemble_orders(
        &self,
        models: Vec<orders::Model>,
        populate_items: bool,
    ) -> AppResult<Vec<Order>> {
        let order_ids: Vec<Uuid> = models.iter().map(|o| o.id).collect();
        let user_ids: Vec<Uuid> = models.iter().filter_map(|o| o.user_id).collect();

        let items = if order_ids.is_empty() {
            Vec::new()
        } else {
            OrderItems::find()
                .filter(order_items::Column::OrderId.is_in(order_ids))
                .order_by_asc(order_items::Column::Position)
                .all(&self.orm)
                .await?
        };

        let users: HashMap<Uuid, String> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            Users::find()
                .filter(users::Column::Id.is_in(user_ids))
                .all(&self.orm)
                .await?
                .into_iter()
                .map(|u| (u.id, u.name))
                .collect()
        };

        let products = if populate_items {
            self.populated_products(items.iter().map(|i| i.product_id).collect())
                .await?
        } else {
            HashMap::new()
        };

        let mut by_order: HashMap<Uuid, Vec<OrderItemEntry>> = HashMap::new();
        for item in items {
            let entry = if populate_items {
                OrderItemEntry::Populated(OrderItem {
                    id: item.id,
                    quantity: item.quantity,
                    product: products.get(&item.product_id).cloned(),
                })
            } else {
                OrderItemEntry::Id(item.id)
            };
            by_order.entry(item.order_id).or_default().push(entry);
        }

        Ok(models
            .into_iter()
            .map(|model| {
                let user = model.user_id.and_then(|id| {
                    users.get(&id).map(|name| UserRef {
                        id,
                        name: name.clone(),
                    })
                });
                Order {
                    id: model.id,
                    order_items: by_order.remove(&model.id).unwrap_or_default(),
                    shipping_address1: model.shipping_address1,
                    shipping_address2: model.shipping_address2,
                    city: model.city,
                    zip: model.zip,
                    country: model.country,
                    phone: model.phone,
                    status: model.status,
                    total_price: model.total_price,
                    user,
                    date_ordered: model.date_ordered.with_timezone(&Utc),
                }
            })
            .collect())
    }
}

#[async_trait]
impl CategoryRepository for PgStore {
    async fn list(&self) -> AppResult<Vec<Category>> {
        Ok(Categories::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(category_from_entity)
            .collect())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Category>> {
        Ok(Categories::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(category_from_entity))
    }

    async fn create(&self, new: NewCategory) -> AppResult<Category> {
        let category = categories::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new.name),
            color: Set(new.color),
            icon: Set(new.icon),
        }
        .insert(&self.orm)
        .await?;
        Ok(category_from_entity(category))
    }

    async fn update(&self, id: Uuid, changes: CategoryChanges) -> AppResult<Option<Category>> {
        let Some(existing) = Categories::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: categories::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(color) = changes.color {
            active.color = Set(Some(color));
        }
        if let Some(icon) = changes.icon {
            active.icon = Set(Some(icon));
        }
        let category = active.update(&self.orm).await?;
        Ok(Some(category_from_entity(category)))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = Categories::delete_by_id(id).exec(&self.orm).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list(&self, categories: &[Uuid]) -> AppResult<Vec<Product>> {
        let mut finder = Products::find();
        if !categories.is_empty() {
            finder = finder.filter(products::Column::CategoryId.is_in(categories.to_vec()));
        }
        let rows = finder
            .order_by_asc(products::Column::DateCreated)
            .find_also_related(Categories)
            .all(&self.orm)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(product, category)| with_category(product, category))
            .collect())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(Products::find_by_id(id)
            .find_also_related(Categories)
            .one(&self.orm)
            .await?
            .map(|(product, category)| with_category(product, category)))
    }

    async fn create(&self, new: NewProduct) -> AppResult<Product> {
        let product = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new.name),
            description: Set(new.description),
            rich_description: Set(new.rich_description),
            image: Set(new.image),
            images: Set(serde_json::json!([])),
            brand: Set(new.brand),
            price: Set(new.price),
            category_id: Set(new.category_id),
            count_in_stock: Set(new.count_in_stock),
            rating: Set(new.rating),
            num_reviews: Set(new.num_reviews),
            is_featured: Set(new.is_featured),
            date_created: Set(Utc::now().into()),
        }
        .insert(&self.orm)
        .await?;
        Ok(product_from_entity(product))
    }

    async fn update(&self, id: Uuid, changes: ProductChanges) -> AppResult<Option<Product>> {
        let Some(existing) = Products::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: products::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(rich_description) = changes.rich_description {
            active.rich_description = Set(rich_description);
        }
        if let Some(image) = changes.image {
            active.image = Set(image);
        }
        if let Some(brand) = changes.brand {
            active.brand = Set(brand);
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        active.category_id = Set(changes.category_id);
        if let Some(count_in_stock) = changes.count_in_stock {
            active.count_in_stock = Set(count_in_stock);
        }
        if let Some(rating) = changes.rating {
            active.rating = Set(rating);
        }
        if let Some(num_reviews) = changes.num_reviews {
            active.num_reviews = Set(num_reviews);
        }
        if let Some(is_featured) = changes.is_featured {
            active.is_featured = Set(is_featured);
        }
        let product = active.update(&self.orm).await?;
        Ok(Some(product_from_entity(product)))
    }

    async fn set_gallery(&self, id: Uuid, images: Vec<String>) -> AppResult<Option<Product>> {
        let Some(existing) = Products::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: products::ActiveModel = existing.into();
        active.images = Set(serde_json::json!(images));
        let product = active.update(&self.orm).await?;
        Ok(Some(product_from_entity(product)))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = Products::delete_by_id(id).exec(&self.orm).await?;
        Ok(result.rows_affected > 0)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(Products::find().count(&self.orm).await?)
    }

    async fn featured(&self, limit: Option<u64>) -> AppResult<Vec<Product>> {
        let mut finder = Products::find()
            .filter(products::Column::IsFeatured.eq(true))
            .order_by_asc(products::Column::DateCreated);
        if let Some(limit) = limit {
            // The binder takes the limit as a signed 64-bit value.
            finder = finder.limit(limit.min(i64::MAX as u64));
        }
        Ok(finder
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect())
    }

    async fn prices(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(Products::find()
            .filter(products::Column::Id.is_in(ids.to_vec()))
            .all(&self.orm)
            .await?
            .into_iter()
            .map(|p| (p.id, p.price))
            .collect())
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn list(&self) -> AppResult<Vec<Order>> {
        let models = Orders::find()
            .order_by_desc(orders::Column::DateOrdered)
            .all(&self.orm)
            .await?;
        self.assemble_orders(models, false).await
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Order>> {
        let Some(model) = Orders::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        Ok(self.assemble_orders(vec![model], true).await?.pop())
    }

    async fn create(&self, new: NewOrder) -> AppResult<Order> {
        let txn = self.orm.begin().await?;

        let order = orders::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipping_address1: Set(new.shipping_address1),
            shipping_address2: Set(new.shipping_address2),
            city: Set(new.city),
            zip: Set(new.zip),
            country: Set(new.country),
            phone: Set(new.phone),
            status: Set(new.status),
            total_price: Set(new.total_price),
            user_id: Set(new.user_id),
            date_ordered: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        for (position, item) in new.items.iter().enumerate() {
            order_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                position: Set(position as i32),
            }
            .insert(&txn)
            .await?;
        }

        // Dropping the transaction on an early return above rolls it back.
        txn.commit().await?;

        let mut assembled = self.assemble_orders(vec![order], false).await?;
        assembled
            .pop()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("order vanished after commit")))
    }

    async fn update_status(&self, id: Uuid, status: String) -> AppResult<Option<Order>> {
        let Some(existing) = Orders::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: orders::ActiveModel = existing.into();
        active.status = Set(status);
        let order = active.update(&self.orm).await?;
        Ok(self.assemble_orders(vec![order], false).await?.pop())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let txn = self.orm.begin().await?;
        let removed = Orders::delete_by_id(id).exec(&txn).await?;
        if removed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }
        OrderItems::delete_many()
            .filter(order_items::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(true)
    }

    async fn find_item(&self, id: Uuid) -> AppResult<Option<OrderItem>> {
        let Some(item) = OrderItems::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut products = self.populated_products(vec![item.product_id]).await?;
        Ok(Some(OrderItem {
            id: item.id,
            quantity: item.quantity,
            product: products.remove(&item.product_id),
        }))
    }

    async fn total_sales(&self) -> AppResult<i64> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(total_price), 0)::BIGINT FROM orders")
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(Orders::find().count(&self.orm).await?)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Order>> {
        let models = Orders::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::DateOrdered)
            .all(&self.orm)
            .await?;
        self.assemble_orders(models, true).await
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn list(&self) -> AppResult<Vec<User>> {
        Ok(Users::find()
            .order_by_asc(users::Column::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(|model| credentials_from_entity(model).user)
            .collect())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(Users::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(|model| credentials_from_entity(model).user))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        Ok(Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.orm)
            .await?
            .map(credentials_from_entity))
    }

    async fn create(&self, new: NewUser) -> AppResult<User> {
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new.name),
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            phone: Set(new.phone),
            is_admin: Set(new.is_admin),
            street: Set(new.street),
            apartment: Set(new.apartment),
            zip: Set(new.zip),
            city: Set(new.city),
            country: Set(new.country),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.orm)
        .await
        .map_err(|err| match err.sql_err() {
            // A concurrent registration won the race for this email.
            Some(SqlErr::UniqueConstraintViolation(_)) => email_taken(),
            _ => AppError::OrmError(err),
        })?;
        Ok(credentials_from_entity(user).user)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = Users::delete_by_id(id).exec(&self.orm).await?;
        Ok(result.rows_affected > 0)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(Users::find().count(&self.orm).await?)
    }
}

fn category_from_entity(model: categories::Model) -> Category {
    Category {
        id: model.id,
        name: model.name,
        color: model.color,
        icon: model.icon,
    }
}

fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        rich_description: model.rich_description,
        image: model.image,
        images: serde_json::from_value(model.images).unwrap_or_default(),
        brand: model.brand,
        price: model.price,
        category: CategoryRef::Id(model.category_id),
        count_in_stock: model.count_in_stock,
        rating: model.rating,
        num_reviews: model.num_reviews,
        is_featured: model.is_featured,
        date_created: model.date_created.with_timezone(&Utc),
    }
}

fn with_category(model: products::Model, category: Option<categories::Model>) -> Product {
    let mut product = product_from_entity(model);
    if let Some(category) = category {
        product.category = CategoryRef::Populated(category_from_entity(category));
    }
    product
}

fn credentials_from_entity(model: users::Model) -> UserCredentials {
    UserCredentials {
        password_hash: model.password_hash,
        user: User {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            is_admin: model.is_admin,
            street: model.street,
            apartment: model.apartment,
            zip: model.zip,
            city: model.city,
            country: model.country,
            created_at: model.created_at.with_timezone(&Utc),
        },
    }
}
