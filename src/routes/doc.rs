use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{auth, categories, orders, products},
    models::{Category, CategoryRef, Order, OrderItem, OrderItemEntry, Product, User, UserRef},
    routes::{
        categories as category_routes, health, orders as order_routes,
        products as product_routes, users as user_routes,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        product_routes::count_products,
        product_routes::featured_products,
        product_routes::update_gallery,
        category_routes::list_categories,
        category_routes::get_category,
        category_routes::create_category,
        category_routes::update_category,
        category_routes::delete_category,
        order_routes::list_orders,
        order_routes::get_order,
        order_routes::create_order,
        order_routes::update_order,
        order_routes::delete_order,
        order_routes::total_sales,
        order_routes::count_orders,
        order_routes::user_orders,
        user_routes::list_users,
        user_routes::get_user,
        user_routes::delete_user,
        user_routes::register,
        user_routes::login,
        user_routes::count_users,
    ),
    components(
        schemas(
            Category,
            CategoryRef,
            Product,
            User,
            UserRef,
            Order,
            OrderItem,
            OrderItemEntry,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::LoginResponse,
            categories::CreateCategoryRequest,
            categories::UpdateCategoryRequest,
            products::CreateProductForm,
            products::GalleryForm,
            products::UpdateProductRequest,
            orders::CreateOrderRequest,
            orders::OrderItemRequest,
            orders::UpdateOrderRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Product catalogue and image uploads"),
        (name = "Categories", description = "Product categories"),
        (name = "Orders", description = "Orders and sales figures"),
        (name = "Users", description = "Accounts and authentication"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
