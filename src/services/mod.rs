pub mod auth_service;
pub mod category_service;
pub mod order_service;
pub mod product_service;
pub mod upload_service;
pub mod user_service;
