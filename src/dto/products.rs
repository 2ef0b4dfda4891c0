use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Product,
};

/// Text fields of the multipart product form. The `image` file part is read
/// separately.
#[derive(Debug, Default, ToSchema)]
pub struct CreateProductForm {
    pub name: String,
    pub description: String,
    pub rich_description: String,
    pub brand: String,
    pub price: i64,
    pub category: Option<Uuid>,
    pub count_in_stock: i32,
    pub rating: f64,
    pub num_reviews: i32,
    pub is_featured: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rich_description: Option<String>,
    pub image: Option<String>,
    pub brand: Option<String>,
    pub price: Option<i64>,
    pub category: Option<Uuid>,
    pub count_in_stock: Option<i32>,
    pub rating: Option<f64>,
    pub num_reviews: Option<i32>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductQuery {
    /// Comma separated category ids.
    pub categories: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductData {
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedProducts {
    pub product_featured: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductCount {
    pub count: u64,
}

impl CreateProductForm {
    /// Applies one text part of the multipart form. Unknown parts are ignored.
    pub fn set_field(&mut self, name: &str, value: &str) -> AppResult<()> {
        let value = value.trim();
        let invalid = || AppError::BadRequest(format!("Invalid value for {name}"));
        match name {
            "name" => self.name = value.to_string(),
            "description" => self.description = value.to_string(),
            "richDescription" => self.rich_description = value.to_string(),
            "brand" => self.brand = value.to_string(),
            "price" => self.price = value.parse().map_err(|_| invalid())?,
            // An unparsable id is reported as an invalid category later on.
            "category" => self.category = Uuid::parse_str(value).ok(),
            "countInStock" => self.count_in_stock = value.parse().map_err(|_| invalid())?,
            "rating" => self.rating = value.parse().map_err(|_| invalid())?,
            "numReviews" => self.num_reviews = value.parse().map_err(|_| invalid())?,
            "isFeatured" => self.is_featured = value.parse().map_err(|_| invalid())?,
            _ => {}
        }
        Ok(())
    }
}

/// Shape of the gallery upload form: each `images` part carries one file.
#[derive(Debug, ToSchema)]
pub struct GalleryForm {
    pub images: Vec<String>,
}
