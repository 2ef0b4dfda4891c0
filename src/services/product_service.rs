use axum::{extract::Multipart, http::StatusCode};

use crate::{
    dto::products::{
        CreateProductForm, FeaturedProducts, ProductCount, ProductData, ProductList, ProductQuery,
        UpdateProductRequest,
    },
    error::{AppError, AppResult},
    models::{NewProduct, ProductChanges},
    response::ApiResponse,
    routes::params::{parse_id, parse_id_list},
    services::upload_service::{PendingImage, public_url, read_image, store_image},
    state::AppState,
};

pub const MAX_GALLERY_IMAGES: usize = 10;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let categories = match query.categories.as_deref() {
        Some(raw) => parse_id_list(raw, "Category")?,
        None => Vec::new(),
    };
    let products = state.repos.products.list(&categories).await?;
    Ok(ApiResponse::success(ProductList { products }))
}

pub async fn get_product(state: &AppState, raw_id: &str) -> AppResult<ApiResponse<ProductData>> {
    let id = parse_id(raw_id, "Product")?;
    let product = state.repos.products.find(id).await?.ok_or_else(|| {
        AppError::not_found(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("The Product given by ID ({raw_id}) was not Found"),
        )
    })?;
    Ok(ApiResponse::success(ProductData { product }))
}

/// Multipart create: text parts plus one `image` file.
pub async fn create_product(
    state: &AppState,
    host: &str,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<ProductData>> {
    let mut form = CreateProductForm::default();
    let mut image: Option<PendingImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            image = Some(read_image(field).await?);
            continue;
        }
        let value = field.text().await.map_err(bad_multipart)?;
        form.set_field(&name, &value)?;
    }

    let category_id = form
        .category
        .ok_or_else(|| AppError::BadRequest("Invalid Category".into()))?;
    if state.repos.categories.find(category_id).await?.is_none() {
        return Err(AppError::BadRequest("Invalid Category".into()));
    }
    let image = image.ok_or_else(|| AppError::BadRequest("No File".into()))?;

    if form.name.is_empty() {
        return Err(AppError::BadRequest("Product name is required".into()));
    }
    check_amounts(Some(form.price), Some(form.count_in_stock))?;

    let file_name = store_image(&state.config.upload_dir, &image, 0).await?;
    let product = state
        .repos
        .products
        .create(NewProduct {
            name: form.name,
            description: form.description,
            rich_description: form.rich_description,
            image: public_url(host, &file_name),
            brand: form.brand,
            price: form.price,
            category_id,
            count_in_stock: form.count_in_stock,
            rating: form.rating,
            num_reviews: form.num_reviews,
            is_featured: form.is_featured,
        })
        .await?;

    tracing::info!(product_id = %product.id, image = %file_name, "product created");
    Ok(ApiResponse::success(ProductData { product }))
}

pub async fn update_product(
    state: &AppState,
    raw_id: &str,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductData>> {
    let id = parse_id(raw_id, "Product")?;
    let category_id = payload
        .category
        .ok_or_else(|| AppError::BadRequest("Invalid Category".into()))?;
    if state.repos.categories.find(category_id).await?.is_none() {
        return Err(AppError::BadRequest("Invalid Category".into()));
    }
    check_amounts(payload.price, payload.count_in_stock)?;

    let product = state
        .repos
        .products
        .update(
            id,
            ProductChanges {
                name: payload.name,
                description: payload.description,
                rich_description: payload.rich_description,
                image: payload.image,
                brand: payload.brand,
                price: payload.price,
                category_id,
                count_in_stock: payload.count_in_stock,
                rating: payload.rating,
                num_reviews: payload.num_reviews,
                is_featured: payload.is_featured,
            },
        )
        .await?
        .ok_or_else(|| product_missing(raw_id))?;
    Ok(ApiResponse::success(ProductData { product }))
}

pub async fn delete_product(state: &AppState, raw_id: &str) -> AppResult<ApiResponse<()>> {
    let id = parse_id(raw_id, "Product")?;
    if !state.repos.products.delete(id).await? {
        return Err(AppError::not_found(
            StatusCode::BAD_REQUEST,
            format!("The Product given by id ({raw_id}) was not Found"),
        ));
    }
    tracing::info!(product_id = %id, "product deleted");
    Ok(ApiResponse::done("Product has been deleted"))
}

pub async fn count_products(state: &AppState) -> AppResult<ApiResponse<ProductCount>> {
    let count = state.repos.products.count().await?;
    Ok(ApiResponse::success(ProductCount { count }))
}

/// Parses the featured count. `0` means no limit, and anything beyond what
/// the store can bind is capped at `i64::MAX`.
pub fn featured_limit(raw_count: &str) -> AppResult<Option<u64>> {
    let count: u64 = raw_count
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid count".into()))?;
    Ok((count > 0).then(|| count.min(i64::MAX as u64)))
}

pub async fn featured_products(
    state: &AppState,
    raw_count: &str,
) -> AppResult<ApiResponse<FeaturedProducts>> {
    let limit = featured_limit(raw_count)?;
    let product_featured = state.repos.products.featured(limit).await?;
    Ok(ApiResponse::success(FeaturedProducts { product_featured }))
}

/// Replaces the gallery with the uploaded `images` parts. Every file is
/// type-checked before any of them is written.
pub async fn update_gallery(
    state: &AppState,
    host: &str,
    raw_id: &str,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<ProductData>> {
    let id = parse_id(raw_id, "Product")?;

    let mut images = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("images") {
            continue;
        }
        if images.len() == MAX_GALLERY_IMAGES {
            return Err(AppError::BadRequest(format!(
                "At most {MAX_GALLERY_IMAGES} images can be uploaded"
            )));
        }
        images.push(read_image(field).await?);
    }

    if state.repos.products.find(id).await?.is_none() {
        return Err(product_missing(raw_id));
    }

    let mut paths = Vec::with_capacity(images.len());
    for (index, image) in images.iter().enumerate() {
        let file_name = store_image(&state.config.upload_dir, image, index).await?;
        paths.push(public_url(host, &file_name));
    }

    let product = state
        .repos
        .products
        .set_gallery(id, paths)
        .await?
        .ok_or_else(|| product_missing(raw_id))?;
    tracing::info!(product_id = %id, images = images.len(), "gallery updated");
    Ok(ApiResponse::success(ProductData { product }))
}

fn check_amounts(price: Option<i64>, count_in_stock: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if count_in_stock.is_some_and(|c| c < 0) {
        return Err(AppError::BadRequest(
            "countInStock must not be negative".into(),
        ));
    }
    Ok(())
}

fn product_missing(raw_id: &str) -> AppError {
    AppError::not_found(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("The Product with the given ID ({raw_id}) was not Found"),
    )
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Upload failed: {err}"))
}
