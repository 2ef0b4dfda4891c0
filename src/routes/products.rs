use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
};

use crate::{
    dto::products::{
        CreateProductForm, FeaturedProducts, GalleryForm, ProductCount, ProductData, ProductList,
        ProductQuery, UpdateProductRequest,
    },
    error::AppResult,
    response::ApiResponse,
    routes::params::{ApiJson, request_host},
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/get/count", get(count_products))
        .route("/get/featured/{count}", get(featured_products))
        .route("/gallery-images/{id}", put(update_gallery))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(
        ("categories" = Option<String>, Query, description = "Comma separated category ids"),
    ),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>),
        (status = 400, description = "Malformed category id"),
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<ProductData>),
        (status = 500, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<ProductData>>> {
    let resp = product_service::get_product(&state, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body(
        content = CreateProductForm,
        content_type = "multipart/form-data",
        description = "Product fields plus one `image` file part (png or jpeg)"
    ),
    responses(
        (status = 201, description = "Create product", body = ApiResponse<ProductData>),
        (status = 400, description = "Invalid category, missing file or invalid image type"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<ProductData>>)> {
    let host = request_host(&headers);
    let resp = product_service::create_product(&state, &host, multipart).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<ProductData>),
        (status = 400, description = "Malformed id or invalid category"),
        (status = 500, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<ProductData>>> {
    let resp = product_service::update_product(&state, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 400, description = "Malformed id or product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = product_service::delete_product(&state, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/get/count",
    responses(
        (status = 200, description = "Number of products", body = ApiResponse<ProductCount>)
    ),
    tag = "Products"
)]
pub async fn count_products(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ProductCount>>> {
    let resp = product_service::count_products(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/get/featured/{count}",
    params(("count" = u64, Path, description = "Maximum number of products, 0 for all")),
    responses(
        (status = 200, description = "Featured products", body = ApiResponse<FeaturedProducts>),
        (status = 400, description = "Malformed count"),
    ),
    tag = "Products"
)]
pub async fn featured_products(
    State(state): State<AppState>,
    Path(count): Path<String>,
) -> AppResult<Json<ApiResponse<FeaturedProducts>>> {
    let resp = product_service::featured_products(&state, &count).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/gallery-images/{id}",
    params(("id" = String, Path, description = "Product ID")),
    request_body(
        content = GalleryForm,
        content_type = "multipart/form-data",
        description = "Up to 10 `images` file parts (png or jpeg)"
    ),
    responses(
        (status = 200, description = "Gallery replaced", body = ApiResponse<ProductData>),
        (status = 400, description = "Malformed id, too many files or invalid image type"),
        (status = 500, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_gallery(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ProductData>>> {
    let host = request_host(&headers);
    let resp = product_service::update_gallery(&state, &host, &id, multipart).await?;
    Ok(Json(resp))
}
