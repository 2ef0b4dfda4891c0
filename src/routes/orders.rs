use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::orders::{
        CreateOrderRequest, OrderCount, OrderData, OrderList, TotalSales, UpdateOrderRequest,
        UserOrderList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::ApiJson,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/{id}", get(get_order).put(update_order).delete(delete_order))
        .route("/get/totalSales", get(total_sales))
        .route("/get/count", get(count_orders))
        .route("/get/usersorders/{user_id}", get(user_orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "All orders, newest first", body = ApiResponse<OrderList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = String, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items, products and user", body = ApiResponse<OrderData>),
        (status = 500, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<OrderData>>> {
    let resp = order_service::get_order(&state, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderData>),
        (status = 400, description = "Unknown product or invalid quantity"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderData>>)> {
    let resp = order_service::create_order(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = String, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderData>),
        (status = 500, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderData>>> {
    let resp = order_service::update_order(&state, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = String, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order and its items deleted"),
        (status = 500, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = order_service::delete_order(&state, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/get/totalSales",
    responses(
        (status = 200, description = "Sum of all order totals", body = ApiResponse<TotalSales>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn total_sales(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<TotalSales>>> {
    let resp = order_service::total_sales(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/get/count",
    responses(
        (status = 200, description = "Number of orders", body = ApiResponse<OrderCount>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn count_orders(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<OrderCount>>> {
    let resp = order_service::count_orders(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/get/usersorders/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Orders placed by the user", body = ApiResponse<UserOrderList>),
        (status = 400, description = "Malformed user id"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn user_orders(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ApiResponse<UserOrderList>>> {
    let resp = order_service::user_orders(&state, &user_id).await?;
    Ok(Json(resp))
}
