use std::collections::HashMap;

use axum::http::StatusCode;
use uuid::Uuid;

use crate::{
    dto::orders::{
        CreateOrderRequest, OrderCount, OrderData, OrderList, TotalSales, UpdateOrderRequest,
        UserOrderList,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{NewOrder, NewOrderItem},
    response::ApiResponse,
    routes::params::parse_id,
    state::AppState,
};

pub const DEFAULT_STATUS: &str = "Pending";

/// Sum of unit price times quantity. Every item must have a known price.
pub fn compute_total(items: &[NewOrderItem], prices: &HashMap<Uuid, i64>) -> AppResult<i64> {
    items.iter().try_fold(0_i64, |total, item| {
        let price = prices.get(&item.product_id).ok_or_else(|| {
            AppError::BadRequest(format!("Invalid product {}", item.product_id))
        })?;
        price
            .checked_mul(i64::from(item.quantity))
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| AppError::BadRequest("Order total is out of range".into()))
    })
}

pub async fn list_orders(state: &AppState) -> AppResult<ApiResponse<OrderList>> {
    let order_list = state.repos.orders.list().await?;
    Ok(ApiResponse::success(OrderList { order_list }))
}

pub async fn get_order(state: &AppState, raw_id: &str) -> AppResult<ApiResponse<OrderData>> {
    let id = parse_id(raw_id, "Order")?;
    let order = state
        .repos
        .orders
        .find(id)
        .await?
        .ok_or_else(|| missing(raw_id))?;
    Ok(ApiResponse::success(OrderData { order }))
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderData>> {
    if payload.order_items.is_empty() {
        return Err(AppError::BadRequest(
            "An order needs at least one item".into(),
        ));
    }
    let required = [
        &payload.shipping_address1,
        &payload.city,
        &payload.zip,
        &payload.country,
        &payload.phone,
    ];
    if required.iter().any(|value| value.trim().is_empty()) {
        return Err(AppError::BadRequest(
            "shippingAddress1, city, zip, country and phone are required".into(),
        ));
    }

    let items: Vec<NewOrderItem> = payload
        .order_items
        .iter()
        .map(|item| {
            if item.quantity <= 0 {
                return Err(AppError::BadRequest(
                    "Quantity must be a positive integer".into(),
                ));
            }
            Ok(NewOrderItem {
                product_id: item.product,
                quantity: item.quantity,
            })
        })
        .collect::<AppResult<_>>()?;

    let mut product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();
    let prices = state.repos.products.prices(&product_ids).await?;
    let total_price = compute_total(&items, &prices)?;

    let status = payload
        .status
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STATUS.to_string());

    let order = state
        .repos
        .orders
        .create(NewOrder {
            items,
            shipping_address1: payload.shipping_address1,
            shipping_address2: payload.shipping_address2,
            city: payload.city,
            zip: payload.zip,
            country: payload.country,
            phone: payload.phone,
            status,
            total_price,
            user_id: Some(payload.user.unwrap_or(user.user_id)),
        })
        .await?;

    tracing::info!(order_id = %order.id, total_price, "order created");
    Ok(ApiResponse::success(OrderData { order }))
}

pub async fn update_order(
    state: &AppState,
    raw_id: &str,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<OrderData>> {
    let id = parse_id(raw_id, "Order")?;
    let order = state
        .repos
        .orders
        .update_status(id, payload.status)
        .await?
        .ok_or_else(|| missing(raw_id))?;
    Ok(ApiResponse::success(OrderData { order }))
}

/// Deletes the order together with its items.
pub async fn delete_order(state: &AppState, raw_id: &str) -> AppResult<ApiResponse<()>> {
    let id = parse_id(raw_id, "Order")?;
    if !state.repos.orders.delete(id).await? {
        return Err(missing(raw_id));
    }
    tracing::info!(order_id = %id, "order deleted");
    Ok(ApiResponse::done("the Order deleted"))
}

pub async fn total_sales(state: &AppState) -> AppResult<ApiResponse<TotalSales>> {
    let total_sales = state.repos.orders.total_sales().await?;
    Ok(ApiResponse::success(TotalSales { total_sales }))
}

pub async fn count_orders(state: &AppState) -> AppResult<ApiResponse<OrderCount>> {
    let order_count = state.repos.orders.count().await?;
    Ok(ApiResponse::success(OrderCount { order_count }))
}

pub async fn user_orders(
    state: &AppState,
    raw_user_id: &str,
) -> AppResult<ApiResponse<UserOrderList>> {
    let user_id = parse_id(raw_user_id, "User")?;
    let user_order_list = state.repos.orders.list_for_user(user_id).await?;
    Ok(ApiResponse::success(UserOrderList { user_order_list }))
}

fn missing(raw_id: &str) -> AppError {
    AppError::not_found(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("The Order with the given ID ({raw_id}) was not Found"),
    )
}
