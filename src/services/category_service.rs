use axum::http::StatusCode;

use crate::{
    dto::categories::{CategoryData, CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
    error::{AppError, AppResult},
    models::{CategoryChanges, NewCategory},
    response::ApiResponse,
    routes::params::parse_id,
    state::AppState,
};

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let category_list = state.repos.categories.list().await?;
    Ok(ApiResponse::success(CategoryList { category_list }))
}

pub async fn get_category(state: &AppState, raw_id: &str) -> AppResult<ApiResponse<CategoryData>> {
    let id = parse_id(raw_id, "Category")?;
    let category = state
        .repos
        .categories
        .find(id)
        .await?
        .ok_or_else(|| missing(raw_id))?;
    Ok(ApiResponse::success(CategoryData { category }))
}

pub async fn create_category(
    state: &AppState,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<CategoryData>> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Category name is required".into()));
    }
    let category = state
        .repos
        .categories
        .create(NewCategory {
            name,
            color: payload.color,
            icon: payload.icon,
        })
        .await?;
    tracing::info!(category_id = %category.id, "category created");
    Ok(ApiResponse::success(CategoryData { category }))
}

pub async fn update_category(
    state: &AppState,
    raw_id: &str,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<CategoryData>> {
    let id = parse_id(raw_id, "Category")?;
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("Category name is required".into()));
    }
    let category = state
        .repos
        .categories
        .update(
            id,
            CategoryChanges {
                name: payload.name.map(|n| n.trim().to_string()),
                color: payload.color,
                icon: payload.icon,
            },
        )
        .await?
        .ok_or_else(|| missing(raw_id))?;
    Ok(ApiResponse::success(CategoryData { category }))
}

/// Succeeds for any well-formed id, whether or not a category was removed.
/// Products keep pointing at the deleted category.
pub async fn delete_category(state: &AppState, raw_id: &str) -> AppResult<ApiResponse<()>> {
    let id = parse_id(raw_id, "Category")?;
    let removed = state.repos.categories.delete(id).await?;
    tracing::info!(category_id = %id, removed, "category delete");
    Ok(ApiResponse::done("category has been deleted"))
}

fn missing(raw_id: &str) -> AppError {
    AppError::not_found(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("The Category with the given ID ({raw_id}) was not Found"),
    )
}
