use axum::http::StatusCode;

use crate::{
    dto::auth::{UserCount, UserData, UserList},
    error::{AppError, AppResult},
    response::ApiResponse,
    routes::params::parse_id,
    state::AppState,
};

pub async fn list_users(state: &AppState) -> AppResult<ApiResponse<UserList>> {
    let users = state.repos.users.list().await?;
    Ok(ApiResponse::success(UserList { users }))
}

pub async fn get_user(state: &AppState, raw_id: &str) -> AppResult<ApiResponse<UserData>> {
    let id = parse_id(raw_id, "User")?;
    let user = state.repos.users.find(id).await?.ok_or_else(|| {
        AppError::not_found(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("The user with the given ID ({raw_id}) was not Found"),
        )
    })?;
    Ok(ApiResponse::success(UserData { user }))
}

pub async fn delete_user(state: &AppState, raw_id: &str) -> AppResult<ApiResponse<()>> {
    let id = parse_id(raw_id, "User")?;
    if !state.repos.users.delete(id).await? {
        return Err(AppError::not_found(StatusCode::BAD_REQUEST, "User not Found"));
    }
    tracing::info!(user_id = %id, "user deleted");
    Ok(ApiResponse::done("User Deleted"))
}

pub async fn count_users(state: &AppState) -> AppResult<ApiResponse<UserCount>> {
    let user_count = state.repos.users.count().await?;
    Ok(ApiResponse::success(UserCount { user_count }))
}
