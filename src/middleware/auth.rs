use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Method, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    services::auth_service::{decode_token, is_revoked},
    state::AppState,
};

pub const UPLOADS_PATH: &str = "/public/uploads";

/// Caller identity taken from verified token claims.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(AppError::unauthorized)
    }
}

/// Requests that skip token verification.
pub fn is_public(api_prefix: &str, method: &Method, path: &str) -> bool {
    let safe = method == Method::GET || method == Method::OPTIONS;
    let under = |base: &str| {
        path.strip_prefix(base)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    };

    if path == format!("{api_prefix}/users/login") || path == format!("{api_prefix}/users/register")
    {
        return true;
    }

    if !safe {
        return false;
    }

    under(UPLOADS_PATH)
        || under(&format!("{api_prefix}/products"))
        || under(&format!("{api_prefix}/categories"))
        || path == "/health"
        || under("/docs")
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_public(&state.config.api_prefix, req.method(), req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(AppError::unauthorized)?;

    let claims = decode_token(&state.config.jwt_secret, token).map_err(|err| {
        tracing::debug!(error = %err, "token rejected");
        AppError::unauthorized()
    })?;

    if is_revoked(&claims) {
        tracing::debug!(user_id = %claims.user_id, "token revoked by policy");
        return Err(AppError::unauthorized());
    }

    let user_id = Uuid::parse_str(&claims.user_id).map_err(|_| AppError::unauthorized())?;

    req.extensions_mut().insert(AuthUser {
        user_id,
        is_admin: claims.is_admin,
    });

    Ok(next.run(req).await)
}
