use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;

use crate::{
    config::AppConfig,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest, UserData},
    error::{AppError, AppResult},
    models::{NewUser, User},
    repository::email_taken,
    response::ApiResponse,
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn issue_token(config: &AppConfig, user: &User) -> AppResult<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(config.token_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        user_id: user.id.to_string(),
        is_admin: user.is_admin,
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Signature and expiry check only; the revocation rule is applied separately.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
}

/// Structurally valid tokens are still refused unless they carry the admin flag.
pub fn is_revoked(claims: &Claims) -> bool {
    !claims.is_admin
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<UserData>> {
    let email = payload.email.trim().to_lowercase();
    if payload.name.trim().is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "name, email and password are required".into(),
        ));
    }

    if state.repos.users.find_by_email(&email).await?.is_some() {
        return Err(email_taken());
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .repos
        .users
        .create(NewUser {
            name: payload.name,
            email,
            password_hash,
            phone: payload.phone,
            is_admin: payload.is_admin,
            street: payload.street,
            apartment: payload.apartment,
            zip: payload.zip,
            city: payload.city,
            country: payload.country,
        })
        .await?;

    tracing::info!(user_id = %user.id, is_admin = user.is_admin, "user registered");
    Ok(ApiResponse::success(UserData { user }))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let email = payload.email.trim().to_lowercase();
    let Some(credentials) = state.repos.users.find_by_email(&email).await? else {
        return Err(AppError::BadRequest("The user was not Found".into()));
    };

    if !verify_password(&payload.password, &credentials.password_hash)? {
        return Err(AppError::BadRequest("Invalid Credential".into()));
    }

    let token = issue_token(&state.config, &credentials.user)?;
    tracing::info!(user_id = %credentials.user.id, "user logged in");

    Ok(ApiResponse::success(LoginResponse {
        user: credentials.user.email,
        token,
    }))
}
