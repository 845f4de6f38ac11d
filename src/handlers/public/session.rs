// handlers/public/session.rs - POST /api/v1/auth/register, POST /api/v1/auth/login, GET /api/v1/auth/logout

use axum::extract::State;
use axum::http::HeaderValue;
use chrono::Utc;
use cookie::Cookie;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::ApiJson;
use crate::app::AppState;
use crate::auth::{cleared_cookie, generate_jwt, hash_password, session_cookie, verify_password};
use crate::database::models::{user::normalize_email, NewUser, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::policy::Role;

#[derive(Debug, Serialize)]
pub struct TokenData {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issue a token for `user`, returned in the body and as the session cookie
pub(crate) fn token_response(state: &AppState, user: &User) -> ApiResult<TokenData> {
    let token = generate_jwt(&user.principal(), &state.config.security)?;
    let cookie = cookie_header(session_cookie(&token, &state.config.security))?;
    Ok(ApiResponse::success(TokenData { token }).with_cookie(cookie))
}

fn cookie_header(cookie: Cookie<'_>) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&cookie.to_string()).map_err(|e| {
        tracing::error!("Unencodable session cookie: {}", e);
        ApiError::internal_server_error("Failed to build session cookie")
    })
}

/// POST /api/v1/auth/register - create a `user` account and sign it in
pub async fn register(State(state): State<AppState>, ApiJson(input): ApiJson<NewUser>) -> ApiResult<TokenData> {
    if input.role == Some(Role::Admin) {
        warn!("Registration attempted with admin role for {}", input.email);
        return Err(ApiError::forbidden("Registration cannot assign the admin role"));
    }
    input.validate()?;

    let password_hash = hash_password(&input.password)?;
    let user = input.into_user(Uuid::new_v4(), password_hash, Utc::now());
    let user = state.store.create_user(user).await?;

    info!("Registered user {} ({})", user.id, user.email);
    token_response(&state, &user)
}

/// POST /api/v1/auth/login
pub async fn login(State(state): State<AppState>, ApiJson(input): ApiJson<LoginRequest>) -> ApiResult<TokenData> {
    if input.email.trim().is_empty() || input.password.is_empty() {
        return Err(ApiError::bad_request("Please provide an email and password"));
    }

    let user = state.store.find_user_by_email(&normalize_email(&input.email)).await?;
    let Some(user) = user.filter(|user| verify_password(&input.password, &user.password_hash)) else {
        warn!("Failed login for {}", input.email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    info!("User {} logged in", user.id);
    token_response(&state, &user)
}

/// GET /api/v1/auth/logout - overwrite the session cookie
pub async fn logout(State(state): State<AppState>) -> ApiResult<Value> {
    let cookie = cookie_header(cleared_cookie(&state.config.security))?;
    Ok(ApiResponse::success(json!({})).with_cookie(cookie))
}
