// handlers/protected/account.rs - GET /api/v1/auth/me, PUT /api/v1/auth/updatedetails,
// PUT /api/v1/auth/updatepassword

use axum::extract::State;
use axum::Extension;
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::ApiJson;
use crate::app::AppState;
use crate::auth::{hash_password, verify_password};
use crate::database::models::{user::check_password, User, UserPatch, ValidationError};
use crate::error::ApiError;
use crate::handlers::public::session::{token_response, TokenData};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::types::ResourceKind;

/// Fields a user may change on their own account; the role is not one of them
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetailsUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordUpdate {
    #[serde(alias = "current_password")]
    pub current_password: String,
    #[serde(alias = "new_password")]
    pub new_password: String,
}

/// GET /api/v1/auth/me
pub async fn me(Extension(auth): Extension<AuthUser>) -> ApiResult<User> {
    Ok(ApiResponse::success(auth.user))
}

/// PUT /api/v1/auth/updatedetails
pub async fn update_details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<DetailsUpdate>,
) -> ApiResult<User> {
    let patch = UserPatch {
        name: input.name,
        email: input.email,
        role: None,
    };
    patch.validate()?;

    let id = auth.user.id;
    let user = state
        .store
        .update_user(id, patch)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(ResourceKind::User, id))?;

    info!("User {} updated their details", id);
    Ok(ApiResponse::success(user))
}

/// PUT /api/v1/auth/updatepassword - returns a fresh token
pub async fn update_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<PasswordUpdate>,
) -> ApiResult<TokenData> {
    if !verify_password(&input.current_password, &auth.user.password_hash) {
        warn!("User {} gave a wrong current password", auth.user.id);
        return Err(ApiError::unauthorized("Password is incorrect"));
    }

    let mut errors = ValidationError::default();
    check_password(&mut errors, "newPassword", &input.new_password);
    errors.into_result()?;

    let password_hash = hash_password(&input.new_password)?;
    if !state.store.set_password(auth.user.id, &password_hash).await? {
        return Err(ApiError::resource_not_found(ResourceKind::User, auth.user.id));
    }

    info!("User {} changed their password", auth.user.id);
    token_response(&state, &auth.user)
}
