// handlers/elevated/users.rs - /api/v1/users[/:id], admin only

use axum::extract::{Query, State};
use axum::Extension;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ListResponse};
use crate::app::AppState;
use crate::auth::hash_password;
use crate::database::models::{BootcampFilter, NewUser, User, UserFilter, UserPatch};
use crate::database::ListQuery;
use crate::error::ApiError;
use crate::handlers::load_user;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::policy::Role;
use crate::types::ResourceKind;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ListResponse, ApiError> {
    let query = ListQuery::<UserFilter>::parse(&params)?;
    let page = state.store.list_users(&query).await?;
    ListResponse::from_page(page, &query)
}

pub async fn get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<User> {
    Ok(ApiResponse::success(load_user(&state, id).await?))
}

/// Admins may create accounts with any role
pub async fn create(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ApiJson(input): ApiJson<NewUser>,
) -> ApiResult<User> {
    input.validate()?;

    let password_hash = hash_password(&input.password)?;
    let user = state
        .store
        .create_user(input.into_user(Uuid::new_v4(), password_hash, Utc::now()))
        .await?;

    info!("Admin {} created user {} with role {}", admin.user.id, user.id, user.role);
    Ok(ApiResponse::created(user))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> ApiResult<User> {
    patch.validate()?;
    let demoting = patch.role == Some(Role::User);
    let user = state
        .store
        .update_user(id, patch)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(ResourceKind::User, id))?;

    if demoting {
        let owned = owned_bootcamps(&state, id).await?;
        if owned > 1 {
            // Creation is the only place the one-bootcamp rule is checked
            warn!("User {} demoted to user while owning {} bootcamps", id, owned);
        }
    }

    info!("Admin {} updated user {}", admin.user.id, id);
    Ok(ApiResponse::success(user))
}

async fn owned_bootcamps(state: &AppState, owner_id: Uuid) -> Result<u64, ApiError> {
    let query = ListQuery {
        filter: BootcampFilter {
            owner_id: Some(owner_id),
            ..Default::default()
        },
        limit: 1,
        ..Default::default()
    };
    Ok(state.store.list_bootcamps(&query).await?.total)
}

/// Bootcamps of a deleted user stay behind without an owner
pub async fn delete(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    if !state.store.delete_user(id).await? {
        return Err(ApiError::resource_not_found(ResourceKind::User, id));
    }

    info!("Admin {} deleted user {}", admin.user.id, id);
    Ok(ApiResponse::success(json!({})))
}
