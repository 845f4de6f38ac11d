// handlers/mod.rs - Handlers grouped by access tier
//
// Public (no auth) → Protected (JWT auth) → Elevated (admin role)
pub mod elevated;
pub mod protected;
pub mod public;

use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Bootcamp, Course, User};
use crate::error::ApiError;
use crate::types::ResourceKind;

pub(crate) async fn load_bootcamp(state: &AppState, id: Uuid) -> Result<Bootcamp, ApiError> {
    state
        .store
        .find_bootcamp(id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(ResourceKind::Bootcamp, id))
}

pub(crate) async fn load_course(state: &AppState, id: Uuid) -> Result<Course, ApiError> {
    state
        .store
        .find_course(id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(ResourceKind::Course, id))
}

pub(crate) async fn load_user(state: &AppState, id: Uuid) -> Result<User, ApiError> {
    state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(ResourceKind::User, id))
}
