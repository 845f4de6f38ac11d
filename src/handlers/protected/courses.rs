// handlers/protected/courses.rs - POST /api/v1/bootcamps/:id/courses, PUT/DELETE /api/v1/courses/:id
//
// Courses have no owner of their own: the parent bootcamp's owner (or an
// admin) may change them.

use axum::extract::State;
use axum::Extension;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath};
use crate::app::AppState;
use crate::database::models::{Course, CoursePatch, NewCourse};
use crate::error::{enforce, ApiError};
use crate::handlers::{load_bootcamp, load_course};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::policy::{authorize_mutation, InheritedOwnership, Principal};
use crate::types::{Operation, ResourceKind};

/// POST /api/v1/bootcamps/:id/courses - adding a course changes the bootcamp
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(bootcamp_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<NewCourse>,
) -> ApiResult<Course> {
    let bootcamp = load_bootcamp(&state, bootcamp_id).await?;
    let principal = auth.principal();
    enforce(authorize_mutation(&principal, &bootcamp), &principal, ResourceKind::Course, Operation::Create)?;

    input.validate()?;
    let course = state.store.create_course(bootcamp_id, principal.id, input).await?;

    info!("User {} added course {} to bootcamp {}", principal.id, course.id, bootcamp_id);
    Ok(ApiResponse::created(course))
}

/// PUT /api/v1/courses/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<CoursePatch>,
) -> ApiResult<Course> {
    let course = load_course(&state, id).await?;
    let principal = auth.principal();
    authorize_course(&state, &principal, &course, Operation::Update).await?;

    patch.validate()?;
    let updated = state
        .store
        .update_course(id, patch)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(ResourceKind::Course, id))?;

    info!("User {} updated course {}", principal.id, id);
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/courses/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    let course = load_course(&state, id).await?;
    let principal = auth.principal();
    authorize_course(&state, &principal, &course, Operation::Delete).await?;

    if !state.store.delete_course(id).await? {
        return Err(ApiError::resource_not_found(ResourceKind::Course, id));
    }

    info!("User {} deleted course {}", principal.id, id);
    Ok(ApiResponse::success(json!({})))
}

/// A course whose bootcamp cannot be resolved has no owner and is locked
async fn authorize_course(
    state: &AppState,
    principal: &Principal,
    course: &Course,
    operation: Operation,
) -> Result<(), ApiError> {
    let parent = state.store.find_bootcamp(course.bootcamp_id).await?;
    let view = InheritedOwnership::through(course.id, parent.as_ref());
    enforce(authorize_mutation(principal, &view), principal, ResourceKind::Course, operation)
}
