// handlers/protected/bootcamps.rs - POST /api/v1/bootcamps, PUT/DELETE /api/v1/bootcamps/:id,
// PUT /api/v1/bootcamps/:id/photo

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Extension;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath};
use crate::app::AppState;
use crate::database::models::{Bootcamp, BootcampPatch, NewBootcamp};
use crate::error::{enforce, ApiError};
use crate::handlers::load_bootcamp;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::policy::{authorize_creation, authorize_mutation};
use crate::types::{Operation, ResourceKind};
use crate::uploads::{PhotoFile, UploadError};

/// Multipart field holding the photo
const PHOTO_FIELD: &str = "file";

/// POST /api/v1/bootcamps - a user may publish one bootcamp, admins any number
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<NewBootcamp>,
) -> ApiResult<Bootcamp> {
    let principal = auth.principal();

    // Held across lookup, decision and insert
    let _guard = state.creation_locks.acquire(principal.id).await;

    let existing = state.store.find_bootcamp_by_owner(principal.id).await?;
    let decision = authorize_creation(&principal, existing.as_ref());
    debug!("Creation by {}: {:?}", principal.id, decision);
    enforce(decision, &principal, ResourceKind::Bootcamp, Operation::Create)?;

    input.validate()?;
    let bootcamp = state.store.create_bootcamp(principal.id, input).await?;

    info!("User {} created bootcamp {}", principal.id, bootcamp.id);
    Ok(ApiResponse::created(bootcamp))
}

/// PUT /api/v1/bootcamps/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<BootcampPatch>,
) -> ApiResult<Bootcamp> {
    let bootcamp = load_bootcamp(&state, id).await?;
    let principal = auth.principal();
    enforce(authorize_mutation(&principal, &bootcamp), &principal, ResourceKind::Bootcamp, Operation::Update)?;

    patch.validate()?;
    let updated = state
        .store
        .update_bootcamp(id, patch)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(ResourceKind::Bootcamp, id))?;

    info!("User {} updated bootcamp {}", principal.id, id);
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/bootcamps/:id - also removes the bootcamp's courses
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    let bootcamp = load_bootcamp(&state, id).await?;
    let principal = auth.principal();
    enforce(authorize_mutation(&principal, &bootcamp), &principal, ResourceKind::Bootcamp, Operation::Delete)?;

    if !state.store.delete_bootcamp(id).await? {
        return Err(ApiError::resource_not_found(ResourceKind::Bootcamp, id));
    }

    info!("User {} deleted bootcamp {}", principal.id, id);
    Ok(ApiResponse::success(json!({})))
}

/// PUT /api/v1/bootcamps/:id/photo - multipart upload, authorized like an update
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Bootcamp> {
    let bootcamp = load_bootcamp(&state, id).await?;
    let principal = auth.principal();
    enforce(authorize_mutation(&principal, &bootcamp), &principal, ResourceKind::Bootcamp, Operation::Upload)?;

    // The body is only inspected once the caller is known to be allowed
    let multipart = multipart.map_err(|_| ApiError::from(UploadError::MissingFile))?;
    let file = read_photo(multipart).await?;
    file.validate(state.config.uploads.max_file_bytes)?;

    let photo = state.uploader.store_photo(id, &file).await?;
    let Some(updated) = state.store.set_bootcamp_photo(id, &photo).await? else {
        // Deleted while the file was being written
        warn!("Bootcamp {} vanished during photo upload, removing {}", id, photo);
        state.uploader.remove_photo(&photo).await?;
        return Err(ApiError::resource_not_found(ResourceKind::Bootcamp, id));
    };

    info!("User {} uploaded photo {} for bootcamp {}", principal.id, photo, id);
    Ok(ApiResponse::success(updated))
}

async fn read_photo(mut multipart: Multipart) -> Result<PhotoFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e.body_text())))?
    {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e.body_text())))?;

        return Ok(PhotoFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(UploadError::MissingFile.into())
}
