// handlers/public/bootcamps.rs - GET /api/v1/bootcamps[/:id]

use axum::extract::{Query, State};
use std::collections::HashMap;
use uuid::Uuid;

use crate::api::{ApiPath, ListResponse};
use crate::app::AppState;
use crate::database::models::{Bootcamp, BootcampFilter};
use crate::database::ListQuery;
use crate::error::ApiError;
use crate::handlers::load_bootcamp;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/v1/bootcamps - filtered, sorted and paged listing
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ListResponse, ApiError> {
    let query = ListQuery::<BootcampFilter>::parse(&params)?;
    let page = state.store.list_bootcamps(&query).await?;
    ListResponse::from_page(page, &query)
}

/// GET /api/v1/bootcamps/:id
pub async fn get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Bootcamp> {
    let bootcamp = load_bootcamp(&state, id).await?;
    Ok(ApiResponse::success(bootcamp))
}
