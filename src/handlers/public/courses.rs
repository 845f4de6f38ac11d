// handlers/public/courses.rs - GET /api/v1/courses[/:id], GET /api/v1/bootcamps/:id/courses

use axum::extract::{Query, State};
use std::collections::HashMap;
use uuid::Uuid;

use crate::api::{ApiPath, ListResponse};
use crate::app::AppState;
use crate::database::models::{Course, CourseFilter};
use crate::database::ListQuery;
use crate::error::ApiError;
use crate::handlers::{load_bootcamp, load_course};
use crate::middleware::{ApiResponse, ApiResult};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ListResponse, ApiError> {
    let query = ListQuery::<CourseFilter>::parse(&params)?;
    let page = state.store.list_courses(&query).await?;
    ListResponse::from_page(page, &query)
}

/// Courses of one bootcamp; the path id overrides any `bootcamp` filter
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    ApiPath(bootcamp_id): ApiPath<Uuid>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ListResponse, ApiError> {
    load_bootcamp(&state, bootcamp_id).await?;

    let mut query = ListQuery::<CourseFilter>::parse(&params)?;
    query.filter.bootcamp_id = Some(bootcamp_id);
    let page = state.store.list_courses(&query).await?;
    ListResponse::from_page(page, &query)
}

pub async fn get(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Course> {
    let course = load_course(&state, id).await?;
    Ok(ApiResponse::success(course))
}
