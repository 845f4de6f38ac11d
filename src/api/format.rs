use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::database::query::{ListQuery, Page, Pagination};
use crate::error::ApiError;

/// Paged list in the public wire format
/// { success, count, pagination, data }
#[derive(Debug)]
pub struct ListResponse {
    pub data: Vec<Value>,
    pub pagination: Pagination,
}

impl ListResponse {
    /// Serialize one page of records, applying the query's field projection
    pub fn from_page<T: Serialize, F>(page: Page<T>, query: &ListQuery<F>) -> Result<Self, ApiError> {
        let pagination = page.pagination(query);
        let data = page
            .items
            .iter()
            .map(|item| to_value(item).map(|value| project(value, query.select.as_deref())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { data, pagination })
    }
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        let envelope = json!({
            "success": true,
            "count": self.data.len(),
            "pagination": self.pagination,
            "data": self.data,
        });
        (StatusCode::OK, Json(envelope)).into_response()
    }
}

fn to_value<T: Serialize>(item: &T) -> Result<Value, ApiError> {
    serde_json::to_value(item).map_err(|e| {
        tracing::error!("JSON serialization error: {}", e);
        ApiError::internal_server_error("Failed to format response")
    })
}

/// Keep only the selected fields of a JSON object; `id` is always kept
pub fn project(value: Value, select: Option<&[String]>) -> Value {
    match (select, value) {
        (Some(fields), Value::Object(object)) => {
            let projected: Map<String, Value> = object
                .into_iter()
                .filter(|(key, _)| key == "id" || fields.contains(key))
                .collect();
            Value::Object(projected)
        }
        (_, value) => value,
    }
}
