use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, uri::PathAndQuery, Uri},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::error::ApiError;

/// Strip operator-like keys and escape markup in JSON bodies, and collapse
/// repeated query parameters to their last value. JSON bodies larger than
/// `limit` bytes are rejected.
pub async fn sanitize_request(
    State(limit): State<usize>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    if let Some(query) = parts.uri.query() {
        let collapsed = collapse_query(query);
        if collapsed != query {
            parts.uri = replace_query(&parts.uri, &collapsed)?;
        }
    }

    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !is_json {
        return Ok(next.run(Request::from_parts(parts, body)).await);
    }

    let bytes = to_bytes(body, limit)
        .await
        .map_err(|_| ApiError::PayloadTooLarge(format!("Request body exceeds {} bytes", limit)))?;

    // Malformed JSON is left for the extractor to report
    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(mut value) => {
            sanitize_value(&mut value);
            parts.headers.remove(header::CONTENT_LENGTH);
            Body::from(value.to_string())
        }
        Err(_) => Body::from(bytes),
    };

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Drop keys starting with `$` or containing `.`, escape `<` and `>` in strings
pub fn sanitize_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !key.starts_with('$') && !key.contains('.'));
            map.values_mut().for_each(sanitize_value);
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize_value),
        Value::String(s) if s.contains(['<', '>']) => {
            *s = s.replace('<', "&lt;").replace('>', "&gt;");
        }
        _ => {}
    }
}

/// Keep only the last occurrence of each query parameter, in first-seen order
pub fn collapse_query(query: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let key = pair.split_once('=').map_or(pair, |(key, _)| key);
        match pairs.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = pair,
            None => pairs.push((key, pair)),
        }
    }
    pairs.iter().map(|(_, pair)| *pair).collect::<Vec<_>>().join("&")
}

fn replace_query(uri: &Uri, query: &str) -> Result<Uri, ApiError> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut builder = Uri::builder();
    if let Some(scheme) = uri.scheme() {
        builder = builder.scheme(scheme.clone());
    }
    if let Some(authority) = uri.authority() {
        builder = builder.authority(authority.clone());
    }
    let path_and_query: PathAndQuery = path_and_query
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid query string"))?;
    builder
        .path_and_query(path_and_query)
        .build()
        .map_err(|_| ApiError::bad_request("Invalid query string"))
}
