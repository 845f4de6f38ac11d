use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use cookie::{Cookie, CookieJar};
use tracing::{debug, warn};

use crate::app::AppState;
use crate::auth::{validate_jwt, TOKEN_COOKIE};
use crate::database::models::User;
use crate::error::ApiError;
use crate::policy::Principal;

/// Authenticated user context, loaded fresh from the store on every request
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn principal(&self) -> Principal {
        self.user.principal()
    }
}

/// Resolve the bearer token (or `token` cookie) to a stored user and inject
/// it into the request
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&headers).ok_or_else(|| {
        debug!("Request without credentials to {}", request.uri().path());
        ApiError::unauthorized("Not authorized to access this route")
    })?;

    let claims = validate_jwt(&token, &state.config.security)?;

    // A token outlives neither its user nor a role change
    let user = state.store.find_user(claims.sub).await?.ok_or_else(|| {
        warn!("Token for unknown user {}", claims.sub);
        ApiError::unauthorized("Not authorized to access this route")
    })?;

    request.extensions_mut().insert(AuthUser { user });
    Ok(next.run(request).await)
}

/// Admin-only routes; must run after `require_auth`
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let auth = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))?;

    if !auth.principal().is_admin() {
        warn!("User {} with role {} refused admin route", auth.user.id, auth.user.role);
        return Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            auth.user.role
        )));
    }

    Ok(next.run(request).await)
}

/// Bearer token from the Authorization header, falling back to the cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    parse_cookies(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value_trimmed())
        .filter(|value| !value.is_empty() && *value != "none")
        .map(str::to_string)
}

/// Every cookie sent across all `Cookie` headers, percent-decoded
fn parse_cookies(headers: &HeaderMap) -> CookieJar {
    let mut jar = CookieJar::new();
    for value in headers.get_all(header::COOKIE).iter().filter_map(|v| v.to_str().ok()) {
        for cookie in Cookie::split_parse_encoded(value).filter_map(Result::ok) {
            jar.add_original(cookie.into_owned());
        }
    }
    jar
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=def"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_is_used_when_no_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=def"));
        assert_eq!(extract_token(&headers).as_deref(), Some("def"));

        headers.insert(header::COOKIE, HeaderValue::from_static("token=none"));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn cookie_values_are_unquoted_and_decoded() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token=\"abc.def\""));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::COOKIE, HeaderValue::from_static("token=abc%2Edef"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn cookies_across_several_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("lang=en; token=xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn malformed_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_token(&headers), None);
    }
}
