use axum::{
    extract::{DefaultBodyLimit, State},
    handler::HandlerWithoutStateExt,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::{AppConfig, SecurityConfig};
use crate::database::SharedStore;
use crate::error::ApiError;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{rate_limit, require_admin, require_auth, sanitize_request, with_security_headers, RateLimiter};
use crate::policy::CreationLocks;
use crate::uploads::{AssetUploader, LocalUploader};

pub const API_PREFIX: &str = "/api/v1";

/// Everything a handler may touch, injected through axum state
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub uploader: Arc<dyn AssetUploader>,
    pub config: Arc<AppConfig>,
    pub creation_locks: CreationLocks,
}

impl AppState {
    /// Photos go to the configured public directory
    pub fn new(store: SharedStore, config: AppConfig) -> Self {
        let uploader = Arc::new(LocalUploader::new(&config.uploads));
        Self {
            store,
            uploader,
            config: Arc::new(config),
            creation_locks: CreationLocks::new(),
        }
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn AssetUploader>) -> Self {
        self.uploader = uploader;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()));

    let mut app = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .nest(API_PREFIX, api)
        // Uploaded photos and any other static assets
        .fallback_service(ServeDir::new(&config.uploads.directory).not_found_service(not_found.into_service()))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
                .layer(from_fn_with_state(config.api.max_request_size_bytes, sanitize_request)),
        );

    if config.api.enable_rate_limiting {
        app = app.layer(from_fn_with_state(RateLimiter::from_config(&config.api), rate_limit));
    }

    app = with_security_headers(app);

    if config.security.enable_cors {
        app = app.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/bootcamps", get(public::bootcamps::list))
        .route("/bootcamps/:id", get(public::bootcamps::get))
        .route("/bootcamps/:id/courses", get(public::courses::list_for_bootcamp))
        .route("/courses", get(public::courses::list))
        .route("/courses/:id", get(public::courses::get))
        .route("/auth/register", post(public::session::register))
        .route("/auth/login", post(public::session::login))
        .route("/auth/logout", get(public::session::logout))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{account, bootcamps, courses};

    Router::new()
        .route("/bootcamps", post(bootcamps::create))
        .route("/bootcamps/:id", put(bootcamps::update).delete(bootcamps::delete))
        .route("/bootcamps/:id/photo", put(bootcamps::upload_photo))
        .route("/bootcamps/:id/courses", post(courses::create))
        .route("/courses/:id", put(courses::update).delete(courses::delete))
        .route("/auth/me", get(account::me))
        .route("/auth/updatedetails", put(account::update_details))
        .route("/auth/updatepassword", put(account::update_password))
        .route_layer(from_fn_with_state(state, require_auth))
}

fn elevated_routes(state: AppState) -> Router<AppState> {
    use elevated::users;

    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id", get(users::get).put(users::update).delete(users::delete))
        // Layers run outside-in: authenticate first, then check the role
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state, require_auth))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "DevCamper API",
            "version": version,
            "description": "Bootcamp directory backend",
            "endpoints": {
                "bootcamps": "/api/v1/bootcamps[/:id] (public read, owner or admin write)",
                "courses": "/api/v1/courses[/:id], /api/v1/bootcamps/:id/courses",
                "auth": "/api/v1/auth/{register,login,logout,me,updatedetails,updatepassword}",
                "users": "/api/v1/users[/:id] (admin)",
                "health": "/health (public)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
