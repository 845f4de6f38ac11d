pub mod auth;
pub mod rate_limit;
pub mod response;
pub mod sanitize;
pub mod security;

pub use auth::{require_admin, require_auth, AuthUser};
pub use rate_limit::{rate_limit, RateLimiter};
pub use response::{ApiResponse, ApiResult};
pub use sanitize::sanitize_request;
pub use security::with_security_headers;
