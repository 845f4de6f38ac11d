pub mod extract;
pub mod format;

pub use extract::{ApiJson, ApiPath};
pub use format::{project, ListResponse};
