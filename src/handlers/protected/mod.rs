// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every mutation of a bootcamp or course goes through the ownership policy
// here; the current user's own account is managed in `account`.
pub mod account;
pub mod bootcamps;
pub mod courses;
