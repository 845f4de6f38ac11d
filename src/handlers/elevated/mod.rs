// handlers/elevated/mod.rs - Elevated handlers (admin role required)
pub mod users;
