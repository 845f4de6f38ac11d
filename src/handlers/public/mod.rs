// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Read access to bootcamps and courses, plus token acquisition.
pub mod bootcamps;
pub mod courses;
pub mod session;
