//! Database query operations.

pub mod artifacts;
pub mod logs;
pub mod projects;
