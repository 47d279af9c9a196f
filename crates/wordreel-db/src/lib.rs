//! Wordreel-DB: the durable audit store.
//!
//! Projects, their append-only audit logs, and artifact provenance rows
//! live in SQLite (rusqlite with r2d2 pooling). Every status transition
//! and log write commits before the pipeline performs the side effect it
//! authorizes, so a restarted process can trust the store's last durable
//! status as ground truth.
//!
//! # Modules
//!
//! - `migrations` - Embedded, versioned schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching the schema
//! - `queries` - Query operations (projects, logs, artifacts)

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
