//! Wordreel-Common: shared types used across the wordreel workspace.
//!
//! # Modules
//!
//! - `error` - Unified error taxonomy for the pipeline
//! - `ids` - Typed ID wrappers
//! - `plan` - The structured video plan produced by the planning stage
//! - `types` - Project status, stages, artifact kinds, log levels
//! - `paths` - Project-scoped artifact directory layout

pub mod error;
pub mod ids;
pub mod paths;
pub mod plan;
pub mod types;

pub use error::{Error, Result};
pub use ids::ProjectId;
pub use paths::ProjectLayout;
pub use plan::{VideoPlan, WordPair};
pub use types::{ArtifactKind, LogLevel, ProjectStatus, Stage};
