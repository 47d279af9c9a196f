//! The stateful pipeline: stage orchestration, retry policy, and the
//! asset fan-out.

mod controller;
pub mod duration;

pub use controller::{CompletedProject, PipelineController};
