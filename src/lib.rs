//! Wordreel - language-learning short-video generation pipeline
//!
//! This library crate exposes the core functionality for integration testing.

pub mod artifacts;
pub mod config;
pub mod credentials;
pub mod pipeline;
pub mod producer;
pub mod regen;
