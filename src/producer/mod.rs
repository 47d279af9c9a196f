//! Collaborator seams for the generative backends.
//!
//! The pipeline controller only ever talks to these traits. Real model
//! integrations plug in behind them; the bundled [`FixtureBackend`]
//! produces deterministic placeholder media for offline use, and the
//! test suite drives the pipeline with scripted mocks.
//!
//! Every method takes the credential to bill the call against and
//! classifies failures through `wordreel_common::Error`, which is what
//! the controller's rotation and retry policy dispatches on.

mod fixture;

pub use fixture::FixtureBackend;

use std::path::Path;

use async_trait::async_trait;
use wordreel_common::{ProjectLayout, Result, VideoPlan};

use crate::config::TimingConfig;

/// Turns a free-text prompt into a structured video plan.
#[async_trait]
pub trait PlanProducer: Send + Sync {
    async fn generate_plan(&self, credential: &str, prompt: &str) -> Result<VideoPlan>;
}

/// Produces individual media artifacts from generation prompts.
#[async_trait]
pub trait AssetProducer: Send + Sync {
    /// Generate the background image into `out`.
    async fn generate_image(&self, credential: &str, prompt: &str, out: &Path) -> Result<()>;

    /// Synthesize speech for `text` into `out`. Returns the clip length
    /// in seconds; the duration calculation depends on it.
    async fn generate_speech(&self, credential: &str, text: &str, out: &Path) -> Result<f64>;

    /// Generate background music of (approximately) `target_secs` into
    /// `out`.
    async fn generate_music(
        &self,
        credential: &str,
        prompt: &str,
        target_secs: f64,
        out: &Path,
    ) -> Result<()>;
}

/// Renders the final video from a fixed set of completed artifacts.
#[async_trait]
pub trait Compositor: Send + Sync {
    async fn render(
        &self,
        plan: &VideoPlan,
        layout: &ProjectLayout,
        timing: &TimingConfig,
        duration_secs: f64,
        out: &Path,
    ) -> Result<()>;
}
