//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a [`PipelineController`] over an
//! in-memory database, a temp output directory, and a [`MockBackend`]
//! whose failures can be scripted per operation.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use wordreel::config::{Config, TimingConfig};
use wordreel::credentials::CredentialPool;
use wordreel::pipeline::PipelineController;
use wordreel::producer::{AssetProducer, Compositor, PlanProducer};
use wordreel_common::plan::WordPair;
use wordreel_common::{Error, ProjectLayout, Result, VideoPlan};
use wordreel_db::pool::{get_conn, init_memory_pool, DbPool, PooledConnection};

/// A plan with `words` word pairs, valid under `VideoPlan::validate`.
pub fn sample_plan(words: usize) -> VideoPlan {
    let pairs = [
        ("water", "agua"),
        ("bread", "pan"),
        ("house", "casa"),
        ("cat", "gato"),
        ("night", "noche"),
        ("street", "calle"),
        ("book", "libro"),
    ];

    VideoPlan {
        project_slug: "spanish-basics".into(),
        source_language: "english".into(),
        target_language: "spanish".into(),
        topic: "Basic Spanish words".into(),
        video_title: "Guess these Spanish words".into(),
        video_description: "Common Spanish vocabulary".into(),
        intro_text: "Guess the translation before time runs out!".into(),
        word_pairs: pairs
            .iter()
            .cycle()
            .take(words)
            .map(|(source, target)| WordPair {
                source_word: (*source).to_string(),
                target_word: (*target).to_string(),
            })
            .collect(),
        music_prompt: "calm lofi loop".into(),
        image_prompt: "neon bar at night".into(),
        hashtags: vec!["#spanish".into()],
    }
}

/// Scripted backend implementing all three producer seams.
///
/// Output files embed a global generation counter, so bytes change on
/// every (re)generation: a byte-identical file after a resume proves the
/// artifact was skipped, not silently redone.
pub struct MockBackend {
    plan: Mutex<VideoPlan>,
    failures: Mutex<HashMap<String, VecDeque<Error>>>,
    keys_used: Mutex<HashMap<String, Vec<String>>>,
    nonce: AtomicU64,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            plan: Mutex::new(sample_plan(5)),
            failures: Mutex::new(HashMap::new()),
            keys_used: Mutex::new(HashMap::new()),
            nonce: AtomicU64::new(0),
        }
    }

    /// Replace the plan the next `generate_plan` call returns.
    pub fn set_plan(&self, plan: VideoPlan) {
        *self.plan.lock() = plan;
    }

    /// Script the next call of `label` to fail with `err`. Labels are
    /// "plan", "image", "music", "render", "speech", or "speech:<text>"
    /// to target one specific clip.
    pub fn fail_next(&self, label: &str, err: Error) {
        self.failures
            .lock()
            .entry(label.to_string())
            .or_default()
            .push_back(err);
    }

    /// Credentials used for `label`, in call order.
    pub fn keys_for(&self, label: &str) -> Vec<String> {
        self.keys_used.lock().get(label).cloned().unwrap_or_default()
    }

    pub fn call_count(&self, label: &str) -> usize {
        self.keys_for(label).len()
    }

    fn record(&self, label: &str, credential: &str) {
        self.keys_used
            .lock()
            .entry(label.to_string())
            .or_default()
            .push(credential.to_string());
    }

    fn take_failure(&self, label: &str) -> Option<Error> {
        self.failures
            .lock()
            .get_mut(label)
            .and_then(|queue| queue.pop_front())
    }

    fn next_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanProducer for MockBackend {
    async fn generate_plan(&self, credential: &str, _prompt: &str) -> Result<VideoPlan> {
        self.record("plan", credential);
        if let Some(err) = self.take_failure("plan") {
            return Err(err);
        }
        Ok(self.plan.lock().clone())
    }
}

#[async_trait]
impl AssetProducer for MockBackend {
    async fn generate_image(&self, credential: &str, prompt: &str, out: &Path) -> Result<()> {
        self.record("image", credential);
        if let Some(err) = self.take_failure("image") {
            return Err(err);
        }
        std::fs::write(out, format!("image:{prompt}:{}", self.next_nonce()))?;
        Ok(())
    }

    async fn generate_speech(&self, credential: &str, text: &str, out: &Path) -> Result<f64> {
        self.record("speech", credential);
        if let Some(err) = self
            .take_failure(&format!("speech:{text}"))
            .or_else(|| self.take_failure("speech"))
        {
            return Err(err);
        }
        std::fs::write(out, format!("speech:{text}:{}", self.next_nonce()))?;
        // Deterministic per text, so resumes recompute the same duration.
        Ok(1.0 + 0.1 * text.chars().count() as f64)
    }

    async fn generate_music(
        &self,
        credential: &str,
        prompt: &str,
        target_secs: f64,
        out: &Path,
    ) -> Result<()> {
        self.record("music", credential);
        if let Some(err) = self.take_failure("music") {
            return Err(err);
        }
        std::fs::write(
            out,
            format!("music:{prompt}:{target_secs:.3}:{}", self.next_nonce()),
        )?;
        Ok(())
    }
}

#[async_trait]
impl Compositor for MockBackend {
    async fn render(
        &self,
        plan: &VideoPlan,
        _layout: &ProjectLayout,
        _timing: &TimingConfig,
        duration_secs: f64,
        out: &Path,
    ) -> Result<()> {
        self.record("render", "-");
        if let Some(err) = self.take_failure("render") {
            return Err(err);
        }
        std::fs::write(
            out,
            format!(
                "video:{}:{duration_secs:.3}:{}",
                plan.video_title,
                self.next_nonce()
            ),
        )?;
        Ok(())
    }
}

/// Test harness: in-memory DB, temp output directory, scripted backend.
pub struct TestHarness {
    pub db: DbPool,
    pub backend: Arc<MockBackend>,
    pub credentials: Arc<CredentialPool>,
    pub config: Config,
    _tmp: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_keys(&["key-a", "key-b"])
    }

    pub fn with_keys(keys: &[&str]) -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");

        let mut config = Config::default();
        config.output_dir = tmp.path().join("output");
        config.db_path = tmp.path().join("wordreel.db");
        // Keep failing tests fast; cooldown hints still override this.
        config.retry.max_credential_wait_secs = 1;

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let credentials = Arc::new(
            CredentialPool::new(
                keys.iter().map(|k| k.to_string()).collect(),
                Duration::from_secs(config.retry.default_cooldown_secs),
            )
            .expect("credential pool"),
        );

        Self {
            db,
            backend: Arc::new(MockBackend::new()),
            credentials,
            config,
            _tmp: tmp,
        }
    }

    pub fn controller(&self) -> PipelineController {
        PipelineController::new(
            self.db.clone(),
            self.credentials.clone(),
            self.backend.clone(),
            self.backend.clone(),
            self.backend.clone(),
            self.config.clone(),
        )
    }

    /// A pooled connection. Drop it before driving the controller; the
    /// in-memory pool has a single connection.
    pub fn conn(&self) -> PooledConnection {
        get_conn(&self.db).expect("failed to get connection")
    }
}
