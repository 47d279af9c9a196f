use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Path to the SQLite project store.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Root directory project asset directories are created under.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// API keys for the generative backends. The WORDREEL_API_KEYS env var
    /// (comma-separated) is appended to this list at load time.
    #[serde(default)]
    pub api_keys: Vec<String>,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub assets: AssetConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            output_dir: default_output_dir(),
            api_keys: Vec::new(),
            retry: RetryConfig::default(),
            assets: AssetConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("wordreel.db")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total external-call attempts before the stage is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retries on the same credential for transient network failures
    /// before rotating to the next one.
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,

    /// Cooldown applied to a rate-limited credential when the service
    /// gives no retry-after hint.
    #[serde(default = "default_cooldown_secs")]
    pub default_cooldown_secs: u64,

    /// Upper bound on waiting for any credential to leave cooldown.
    #[serde(default = "default_max_credential_wait")]
    pub max_credential_wait_secs: u64,
}

fn default_max_attempts() -> u32 {
    6
}
fn default_transient_retries() -> u32 {
    2
}
fn default_cooldown_secs() -> u64 {
    60
}
fn default_max_credential_wait() -> u64 {
    120
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            transient_retries: default_transient_retries(),
            default_cooldown_secs: default_cooldown_secs(),
            max_credential_wait_secs: default_max_credential_wait(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetConfig {
    /// Maximum independent artifacts generated concurrently within one
    /// project's asset stage.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Timeline constants for the rendered video. These feed the duration
/// calculation, so changing them invalidates the final video on the next
/// run (its provenance covers them).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Seconds the viewer gets to guess each word.
    #[serde(default = "default_challenge_secs")]
    pub challenge_secs: f64,

    /// Minimum seconds the answer stays on screen.
    #[serde(default = "default_reveal_secs")]
    pub reveal_secs: f64,

    /// Pause between scenes.
    #[serde(default = "default_scene_pause_secs")]
    pub scene_pause_secs: f64,
}

fn default_challenge_secs() -> f64 {
    5.0
}
fn default_reveal_secs() -> f64 {
    2.0
}
fn default_scene_pause_secs() -> f64 {
    1.0
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            challenge_secs: default_challenge_secs(),
            reveal_secs: default_reveal_secs(),
            scene_pause_secs: default_scene_pause_secs(),
        }
    }
}
