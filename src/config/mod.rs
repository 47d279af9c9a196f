mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Env var appended to the configured API key list, comma-separated.
const API_KEYS_ENV: &str = "WORDREEL_API_KEYS";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    finalize_config(&mut config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./wordreel.toml",
        "~/.config/wordreel/config.toml",
        "/etc/wordreel/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    finalize_config(&mut config)?;
    Ok(config)
}

fn finalize_config(config: &mut Config) -> Result<()> {
    config.db_path = expand_path(&config.db_path);
    config.output_dir = expand_path(&config.output_dir);

    if let Ok(raw) = std::env::var(API_KEYS_ENV) {
        config.api_keys.extend(
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from),
        );
    }

    validate_config(config)
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy().into_owned();
    let expanded = shellexpand::tilde(&raw);
    PathBuf::from(expanded.as_ref())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.assets.max_concurrent == 0 {
        anyhow::bail!("assets.max_concurrent cannot be 0");
    }

    if config.retry.max_attempts == 0 {
        anyhow::bail!("retry.max_attempts cannot be 0");
    }

    if config.timing.challenge_secs <= 0.0
        || config.timing.reveal_secs <= 0.0
        || config.timing.scene_pause_secs < 0.0
    {
        anyhow::bail!("timing values must be positive");
    }

    if config.api_keys.is_empty() {
        tracing::warn!(
            "No API keys configured (set [api_keys] or {API_KEYS_ENV}); \
             only the local fixture backend will work"
        );
    }

    Ok(())
}
