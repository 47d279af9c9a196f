//! Deterministic local backend producing placeholder media.
//!
//! Useful for exercising the whole pipeline without network access or
//! API keys: plans are derived from the prompt text, audio artifacts are
//! valid silent WAV files, and the image is a 1x1 PNG.

use std::path::Path;

use async_trait::async_trait;
use wordreel_common::plan::WordPair;
use wordreel_common::{Error, ProjectLayout, Result, VideoPlan};

use crate::config::TimingConfig;

use super::{AssetProducer, Compositor, PlanProducer};

/// A valid 1x1 transparent PNG.
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

const FIXTURE_PAIRS: &[(&str, &str)] = &[
    ("water", "agua"),
    ("bread", "pan"),
    ("house", "casa"),
    ("cat", "gato"),
    ("night", "noche"),
];

/// Estimated clip length for synthesized speech.
fn speech_secs(text: &str) -> f64 {
    0.8 + 0.07 * text.chars().count() as f64
}

/// Write a silent 16-bit mono PCM WAV of roughly `secs` seconds.
fn write_silence_wav(path: &Path, secs: f64) -> Result<()> {
    const SAMPLE_RATE: u32 = 8000;
    let samples = (secs.max(0.1) * f64::from(SAMPLE_RATE)).round() as u32;
    let data_len = samples * 2;

    let mut buf = Vec::with_capacity(44 + data_len as usize);
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    buf.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes()); // block align
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    buf.resize(44 + data_len as usize, 0);

    std::fs::write(path, &buf)?;
    Ok(())
}

fn slugify(prompt: &str) -> String {
    let slug: String = prompt
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .take(4)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

#[derive(Debug, Default)]
pub struct FixtureBackend;

#[async_trait]
impl PlanProducer for FixtureBackend {
    async fn generate_plan(&self, _credential: &str, prompt: &str) -> Result<VideoPlan> {
        if prompt.trim().is_empty() {
            return Err(Error::validation("prompt is empty"));
        }

        let word_pairs = FIXTURE_PAIRS
            .iter()
            .map(|(source, target)| WordPair {
                source_word: (*source).to_string(),
                target_word: (*target).to_string(),
            })
            .collect();

        Ok(VideoPlan {
            project_slug: slugify(prompt),
            source_language: "english".to_string(),
            target_language: "spanish".to_string(),
            topic: prompt.to_string(),
            video_title: format!("Can you guess these words? ({prompt})"),
            video_description: format!("Five Spanish words about: {prompt}"),
            intro_text: "Guess the translation before time runs out!".to_string(),
            word_pairs,
            music_prompt: "calm instrumental background loop".to_string(),
            image_prompt: format!("minimalist illustration, {prompt}"),
            hashtags: vec!["#language".to_string(), "#spanish".to_string()],
        })
    }
}

#[async_trait]
impl AssetProducer for FixtureBackend {
    async fn generate_image(&self, _credential: &str, _prompt: &str, out: &Path) -> Result<()> {
        std::fs::write(out, PLACEHOLDER_PNG)?;
        Ok(())
    }

    async fn generate_speech(&self, _credential: &str, text: &str, out: &Path) -> Result<f64> {
        let secs = speech_secs(text);
        write_silence_wav(out, secs)?;
        Ok(secs)
    }

    async fn generate_music(
        &self,
        _credential: &str,
        _prompt: &str,
        target_secs: f64,
        out: &Path,
    ) -> Result<()> {
        write_silence_wav(out, target_secs)
    }
}

#[async_trait]
impl Compositor for FixtureBackend {
    async fn render(
        &self,
        plan: &VideoPlan,
        _layout: &ProjectLayout,
        _timing: &TimingConfig,
        duration_secs: f64,
        out: &Path,
    ) -> Result<()> {
        // Placeholder container: enough for downstream tooling to see a
        // file of the right name, not a playable video.
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x18]);
        buf.extend_from_slice(b"ftypmp42");
        buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        buf.extend_from_slice(b"mp42mp41");
        buf.extend_from_slice(
            format!("\n{} ({duration_secs:.3}s)\n", plan.video_title).as_bytes(),
        );
        std::fs::write(out, &buf)?;
        Ok(())
    }
}
