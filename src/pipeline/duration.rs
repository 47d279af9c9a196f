//! Video duration calculation.
//!
//! A pure function of the recorded clip lengths and the timing constants;
//! no probing, no external calls. The timeline is:
//!
//! ```text
//! 0.5s lead-in | intro narration | pause |
//!   per word: challenge | reveal (at least reveal_secs, or the clip
//!             plus 0.5s if the clip is longer) | pause
//! ```

use crate::config::TimingConfig;

/// Total video length in seconds for the given intro narration length and
/// per-word clip lengths.
pub fn compute_duration(intro_secs: f64, word_clip_secs: &[f64], timing: &TimingConfig) -> f64 {
    let mut total = 0.5 + intro_secs + timing.scene_pause_secs;

    for &clip in word_clip_secs {
        let reveal = (clip + 0.5).max(timing.reveal_secs);
        total += timing.challenge_secs + reveal + timing.scene_pause_secs;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> TimingConfig {
        TimingConfig {
            challenge_secs: 5.0,
            reveal_secs: 2.0,
            scene_pause_secs: 1.0,
        }
    }

    #[test]
    fn test_known_timeline() {
        // 0.5 + 3.0 + 1.0 = 4.5 lead-in and intro.
        // Word 0: 5 + max(1.5, 2.0) + 1 = 8.0
        // Word 1: 5 + max(2.5, 2.0) + 1 = 8.5
        let total = compute_duration(3.0, &[1.0, 2.0], &timing());
        assert!((total - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_words() {
        let total = compute_duration(2.0, &[], &timing());
        assert!((total - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_short_clips_floor_at_reveal_secs() {
        // Both clips shorter than the reveal window; per-word share is
        // identical regardless of clip length.
        let a = compute_duration(1.0, &[0.2], &timing());
        let b = compute_duration(1.0, &[1.0], &timing());
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_longer_speech_extends_duration() {
        let short = compute_duration(1.0, &[3.0], &timing());
        let long = compute_duration(1.0, &[4.0], &timing());
        assert!((long - short - 1.0).abs() < 1e-9);
    }
}
