//! Regeneration planning.
//!
//! Maps a user-requested regeneration scope onto the set of artifacts to
//! invalidate, expanded along the fixed dependency graph:
//!
//! ```text
//! plan -> {image, intro, word_i, music}
//! {intro, word_i, music} -> duration -> music
//! {image, intro, word_i, music} -> video
//! ```
//!
//! Any speech audio feeds the duration calculation, and music is sized to
//! the duration, so invalidating intro or a word clip cascades to music as
//! well as to the video. Pure functions, no I/O.

use std::fmt;
use std::str::FromStr;

use wordreel_common::{ArtifactKind, Error, Result, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerationScope {
    /// Every artifact; the persisted plan is kept.
    Full,
    /// Only the final render.
    Video,
    /// The background image (and the render that embeds it).
    Background,
    /// The intro narration.
    Intro,
    /// The background music.
    Music,
    /// Every word clip.
    AllWords,
    /// A single word clip by index.
    Word(usize),
}

impl fmt::Display for RegenerationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Video => write!(f, "video"),
            Self::Background => write!(f, "background"),
            Self::Intro => write!(f, "intro"),
            Self::Music => write!(f, "music"),
            Self::AllWords => write!(f, "words"),
            Self::Word(i) => write!(f, "word:{i}"),
        }
    }
}

impl FromStr for RegenerationScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Self::Full),
            "video" => Ok(Self::Video),
            "background" | "image" => Ok(Self::Background),
            "intro" => Ok(Self::Intro),
            "music" => Ok(Self::Music),
            "words" => Ok(Self::AllWords),
            other => {
                if let Some(idx) = other.strip_prefix("word:") {
                    let idx = idx.parse::<usize>().map_err(|_| {
                        Error::validation(format!("invalid word index in scope '{other}'"))
                    })?;
                    Ok(Self::Word(idx))
                } else {
                    Err(Error::validation(format!(
                        "unknown regeneration scope '{other}' \
                         (expected full, video, background, intro, music, words, or word:N)"
                    )))
                }
            }
        }
    }
}

impl RegenerationScope {
    /// The stage the pipeline re-enters after invalidation. Only a pure
    /// re-render can start at Composing.
    pub fn entry_stage(self) -> Stage {
        match self {
            Self::Video => Stage::Composing,
            _ => Stage::GeneratingAssets,
        }
    }
}

/// The artifacts to invalidate for a scope, in topological order
/// (upstream first). `word_count` is the number of word pairs in the
/// project's plan.
pub fn invalidation_set(
    scope: RegenerationScope,
    word_count: usize,
) -> Result<Vec<ArtifactKind>> {
    use ArtifactKind::*;

    let all_words = |kinds: &mut Vec<ArtifactKind>| {
        kinds.extend((0..word_count).map(SpeechUnit));
    };

    let mut kinds = Vec::new();
    match scope {
        RegenerationScope::Full => {
            kinds.push(Image);
            kinds.push(Intro);
            all_words(&mut kinds);
            kinds.push(Music);
        }
        RegenerationScope::Video => {}
        RegenerationScope::Background => kinds.push(Image),
        RegenerationScope::Intro => {
            kinds.push(Intro);
            kinds.push(Music);
        }
        RegenerationScope::Music => kinds.push(Music),
        RegenerationScope::AllWords => {
            all_words(&mut kinds);
            kinds.push(Music);
        }
        RegenerationScope::Word(i) => {
            if i >= word_count {
                return Err(Error::validation(format!(
                    "word index {i} out of range (plan has {word_count} pairs)"
                )));
            }
            kinds.push(SpeechUnit(i));
            kinds.push(Music);
        }
    }

    // Everything cascades to the final render.
    kinds.push(Video);
    Ok(kinds)
}
