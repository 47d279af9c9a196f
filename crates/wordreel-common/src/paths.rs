//! Project-scoped artifact directory layout.
//!
//! Every project owns one directory under the configured output root; all
//! of its artifacts live at fixed names inside it so that resume and
//! regeneration can find them without extra bookkeeping.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::types::ArtifactKind;

/// Fixed file names inside a project directory.
const BACKGROUND_FILE: &str = "background.png";
const INTRO_FILE: &str = "intro.wav";
const MUSIC_FILE: &str = "music.wav";
const VIDEO_FILE: &str = "final_video.mp4";

/// Derive the durable project slug from the plan's slug and the creation
/// time, e.g. `japanese-bar-words-20250812093045`. The timestamp suffix
/// keeps slugs unique across repeated prompts.
pub fn derive_slug(plan_slug: &str, created_at: DateTime<Utc>) -> String {
    format!("{}-{}", plan_slug, created_at.format("%Y%m%d%H%M%S"))
}

/// The on-disk layout of one project's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Layout rooted at `output_dir/slug`.
    pub fn new(output_dir: &Path, slug: &str) -> Self {
        Self {
            root: output_dir.join(slug),
        }
    }

    /// Layout for an already-known project directory.
    pub fn from_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self { root: dir.into() }
    }

    /// The project directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn background(&self) -> PathBuf {
        self.root.join(BACKGROUND_FILE)
    }

    pub fn intro(&self) -> PathBuf {
        self.root.join(INTRO_FILE)
    }

    pub fn word(&self, index: usize) -> PathBuf {
        self.root.join(format!("word_{index}.wav"))
    }

    pub fn music(&self) -> PathBuf {
        self.root.join(MUSIC_FILE)
    }

    pub fn video(&self) -> PathBuf {
        self.root.join(VIDEO_FILE)
    }

    /// The path an artifact of the given kind lives at.
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Image => self.background(),
            ArtifactKind::Intro => self.intro(),
            ArtifactKind::SpeechUnit(i) => self.word(i),
            ArtifactKind::Music => self.music(),
            ArtifactKind::Video => self.video(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_derive_slug() {
        let at = Utc.with_ymd_and_hms(2025, 8, 12, 9, 30, 45).unwrap();
        assert_eq!(
            derive_slug("japanese-bar-words", at),
            "japanese-bar-words-20250812093045"
        );
    }

    #[test]
    fn test_layout_paths() {
        let layout = ProjectLayout::new(Path::new("/out"), "ramen-20250101000000");
        assert_eq!(
            layout.background(),
            PathBuf::from("/out/ramen-20250101000000/background.png")
        );
        assert_eq!(
            layout.word(3),
            PathBuf::from("/out/ramen-20250101000000/word_3.wav")
        );
        assert_eq!(
            layout.video(),
            PathBuf::from("/out/ramen-20250101000000/final_video.mp4")
        );
    }

    #[test]
    fn test_path_for_matches_direct_accessors() {
        let layout = ProjectLayout::from_dir("/out/p");
        assert_eq!(layout.path_for(ArtifactKind::Image), layout.background());
        assert_eq!(layout.path_for(ArtifactKind::Intro), layout.intro());
        assert_eq!(layout.path_for(ArtifactKind::SpeechUnit(2)), layout.word(2));
        assert_eq!(layout.path_for(ArtifactKind::Music), layout.music());
        assert_eq!(layout.path_for(ArtifactKind::Video), layout.video());
    }
}
