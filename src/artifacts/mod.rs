//! Artifact completeness, freshness, and provenance digests.
//!
//! An artifact is *complete* when its database row exists and the file it
//! points at is on disk. It is *fresh* when it is complete and its stored
//! provenance digest matches the digest we would compute for it today.
//! Staleness is always derived at read time from those two digests; it is
//! never stored, so plan edits and regeneration requests cannot race a
//! persisted flag.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;
use sha2::{Digest, Sha256};
use wordreel_common::{ArtifactKind, Error, ProjectId, ProjectLayout, Result, VideoPlan};
use wordreel_db::models::ArtifactRecord;
use wordreel_db::queries;

use crate::config::TimingConfig;

/// Hex sha256 over the given parts, newline-separated so adjacent parts
/// cannot collide by concatenation.
fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Expected provenance digests, one function per artifact kind. Each
/// covers exactly the plan fields (and upstream digests) the artifact is
/// generated from.
pub mod provenance {
    use super::*;

    pub fn image(plan: &VideoPlan) -> String {
        digest(&["image", &plan.image_prompt])
    }

    pub fn intro(plan: &VideoPlan) -> String {
        digest(&["intro", &plan.intro_text])
    }

    pub fn word(plan: &VideoPlan, index: usize) -> Result<String> {
        let pair = plan.word_pairs.get(index).ok_or_else(|| {
            Error::validation(format!(
                "word index {index} out of range (plan has {} pairs)",
                plan.word_pairs.len()
            ))
        })?;
        Ok(digest(&["word", &index.to_string(), &pair.target_word]))
    }

    /// Music depends on its prompt and the computed video duration (to
    /// the millisecond), so any speech change that moves the duration
    /// invalidates it.
    pub fn music(plan: &VideoPlan, target_secs: f64) -> String {
        digest(&["music", &plan.music_prompt, &format!("{target_secs:.3}")])
    }

    /// The video covers every upstream artifact's provenance plus the
    /// timing constants the timeline was laid out with.
    pub fn video(upstream: &[String], timing: &TimingConfig) -> String {
        let mut parts: Vec<&str> = vec!["video"];
        for p in upstream {
            parts.push(p.as_str());
        }
        let timing_part = format!(
            "{:.3}/{:.3}/{:.3}",
            timing.challenge_secs, timing.reveal_secs, timing.scene_pause_secs
        );
        parts.push(&timing_part);
        digest(&parts)
    }
}

/// The persisted artifact rows for one project, joined with on-disk
/// presence.
pub struct ArtifactSet {
    records: HashMap<ArtifactKind, ArtifactRecord>,
}

impl ArtifactSet {
    pub fn load(conn: &Connection, project_id: ProjectId) -> Result<Self> {
        let records = queries::artifacts::artifacts_for_project(conn, project_id)?
            .into_iter()
            .map(|r| (r.kind, r))
            .collect();
        Ok(Self { records })
    }

    pub fn record(&self, kind: ArtifactKind) -> Option<&ArtifactRecord> {
        self.records.get(&kind)
    }

    /// Row exists and the file it points at is on disk.
    pub fn is_complete(&self, kind: ArtifactKind) -> bool {
        match self.records.get(&kind) {
            Some(record) => Path::new(&record.file_path).exists(),
            None => false,
        }
    }

    /// Complete and provenance matches the expected digest.
    pub fn is_fresh(&self, kind: ArtifactKind, expected: &str) -> bool {
        self.is_complete(kind)
            && self
                .records
                .get(&kind)
                .map(|r| r.provenance == expected)
                .unwrap_or(false)
    }

    /// Stored clip length for audio artifacts.
    pub fn duration_of(&self, kind: ArtifactKind) -> Option<f64> {
        self.records.get(&kind).and_then(|r| r.duration_secs)
    }
}

/// Invalidate one artifact: drop its provenance row and remove its file.
/// Missing row or file is fine; invalidation is idempotent.
pub fn invalidate(
    conn: &Connection,
    project_id: ProjectId,
    layout: &ProjectLayout,
    kind: ArtifactKind,
) -> Result<()> {
    queries::artifacts::delete_artifact(conn, project_id, kind)?;

    let path = layout.path_for(kind);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordreel_common::plan::WordPair;
    use wordreel_db::pool::init_memory_pool;
    use wordreel_db::queries::{artifacts::upsert_artifact, projects::create_project};

    fn sample_plan() -> VideoPlan {
        VideoPlan {
            project_slug: "p".into(),
            source_language: "english".into(),
            target_language: "spanish".into(),
            topic: "t".into(),
            video_title: "t".into(),
            video_description: "d".into(),
            intro_text: "guess!".into(),
            word_pairs: vec![
                WordPair {
                    source_word: "water".into(),
                    target_word: "agua".into(),
                },
                WordPair {
                    source_word: "bread".into(),
                    target_word: "pan".into(),
                },
            ],
            music_prompt: "lofi".into(),
            image_prompt: "a bar".into(),
            hashtags: vec![],
        }
    }

    #[test]
    fn test_digests_cover_only_their_inputs() {
        let plan = sample_plan();
        let mut edited = plan.clone();
        edited.image_prompt = "a different bar".into();

        assert_ne!(provenance::image(&plan), provenance::image(&edited));
        // Unrelated artifacts are unaffected by the image prompt.
        assert_eq!(provenance::intro(&plan), provenance::intro(&edited));
        assert_eq!(
            provenance::word(&plan, 0).unwrap(),
            provenance::word(&edited, 0).unwrap()
        );
    }

    #[test]
    fn test_music_digest_depends_on_duration() {
        let plan = sample_plan();
        assert_ne!(
            provenance::music(&plan, 30.0),
            provenance::music(&plan, 30.001)
        );
        assert_eq!(
            provenance::music(&plan, 30.0),
            provenance::music(&plan, 30.0)
        );
    }

    #[test]
    fn test_word_digest_out_of_range() {
        let plan = sample_plan();
        assert!(matches!(
            provenance::word(&plan, 2),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_completeness_requires_row_and_file() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let project = create_project(&conn, "prompt").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::from_dir(dir.path());

        // No row yet.
        let set = ArtifactSet::load(&conn, project.id).unwrap();
        assert!(!set.is_complete(ArtifactKind::Image));

        // Row without file.
        upsert_artifact(
            &conn,
            project.id,
            ArtifactKind::Image,
            &layout.background().to_string_lossy(),
            "digest",
            None,
        )
        .unwrap();
        let set = ArtifactSet::load(&conn, project.id).unwrap();
        assert!(!set.is_complete(ArtifactKind::Image));

        // Row and file.
        std::fs::write(layout.background(), b"png").unwrap();
        let set = ArtifactSet::load(&conn, project.id).unwrap();
        assert!(set.is_complete(ArtifactKind::Image));
        assert!(set.is_fresh(ArtifactKind::Image, "digest"));
        assert!(!set.is_fresh(ArtifactKind::Image, "other"));
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let project = create_project(&conn, "prompt").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::from_dir(dir.path());
        std::fs::write(layout.music(), b"wav").unwrap();
        upsert_artifact(
            &conn,
            project.id,
            ArtifactKind::Music,
            &layout.music().to_string_lossy(),
            "digest",
            Some(30.0),
        )
        .unwrap();

        invalidate(&conn, project.id, &layout, ArtifactKind::Music).unwrap();
        assert!(!layout.music().exists());

        let set = ArtifactSet::load(&conn, project.id).unwrap();
        assert!(set.record(ArtifactKind::Music).is_none());

        // Second invalidation of the same kind is a no-op.
        invalidate(&conn, project.id, &layout, ArtifactKind::Music).unwrap();
    }
}
