//! Regeneration integration tests.
//!
//! Checks that scoped regeneration invalidates exactly the dependency
//! cone of the requested artifact and leaves everything else untouched
//! on disk.

mod common;

use std::collections::HashMap;

use common::TestHarness;
use wordreel::pipeline::CompletedProject;
use wordreel_common::{ArtifactKind, Error, ProjectStatus};
use wordreel_db::queries;

/// Map of artifact kind -> file bytes for a completed project.
fn snapshot(harness: &TestHarness, slug: &str) -> HashMap<ArtifactKind, Vec<u8>> {
    let conn = harness.conn();
    let project = queries::projects::get_project_by_slug(&conn, slug).unwrap();
    queries::artifacts::artifacts_for_project(&conn, project.id)
        .unwrap()
        .into_iter()
        .map(|r| (r.kind, std::fs::read(&r.file_path).unwrap()))
        .collect()
}

async fn completed_project(harness: &TestHarness) -> CompletedProject {
    harness.controller().new_project("five words").await.unwrap()
}

// ---------------------------------------------------------------------------
// word:N -> that clip, music, video; nothing else
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_word_regen_is_isolated() {
    let harness = TestHarness::new();
    let done = completed_project(&harness).await;
    let before = snapshot(&harness, &done.slug);

    harness
        .controller()
        .regenerate("word:1".parse().unwrap(), Some(&done.slug))
        .await
        .unwrap();

    let after = snapshot(&harness, &done.slug);
    for (kind, bytes) in &after {
        let changed = bytes != &before[kind];
        match kind {
            ArtifactKind::SpeechUnit(1) | ArtifactKind::Music | ArtifactKind::Video => {
                assert!(changed, "{kind} should have been regenerated")
            }
            _ => assert!(!changed, "{kind} should be byte-identical"),
        }
    }

    // Only the one clip was re-synthesized.
    assert_eq!(harness.backend.call_count("speech"), 7);
    assert_eq!(harness.backend.call_count("image"), 1);
    assert_eq!(harness.backend.call_count("music"), 2);
    assert_eq!(harness.backend.call_count("render"), 2);
}

// ---------------------------------------------------------------------------
// full -> everything regenerated, plan kept
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_regen_replaces_every_artifact_but_keeps_plan() {
    let harness = TestHarness::new();
    let done = completed_project(&harness).await;
    let before = snapshot(&harness, &done.slug);

    let plan_before = {
        let conn = harness.conn();
        queries::projects::get_project_by_slug(&conn, &done.slug)
            .unwrap()
            .plan
            .unwrap()
    };

    harness
        .controller()
        .regenerate("full".parse().unwrap(), Some(&done.slug))
        .await
        .unwrap();

    let after = snapshot(&harness, &done.slug);
    assert_eq!(after.len(), before.len());
    for (kind, bytes) in &after {
        assert_ne!(bytes, &before[kind], "{kind} should have been regenerated");
    }

    // No second planning call; the stored plan is reused as-is.
    assert_eq!(harness.backend.call_count("plan"), 1);
    let conn = harness.conn();
    let project = queries::projects::get_project_by_slug(&conn, &done.slug).unwrap();
    assert_eq!(project.plan.unwrap(), plan_before);
    assert_eq!(project.status, ProjectStatus::Completed);
}

// ---------------------------------------------------------------------------
// background -> image and video only
// ---------------------------------------------------------------------------

#[tokio::test]
async fn background_regen_leaves_audio_untouched() {
    let harness = TestHarness::new();
    let done = completed_project(&harness).await;
    let before = snapshot(&harness, &done.slug);

    harness
        .controller()
        .regenerate("background".parse().unwrap(), Some(&done.slug))
        .await
        .unwrap();

    let after = snapshot(&harness, &done.slug);
    for (kind, bytes) in &after {
        let changed = bytes != &before[kind];
        match kind {
            ArtifactKind::Image | ArtifactKind::Video => {
                assert!(changed, "{kind} should have been regenerated")
            }
            _ => assert!(!changed, "{kind} should be byte-identical"),
        }
    }
    assert_eq!(harness.backend.call_count("speech"), 6);
    assert_eq!(harness.backend.call_count("music"), 1);
}

// ---------------------------------------------------------------------------
// video -> re-render only, no asset calls
// ---------------------------------------------------------------------------

#[tokio::test]
async fn video_regen_skips_asset_stage() {
    let harness = TestHarness::new();
    let done = completed_project(&harness).await;
    let before = snapshot(&harness, &done.slug);

    harness
        .controller()
        .regenerate("video".parse().unwrap(), Some(&done.slug))
        .await
        .unwrap();

    let after = snapshot(&harness, &done.slug);
    for (kind, bytes) in &after {
        let changed = bytes != &before[kind];
        if *kind == ArtifactKind::Video {
            assert!(changed, "video should have been re-rendered");
        } else {
            assert!(!changed, "{kind} should be byte-identical");
        }
    }

    assert_eq!(harness.backend.call_count("image"), 1);
    assert_eq!(harness.backend.call_count("speech"), 6);
    assert_eq!(harness.backend.call_count("music"), 1);
    assert_eq!(harness.backend.call_count("render"), 2);
}

// ---------------------------------------------------------------------------
// intro -> intro, music, video (speech feeds the duration, duration feeds
// the music)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn intro_regen_cascades_to_music() {
    let harness = TestHarness::new();
    let done = completed_project(&harness).await;
    let before = snapshot(&harness, &done.slug);

    harness
        .controller()
        .regenerate("intro".parse().unwrap(), Some(&done.slug))
        .await
        .unwrap();

    let after = snapshot(&harness, &done.slug);
    for (kind, bytes) in &after {
        let changed = bytes != &before[kind];
        match kind {
            ArtifactKind::Intro | ArtifactKind::Music | ArtifactKind::Video => {
                assert!(changed, "{kind} should have been regenerated")
            }
            _ => assert!(!changed, "{kind} should be byte-identical"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error cases
// ---------------------------------------------------------------------------

#[tokio::test]
async fn word_index_out_of_range_is_rejected() {
    let harness = TestHarness::new();
    let done = completed_project(&harness).await;

    let err = harness
        .controller()
        .regenerate("word:9".parse().unwrap(), Some(&done.slug))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Nothing was invalidated by the rejected request.
    let conn = harness.conn();
    let project = queries::projects::get_project_by_slug(&conn, &done.slug).unwrap();
    assert_eq!(project.status, ProjectStatus::Completed);
    assert_eq!(
        queries::artifacts::artifacts_for_project(&conn, project.id)
            .unwrap()
            .len(),
        9
    );
}

#[tokio::test]
async fn video_regen_on_plan_ready_project_fails_in_composing() {
    let harness = TestHarness::new();

    // A project whose plan is durable but whose assets were never
    // generated, as an operator would see after a crash between the
    // planning and asset stages.
    let slug = {
        let conn = harness.conn();
        let project = queries::projects::create_project(&conn, "five words").unwrap();
        queries::projects::set_status(&conn, project.id, ProjectStatus::Planning).unwrap();
        let asset_dir = harness.config.output_dir.join("plan-ready");
        std::fs::create_dir_all(&asset_dir).unwrap();
        queries::projects::store_plan(
            &conn,
            project.id,
            "plan-ready",
            &asset_dir.to_string_lossy(),
            &common::sample_plan(5),
        )
        .unwrap();
        "plan-ready".to_string()
    };

    // A video-only request legitimately enters composing, then fails on
    // the missing upstream clips rather than on the transition itself.
    let err = harness
        .controller()
        .regenerate("video".parse().unwrap(), Some(&slug))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceMissing(_)));

    let conn = harness.conn();
    let project = queries::projects::get_project_by_slug(&conn, &slug).unwrap();
    assert_eq!(project.status, ProjectStatus::Failed);
    assert_eq!(project.failed_stage, Some(wordreel_common::Stage::Composing));
    assert!(project.failure_reason.is_some());
}

#[tokio::test]
async fn regenerate_without_plan_is_rejected() {
    let harness = TestHarness::new();
    let controller = harness.controller();

    harness
        .backend
        .fail_next("plan", Error::validation("broken"));
    controller.new_project("five words").await.unwrap_err();

    let err = controller
        .regenerate("full".parse().unwrap(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn unknown_scope_string_is_rejected() {
    assert!("everything"
        .parse::<wordreel::regen::RegenerationScope>()
        .is_err());
}
