//! The pipeline controller.
//!
//! Owns stage sequencing, the retry/rotation policy around external
//! calls, and the concurrent asset fan-out. Every stage entry writes a
//! durable status transition and an audit log entry before the stage body
//! runs, so an interrupted run can always tell where it stopped. All
//! database writes for a project happen on the controller's own task;
//! spawned asset tasks only produce files and report back.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use wordreel_common::paths::derive_slug;
use wordreel_common::{
    ArtifactKind, Error, LogLevel, ProjectLayout, ProjectStatus, Result, Stage, VideoPlan,
};
use wordreel_db::models::Project;
use wordreel_db::pool::{DbPool, PooledConnection};
use wordreel_db::queries;

use crate::artifacts::{self, provenance, ArtifactSet};
use crate::config::{Config, RetryConfig};
use crate::credentials::CredentialPool;
use crate::producer::{AssetProducer, Compositor, PlanProducer};
use crate::regen::{self, RegenerationScope};

use super::duration::compute_duration;

/// Summary handed back to the caller once a project reaches Completed.
#[derive(Debug, Clone)]
pub struct CompletedProject {
    pub slug: String,
    pub video_path: PathBuf,
    pub title: String,
    pub description: String,
    pub hashtags: Vec<String>,
    pub duration_secs: f64,
}

pub struct PipelineController {
    pool: DbPool,
    credentials: Arc<CredentialPool>,
    plan_producer: Arc<dyn PlanProducer>,
    asset_producer: Arc<dyn AssetProducer>,
    compositor: Arc<dyn Compositor>,
    config: Config,
}

/// Result of one concurrent asset task, applied to the database by the
/// controller after the task joins.
struct GeneratedAsset {
    kind: ArtifactKind,
    path: PathBuf,
    provenance: String,
    duration_secs: Option<f64>,
}

/// One stale artifact the fan-out needs to produce.
struct PendingAsset {
    kind: ArtifactKind,
    prompt: String,
    expected: String,
}

impl PipelineController {
    pub fn new(
        pool: DbPool,
        credentials: Arc<CredentialPool>,
        plan_producer: Arc<dyn PlanProducer>,
        asset_producer: Arc<dyn AssetProducer>,
        compositor: Arc<dyn Compositor>,
        config: Config,
    ) -> Self {
        Self {
            pool,
            credentials,
            plan_producer,
            asset_producer,
            compositor,
            config,
        }
    }

    fn conn(&self) -> Result<PooledConnection> {
        self.pool.get().map_err(|e| Error::database(e.to_string()))
    }

    /// Create a project from a prompt and drive it to completion.
    pub async fn new_project(&self, prompt: &str) -> Result<CompletedProject> {
        let project = {
            let conn = self.conn()?;
            let project = queries::projects::create_project(&conn, prompt)?;
            queries::logs::append_log(
                &conn,
                project.id,
                LogLevel::Info,
                "project created",
                Some(&serde_json::json!({ "prompt": prompt })),
            )?;
            project
        };
        tracing::info!(project_id = %project.id, "created project");

        self.run_from(project, Stage::Planning).await
    }

    /// Resume a project: the named one, or the most recently failed one.
    ///
    /// A failed project re-enters exactly the stage recorded in its
    /// failure context. Resuming a project that is not failed re-enters
    /// whatever its persisted status implies; completed fresh artifacts
    /// are skipped either way.
    pub async fn resume(&self, slug: Option<&str>) -> Result<CompletedProject> {
        let project = self.select_project(slug, true)?;

        let stage = match project.status {
            ProjectStatus::Failed => project.failed_stage.unwrap_or(if project.plan.is_some() {
                Stage::GeneratingAssets
            } else {
                Stage::Planning
            }),
            ProjectStatus::Created | ProjectStatus::Planning => Stage::Planning,
            ProjectStatus::PlanReady | ProjectStatus::GeneratingAssets => Stage::GeneratingAssets,
            ProjectStatus::Composing | ProjectStatus::Completed => Stage::Composing,
        };

        {
            let conn = self.conn()?;
            queries::logs::append_log(
                &conn,
                project.id,
                LogLevel::Info,
                "resuming project",
                Some(&serde_json::json!({
                    "from_status": project.status.to_string(),
                    "stage": stage.to_string(),
                })),
            )?;
        }
        tracing::info!(slug = %project.slug, %stage, "resuming project");

        self.run_from(project, stage).await
    }

    /// Invalidate the artifacts covered by `scope` on the named project
    /// (or the most recently modified one) and re-run the pipeline from
    /// the appropriate stage. The persisted plan is kept even for `Full`.
    pub async fn regenerate(
        &self,
        scope: RegenerationScope,
        slug: Option<&str>,
    ) -> Result<CompletedProject> {
        let project = self.select_project(slug, false)?;
        let plan = project.plan.clone().ok_or_else(|| {
            Error::validation(format!(
                "project '{}' has no plan yet; use resume instead",
                project.slug
            ))
        })?;

        let layout = self.layout_for(&project)?;
        let kinds = regen::invalidation_set(scope, plan.word_pairs.len())?;

        {
            let conn = self.conn()?;
            for kind in &kinds {
                artifacts::invalidate(&conn, project.id, &layout, *kind)?;
            }
            queries::logs::append_log(
                &conn,
                project.id,
                LogLevel::Info,
                "regeneration requested",
                Some(&serde_json::json!({
                    "scope": scope.to_string(),
                    "invalidated": kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
                })),
            )?;
        }
        tracing::info!(slug = %project.slug, %scope, invalidated = kinds.len(), "regenerating");

        self.run_from(project, scope.entry_stage()).await
    }

    fn select_project(&self, slug: Option<&str>, prefer_failed: bool) -> Result<Project> {
        let conn = self.conn()?;
        match slug {
            Some(slug) => queries::projects::get_project_by_slug(&conn, slug),
            None if prefer_failed => queries::projects::latest_failed_project(&conn)?
                .ok_or_else(|| Error::not_found("no failed project to resume")),
            None => queries::projects::latest_project(&conn)?
                .ok_or_else(|| Error::not_found("no projects exist yet")),
        }
    }

    fn layout_for(&self, project: &Project) -> Result<ProjectLayout> {
        let dir = project.asset_dir.as_deref().ok_or_else(|| {
            Error::internal(format!(
                "project '{}' has a plan but no asset directory",
                project.slug
            ))
        })?;
        Ok(ProjectLayout::from_dir(dir))
    }

    /// Execute the stage chain starting at `entry`. Each stage durably
    /// transitions status and logs before running; a stage error records
    /// failure context and propagates.
    async fn run_from(&self, mut project: Project, entry: Stage) -> Result<CompletedProject> {
        if entry == Stage::Planning {
            self.enter_stage(&project, Stage::Planning)?;
            project = match self.plan_project(&project).await {
                Ok(updated) => updated,
                Err(e) => return Err(self.fail_stage(&project, Stage::Planning, e)),
            };
        }

        if entry != Stage::Composing {
            self.enter_stage(&project, Stage::GeneratingAssets)?;
            if let Err(e) = self.generate_assets(&project).await {
                return Err(self.fail_stage(&project, Stage::GeneratingAssets, e));
            }
        }

        self.enter_stage(&project, Stage::Composing)?;
        match self.compose(&project).await {
            Ok(done) => Ok(done),
            Err(e) => Err(self.fail_stage(&project, Stage::Composing, e)),
        }
    }

    fn enter_stage(&self, project: &Project, stage: Stage) -> Result<()> {
        let conn = self.conn()?;
        queries::projects::set_status(&conn, project.id, stage.status())?;
        queries::logs::append_log(
            &conn,
            project.id,
            LogLevel::Info,
            &format!("stage {stage} started"),
            None,
        )?;
        tracing::info!(project_id = %project.id, %stage, "entering stage");
        Ok(())
    }

    fn fail_stage(&self, project: &Project, stage: Stage, err: Error) -> Error {
        tracing::error!(project_id = %project.id, %stage, error = %err, "stage failed");

        let record = || -> Result<()> {
            let conn = self.conn()?;
            queries::projects::mark_failed(&conn, project.id, stage, &err.to_string())?;
            queries::logs::append_log(
                &conn,
                project.id,
                LogLevel::Error,
                &format!("stage {stage} failed: {err}"),
                None,
            )?;
            Ok(())
        };
        if let Err(db_err) = record() {
            tracing::error!(error = %db_err, "could not record failure context");
        }

        err
    }

    /// Planning stage: one plan-producer call (with rotation), validation,
    /// then plan + slug + asset directory persisted atomically with the
    /// transition to PlanReady.
    async fn plan_project(&self, project: &Project) -> Result<Project> {
        let producer = self.plan_producer.clone();
        let prompt = project.prompt.clone();

        let plan = call_with_rotation(
            &self.credentials,
            &self.config.retry,
            "generate_plan",
            |key| {
                let producer = producer.clone();
                let prompt = prompt.clone();
                async move { producer.generate_plan(&key, &prompt).await }
            },
        )
        .await?;
        plan.validate()?;

        let slug = derive_slug(&plan.project_slug, project.created_at);
        let layout = ProjectLayout::new(&self.config.output_dir, &slug);
        std::fs::create_dir_all(layout.root())?;

        let conn = self.conn()?;
        queries::projects::store_plan(
            &conn,
            project.id,
            &slug,
            &layout.root().to_string_lossy(),
            &plan,
        )?;
        queries::logs::append_log(
            &conn,
            project.id,
            LogLevel::Success,
            "plan stored",
            Some(&serde_json::to_value(&plan).map_err(|e| Error::internal(e.to_string()))?),
        )?;
        tracing::info!(%slug, words = plan.word_pairs.len(), "plan stored");

        queries::projects::get_project(&conn, project.id)
    }

    /// Asset stage: image, intro, and word clips fan out concurrently
    /// (bounded); fresh artifacts are skipped. Music runs after the
    /// fan-out because its target length is the computed duration, which
    /// needs every speech clip's length.
    async fn generate_assets(&self, project: &Project) -> Result<()> {
        let plan = required_plan(project)?;
        let layout = self.layout_for(project)?;
        std::fs::create_dir_all(layout.root())?;

        let pending = {
            let conn = self.conn()?;
            let set = ArtifactSet::load(&conn, project.id)?;
            stale_independent_assets(&plan, &set)?
        };

        if !pending.is_empty() {
            self.run_asset_tasks(project, &layout, pending).await?;
        }

        // Every speech clip now has a recorded length; size the music to
        // the computed video duration.
        let conn = self.conn()?;
        let set = ArtifactSet::load(&conn, project.id)?;
        let (intro_secs, word_secs) = recorded_clip_lengths(&plan, &set)?;
        let duration = compute_duration(intro_secs, &word_secs, &self.config.timing);

        let music_expected = provenance::music(&plan, duration);
        if set.is_fresh(ArtifactKind::Music, &music_expected) {
            return Ok(());
        }
        drop(set);
        drop(conn);

        let out = layout.music();
        let producer = self.asset_producer.clone();
        let music_prompt = plan.music_prompt.clone();
        call_with_rotation(
            &self.credentials,
            &self.config.retry,
            "generate_music",
            |key| {
                let producer = producer.clone();
                let prompt = music_prompt.clone();
                let out = out.clone();
                async move { producer.generate_music(&key, &prompt, duration, &out).await }
            },
        )
        .await?;

        let conn = self.conn()?;
        queries::artifacts::upsert_artifact(
            &conn,
            project.id,
            ArtifactKind::Music,
            &out.to_string_lossy(),
            &music_expected,
            Some(duration),
        )?;
        queries::logs::append_log(
            &conn,
            project.id,
            LogLevel::Success,
            "generated music",
            Some(&serde_json::json!({ "target_secs": duration })),
        )?;

        Ok(())
    }

    /// Spawn one bounded task per stale independent artifact and apply
    /// results to the database as they join. The first task error aborts
    /// the remaining tasks; already-joined artifacts stay persisted so a
    /// resume picks up where this run stopped.
    async fn run_asset_tasks(
        &self,
        project: &Project,
        layout: &ProjectLayout,
        pending: Vec<PendingAsset>,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.assets.max_concurrent));
        let mut join_set: JoinSet<Result<GeneratedAsset>> = JoinSet::new();

        for task in pending {
            let semaphore = semaphore.clone();
            let producer = self.asset_producer.clone();
            let credentials = self.credentials.clone();
            let retry = self.config.retry.clone();
            let out = layout.path_for(task.kind);

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::internal(format!("asset semaphore closed: {e}")))?;

                let duration_secs = match task.kind {
                    ArtifactKind::Image => {
                        call_with_rotation(&credentials, &retry, "generate_image", |key| {
                            let producer = producer.clone();
                            let prompt = task.prompt.clone();
                            let out = out.clone();
                            async move { producer.generate_image(&key, &prompt, &out).await }
                        })
                        .await?;
                        None
                    }
                    ArtifactKind::Intro | ArtifactKind::SpeechUnit(_) => {
                        let secs =
                            call_with_rotation(&credentials, &retry, "generate_speech", |key| {
                                let producer = producer.clone();
                                let text = task.prompt.clone();
                                let out = out.clone();
                                async move { producer.generate_speech(&key, &text, &out).await }
                            })
                            .await?;
                        Some(secs)
                    }
                    other => {
                        return Err(Error::internal(format!(
                            "artifact {other} cannot be generated in the asset fan-out"
                        )))
                    }
                };

                Ok(GeneratedAsset {
                    kind: task.kind,
                    path: out,
                    provenance: task.expected,
                    duration_secs,
                })
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let asset =
                joined.map_err(|e| Error::internal(format!("asset task panicked: {e}")))??;

            let conn = self.conn()?;
            queries::artifacts::upsert_artifact(
                &conn,
                project.id,
                asset.kind,
                &asset.path.to_string_lossy(),
                &asset.provenance,
                asset.duration_secs,
            )?;
            queries::logs::append_log(
                &conn,
                project.id,
                LogLevel::Success,
                &format!("generated {}", asset.kind),
                Some(&serde_json::json!({
                    "path": asset.path.to_string_lossy(),
                    "duration_secs": asset.duration_secs,
                })),
            )?;
        }

        Ok(())
    }

    /// Composing stage: every upstream artifact must be complete (a gap
    /// here is a planner bug, never silently substituted), then the video
    /// is rendered unless it is already fresh.
    async fn compose(&self, project: &Project) -> Result<CompletedProject> {
        let plan = required_plan(project)?;
        let layout = self.layout_for(project)?;

        let (duration, video_expected, video_fresh) = {
            let conn = self.conn()?;
            let set = ArtifactSet::load(&conn, project.id)?;

            let mut upstream_kinds = vec![ArtifactKind::Image, ArtifactKind::Intro];
            upstream_kinds.extend((0..plan.word_pairs.len()).map(ArtifactKind::SpeechUnit));
            upstream_kinds.push(ArtifactKind::Music);

            let mut upstream = Vec::with_capacity(upstream_kinds.len());
            for kind in upstream_kinds {
                if !set.is_complete(kind) {
                    return Err(Error::resource_missing(format!(
                        "{kind} ({})",
                        layout.path_for(kind).display()
                    )));
                }
                let record = set.record(kind).ok_or_else(|| {
                    Error::internal(format!("artifact {kind} complete but has no record"))
                })?;
                upstream.push(record.provenance.clone());
            }

            let (intro_secs, word_secs) = recorded_clip_lengths(&plan, &set)?;
            let duration = compute_duration(intro_secs, &word_secs, &self.config.timing);

            let expected = provenance::video(&upstream, &self.config.timing);
            let fresh = set.is_fresh(ArtifactKind::Video, &expected);
            (duration, expected, fresh)
        };

        if video_fresh {
            tracing::info!(slug = %project.slug, "final video already fresh, skipping render");
        } else {
            self.compositor
                .render(&plan, &layout, &self.config.timing, duration, &layout.video())
                .await?;

            let conn = self.conn()?;
            queries::artifacts::upsert_artifact(
                &conn,
                project.id,
                ArtifactKind::Video,
                &layout.video().to_string_lossy(),
                &video_expected,
                Some(duration),
            )?;
            queries::logs::append_log(
                &conn,
                project.id,
                LogLevel::Success,
                "rendered final video",
                Some(&serde_json::json!({
                    "path": layout.video().to_string_lossy(),
                    "duration_secs": duration,
                })),
            )?;
        }

        let conn = self.conn()?;
        queries::projects::set_status(&conn, project.id, ProjectStatus::Completed)?;
        queries::logs::append_log(
            &conn,
            project.id,
            LogLevel::Success,
            "project completed",
            None,
        )?;
        tracing::info!(slug = %project.slug, duration_secs = duration, "project completed");

        Ok(CompletedProject {
            slug: project.slug.clone(),
            video_path: layout.video(),
            title: plan.video_title,
            description: plan.video_description,
            hashtags: plan.hashtags,
            duration_secs: duration,
        })
    }
}

fn required_plan(project: &Project) -> Result<VideoPlan> {
    project.plan.clone().ok_or_else(|| {
        Error::internal(format!(
            "project '{}' entered an asset stage without a plan",
            project.slug
        ))
    })
}

/// The independent (non-music, non-video) artifacts that are not fresh,
/// with the prompt text and expected provenance each will be generated
/// against.
fn stale_independent_assets(plan: &VideoPlan, set: &ArtifactSet) -> Result<Vec<PendingAsset>> {
    let mut pending = Vec::new();

    let expected = provenance::image(plan);
    if !set.is_fresh(ArtifactKind::Image, &expected) {
        pending.push(PendingAsset {
            kind: ArtifactKind::Image,
            prompt: plan.image_prompt.clone(),
            expected,
        });
    }

    let expected = provenance::intro(plan);
    if !set.is_fresh(ArtifactKind::Intro, &expected) {
        pending.push(PendingAsset {
            kind: ArtifactKind::Intro,
            prompt: plan.intro_text.clone(),
            expected,
        });
    }

    for (i, pair) in plan.word_pairs.iter().enumerate() {
        let expected = provenance::word(plan, i)?;
        if !set.is_fresh(ArtifactKind::SpeechUnit(i), &expected) {
            pending.push(PendingAsset {
                kind: ArtifactKind::SpeechUnit(i),
                prompt: pair.target_word.clone(),
                expected,
            });
        }
    }

    Ok(pending)
}

/// Recorded clip lengths for the intro and every word, in plan order.
fn recorded_clip_lengths(plan: &VideoPlan, set: &ArtifactSet) -> Result<(f64, Vec<f64>)> {
    let intro_secs = set
        .duration_of(ArtifactKind::Intro)
        .ok_or_else(|| Error::internal("intro clip has no recorded duration"))?;

    let word_secs = (0..plan.word_pairs.len())
        .map(|i| {
            set.duration_of(ArtifactKind::SpeechUnit(i))
                .ok_or_else(|| Error::internal(format!("word clip {i} has no recorded duration")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((intro_secs, word_secs))
}

/// Run one external call under the retry/rotation policy.
///
/// Rate limits put the credential on cooldown and rotate to the next one;
/// transient network failures retry the same credential a bounded number
/// of times before rotating; anything else is fatal. The total attempt
/// count is bounded by `retry.max_attempts`.
pub(crate) async fn call_with_rotation<T, F, Fut>(
    credentials: &CredentialPool,
    retry: &RetryConfig,
    what: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_wait = Duration::from_secs(retry.max_credential_wait_secs);
    let mut attempts = 0u32;
    let mut same_key_retries = 0u32;
    let mut current_key: Option<String> = None;

    loop {
        let key = match current_key.take() {
            Some(key) => key,
            None => credentials.acquire(max_wait).await?,
        };
        attempts += 1;

        match call(key.clone()).await {
            Ok(value) => {
                credentials.report_success(&key);
                return Ok(value);
            }
            Err(e) if e.is_rate_limit() && attempts < retry.max_attempts => {
                let hint = match &e {
                    Error::RateLimited { retry_after_secs } => {
                        retry_after_secs.map(Duration::from_secs)
                    }
                    _ => None,
                };
                credentials.report_rate_limited(&key, hint);
                same_key_retries = 0;
                tracing::warn!(what, attempt = attempts, "rate limited, rotating credential");
            }
            Err(e) if e.is_transient() && attempts < retry.max_attempts => {
                if same_key_retries < retry.transient_retries {
                    same_key_retries += 1;
                    current_key = Some(key);
                    tracing::warn!(what, attempt = attempts, "transient failure, retrying");
                } else {
                    same_key_retries = 0;
                    tracing::warn!(
                        what,
                        attempt = attempts,
                        "transient retries exhausted, rotating credential"
                    );
                }
            }
            Err(e) => return Err(e),
        }
    }
}
