//! Project status machine, pipeline stages, artifact kinds, and log levels.
//!
//! `ProjectStatus::can_transition_to` is the single source of truth for the
//! state machine; the store refuses any update that it rejects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Lifecycle status of a generation project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Row exists, no plan yet.
    Created,
    /// Plan producer invoked.
    Planning,
    /// Plan is durable; no artifacts required yet.
    PlanReady,
    /// Per-artifact generation in progress.
    GeneratingAssets,
    /// Final render in progress.
    Composing,
    /// Terminal success.
    Completed,
    /// Terminal until resumed; failure context recorded on the project.
    Failed,
}

impl ProjectStatus {
    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Same-status transitions are allowed as no-ops so that re-entering a
    /// stage on resume does not need special casing. Any state may fail.
    /// `Failed` resumes into the stage that failed, and projects holding a
    /// durable plan may re-enter `GeneratingAssets` or `Composing` for
    /// partial regeneration.
    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;

        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (_, Failed)
                | (Created, Planning)
                | (Planning, PlanReady)
                | (Composing, Completed)
                | (Failed, Planning | GeneratingAssets | Composing)
                | (PlanReady | Composing | Completed, GeneratingAssets)
                | (PlanReady | GeneratingAssets | Completed, Composing)
        )
    }

    /// Whether the project is in a terminal state (until acted on again).
    pub fn is_terminal(self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Failed)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectStatus::Created => "created",
            ProjectStatus::Planning => "planning",
            ProjectStatus::PlanReady => "plan_ready",
            ProjectStatus::GeneratingAssets => "generating_assets",
            ProjectStatus::Composing => "composing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ProjectStatus::Created),
            "planning" => Ok(ProjectStatus::Planning),
            "plan_ready" => Ok(ProjectStatus::PlanReady),
            "generating_assets" => Ok(ProjectStatus::GeneratingAssets),
            "composing" => Ok(ProjectStatus::Composing),
            "completed" => Ok(ProjectStatus::Completed),
            "failed" => Ok(ProjectStatus::Failed),
            other => Err(Error::internal(format!("unknown project status: {other}"))),
        }
    }
}

/// The failable stages of the pipeline, recorded in failure context so a
/// resume re-enters exactly the stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Planning,
    GeneratingAssets,
    Composing,
}

impl Stage {
    /// The project status a pipeline run holds while executing this stage.
    pub fn status(self) -> ProjectStatus {
        match self {
            Stage::Planning => ProjectStatus::Planning,
            Stage::GeneratingAssets => ProjectStatus::GeneratingAssets,
            Stage::Composing => ProjectStatus::Composing,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Planning => "planning",
            Stage::GeneratingAssets => "generating_assets",
            Stage::Composing => "composing",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(Stage::Planning),
            "generating_assets" => Ok(Stage::GeneratingAssets),
            "composing" => Ok(Stage::Composing),
            other => Err(Error::internal(format!("unknown stage: {other}"))),
        }
    }
}

/// One generated file tied to a project.
///
/// Speech units are indexed: unit `i` is the spoken clip for word pair `i`.
/// The intro narration is its own artifact since it has its own text source
/// and its own regeneration scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Image,
    Intro,
    SpeechUnit(usize),
    Music,
    Video,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Image => write!(f, "image"),
            ArtifactKind::Intro => write!(f, "intro"),
            ArtifactKind::SpeechUnit(i) => write!(f, "word:{i}"),
            ArtifactKind::Music => write!(f, "music"),
            ArtifactKind::Video => write!(f, "video"),
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(ArtifactKind::Image),
            "intro" => Ok(ArtifactKind::Intro),
            "music" => Ok(ArtifactKind::Music),
            "video" => Ok(ArtifactKind::Video),
            other => match other.strip_prefix("word:") {
                Some(idx) => idx
                    .parse()
                    .map(ArtifactKind::SpeechUnit)
                    .map_err(|_| Error::internal(format!("bad speech unit index: {other}"))),
                None => Err(Error::internal(format!("unknown artifact kind: {other}"))),
            },
        }
    }
}

/// Severity of a durable audit log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "success" => Ok(LogLevel::Success),
            other => Err(Error::internal(format!("unknown log level: {other}"))),
        }
    }
}
