use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wordreel")]
#[command(author, version, about = "Language-learning short-video generation pipeline")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a project from a prompt and run it to completion
    New {
        /// Free-text description of the video to generate
        #[arg(required = true)]
        prompt: String,
    },

    /// Resume a failed project from the stage that failed
    Resume {
        /// Project slug (defaults to the most recently failed project)
        slug: Option<String>,
    },

    /// Invalidate and regenerate artifacts of an existing project
    Regenerate {
        /// What to regenerate: full, video, background, intro, music,
        /// words, or word:N
        #[arg(required = true)]
        scope: String,

        /// Project slug (defaults to the most recently modified project)
        slug: Option<String>,
    },

    /// Show a project's status, plan, and artifacts
    Show {
        /// Project slug (defaults to the most recently modified project)
        slug: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a project's audit log
    Logs {
        /// Project slug (defaults to the most recently modified project)
        slug: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
