mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use wordreel::{
    config::{self, Config},
    credentials::CredentialPool,
    pipeline::{CompletedProject, PipelineController},
    producer::FixtureBackend,
    regen::RegenerationScope,
};
use wordreel_db::pool::{get_conn, init_pool, DbPool};
use wordreel_db::queries;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "wordreel=trace,wordreel_db=debug,wordreel_common=debug".to_string()
        } else {
            "wordreel=debug,wordreel_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::New { prompt } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let config = config::load_config_or_default(cli.config.as_deref())?;
                let controller = build_controller(&config)?;
                let done = controller.new_project(&prompt).await?;
                print_completed(&done);
                Ok(())
            })
        }
        Commands::Resume { slug } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let config = config::load_config_or_default(cli.config.as_deref())?;
                let controller = build_controller(&config)?;
                let done = controller.resume(slug.as_deref()).await?;
                print_completed(&done);
                Ok(())
            })
        }
        Commands::Regenerate { scope, slug } => {
            let scope: RegenerationScope = scope.parse()?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let config = config::load_config_or_default(cli.config.as_deref())?;
                let controller = build_controller(&config)?;
                let done = controller.regenerate(scope, slug.as_deref()).await?;
                print_completed(&done);
                Ok(())
            })
        }
        Commands::Show { slug, json } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            show_project(&open_db(&config)?, slug.as_deref(), json)
        }
        Commands::Logs { slug } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            show_logs(&open_db(&config)?, slug.as_deref())
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("wordreel {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_db(config: &Config) -> Result<DbPool> {
    Ok(init_pool(&config.db_path.to_string_lossy())?)
}

/// Wire the controller over the local fixture backend. Real generative
/// backends plug in behind the same traits.
fn build_controller(config: &Config) -> Result<PipelineController> {
    let keys = if config.api_keys.is_empty() {
        // The fixture backend bills nothing; a single placeholder key
        // keeps the rotation machinery exercised.
        vec!["local".to_string()]
    } else {
        config.api_keys.clone()
    };

    let credentials = Arc::new(CredentialPool::new(
        keys,
        Duration::from_secs(config.retry.default_cooldown_secs),
    )?);

    let pool = open_db(config)?;
    let backend = Arc::new(FixtureBackend);

    Ok(PipelineController::new(
        pool,
        credentials,
        backend.clone(),
        backend.clone(),
        backend,
        config.clone(),
    ))
}

fn print_completed(done: &CompletedProject) {
    println!("Completed: {}", done.slug);
    println!("  Video: {}", done.video_path.display());
    println!("  Title: {}", done.title);
    println!("  Duration: {:.1}s", done.duration_secs);
    if !done.hashtags.is_empty() {
        println!("  Hashtags: {}", done.hashtags.join(" "));
    }
}

fn select_project(
    conn: &wordreel_db::pool::PooledConnection,
    slug: Option<&str>,
) -> Result<wordreel_db::models::Project> {
    match slug {
        Some(slug) => Ok(queries::projects::get_project_by_slug(conn, slug)?),
        None => queries::projects::latest_project(conn)?
            .ok_or_else(|| anyhow::anyhow!("no projects exist yet")),
    }
}

fn show_project(pool: &DbPool, slug: Option<&str>, json: bool) -> Result<()> {
    let conn = get_conn(pool)?;
    let project = select_project(&conn, slug)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&project)?);
        return Ok(());
    }

    println!("Project: {}", project.slug);
    println!("  Status: {}", project.status);
    println!("  Prompt: {}", project.prompt);
    if let Some(stage) = project.failed_stage {
        println!("  Failed stage: {}", stage);
    }
    if let Some(ref reason) = project.failure_reason {
        println!("  Failure reason: {}", reason);
    }

    match project.plan {
        Some(ref plan) => {
            println!("  Title: {}", plan.video_title);
            println!(
                "  Languages: {} -> {}",
                plan.source_language, plan.target_language
            );
            println!("  Words: {}", plan.word_pairs.len());
            for (i, pair) in plan.word_pairs.iter().enumerate() {
                println!("    [{}] {} -> {}", i, pair.source_word, pair.target_word);
            }
        }
        None => println!("  (no plan yet)"),
    }

    let artifacts = queries::artifacts::artifacts_for_project(&conn, project.id)?;
    println!("  Artifacts: {}", artifacts.len());
    for record in artifacts {
        let on_disk = std::path::Path::new(&record.file_path).exists();
        let marker = if on_disk { "✓" } else { "✗" };
        print!("    {} {} - {}", marker, record.kind, record.file_path);
        if let Some(secs) = record.duration_secs {
            print!(" ({secs:.2}s)");
        }
        println!();
    }

    Ok(())
}

fn show_logs(pool: &DbPool, slug: Option<&str>) -> Result<()> {
    let conn = get_conn(pool)?;
    let project = select_project(&conn, slug)?;

    let entries = queries::logs::logs_for_project(&conn, project.id)?;
    println!("Audit log for {} ({} entries):", project.slug, entries.len());
    for entry in entries {
        print!(
            "  [{:>4}] {} {:8} {}",
            entry.seq,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.level.to_string(),
            entry.message
        );
        if let Some(ref payload) = entry.payload {
            print!("  {payload}");
        }
        println!();
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Database: {}", config.db_path.display());
            println!("  Output dir: {}", config.output_dir.display());
            println!("  API keys: {}", config.api_keys.len());
            println!("  Max attempts: {}", config.retry.max_attempts);
            println!("  Max concurrent assets: {}", config.assets.max_concurrent);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Database: {}", config.db_path.display());
            println!("  Output dir: {}", config.output_dir.display());
        }
    }

    Ok(())
}
