//! Sparkify ETL - load song catalog and activity logs into PostgreSQL

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use sparkify_common::logging::{init_logging, LogConfig, LogLevel};
use sparkify_etl::config::EtlConfig;
use sparkify_etl::db;
use sparkify_etl::loader::LoadStrategy;
use sparkify_etl::pipeline::{DataKind, Pipeline, RunReport};
use std::path::PathBuf;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "sparkify-etl")]
#[command(author, version, about = "Sparkify song play ETL")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// PostgreSQL connection string
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the song catalog, then the activity logs
    Run(LoadArgs),

    /// Load only the song catalog
    Songs {
        /// Root of the catalog files
        #[arg(long)]
        dir: Option<PathBuf>,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Load only the activity logs
    Logs {
        /// Root of the log files
        #[arg(long)]
        dir: Option<PathBuf>,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Create or upgrade the destination tables
    Migrate,
}

#[derive(Args, Debug, Clone)]
struct LoadArgs {
    /// How rows are written
    #[arg(long, value_enum)]
    strategy: Option<LoadStrategy>,

    /// Directory for staging files
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Stop at the first failed file instead of continuing
    #[arg(long)]
    stop_on_error: bool,

    /// Apply migrations before loading
    #[arg(long)]
    migrate: bool,
}

impl LoadArgs {
    fn apply(&self, config: &mut EtlConfig) {
        if let Some(strategy) = self.strategy {
            config.pipeline.strategy = strategy;
        }
        if let Some(dir) = &self.scratch_dir {
            config.pipeline.scratch_dir = dir.clone();
        }
        if self.stop_on_error {
            config.pipeline.continue_on_error = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("sparkify-etl")
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = log_config.merge_env()?;

    let _guard = init_logging(&log_config)?;

    let mut config = EtlConfig::load()?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    let run_id = Uuid::new_v4();
    let span = info_span!("etl", %run_id);

    async move {
        let pool = db::create_pool(&config.database).await?;
        db::health_check(&pool).await?;

        let (load, report) = match cli.command {
            Command::Migrate => {
                db::run_migrations(&pool).await?;
                return Ok(());
            },
            Command::Run(load) => {
                let pipeline = prepare(&pool, &mut config, &load).await?;
                let report = pipeline
                    .run(&pool, &config.pipeline.song_data, &config.pipeline.log_data)
                    .await?;
                (load, report)
            },
            Command::Songs { dir, load } => {
                let pipeline = prepare(&pool, &mut config, &load).await?;
                let dir = dir.unwrap_or_else(|| config.pipeline.song_data.clone());
                let report = pipeline.process_data(&pool, &dir, DataKind::Songs).await?;
                (load, report)
            },
            Command::Logs { dir, load } => {
                let pipeline = prepare(&pool, &mut config, &load).await?;
                let dir = dir.unwrap_or_else(|| config.pipeline.log_data.clone());
                let report = pipeline.process_data(&pool, &dir, DataKind::Logs).await?;
                (load, report)
            },
        };

        summarize(&report, &load)
    }
    .instrument(span)
    .await
}

async fn prepare(pool: &sqlx::PgPool, config: &mut EtlConfig, load: &LoadArgs) -> Result<Pipeline> {
    load.apply(config);
    config.validate()?;

    if load.migrate {
        db::run_migrations(pool).await?;
    }

    info!(
        strategy = %config.pipeline.strategy,
        continue_on_error = config.pipeline.continue_on_error,
        "Starting ETL"
    );
    Ok(Pipeline::from_config(&config.pipeline)?)
}

fn summarize(report: &RunReport, load: &LoadArgs) -> Result<()> {
    for failure in &report.failures {
        warn!(path = %failure.path.display(), error = %failure.error, "Failed file");
    }

    info!(
        found = report.files_found,
        processed = report.files_processed,
        failed = report.failures.len(),
        "ETL finished"
    );

    if !report.is_success() {
        bail!(
            "{} of {} files failed{}",
            report.failures.len(),
            report.files_found,
            if load.stop_on_error { " (stopped early)" } else { "" }
        );
    }
    Ok(())
}
