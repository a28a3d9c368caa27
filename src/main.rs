use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod behavior;
mod config;
mod db;
mod engine;
mod error;
mod http;
mod memory;
mod models;
mod policy;
mod positive;
mod report;
mod scoring;
mod store;
mod tier;

use config::Config;
use engine::{parse_student_id, FixedClock, RecommendationEngine};
use memory::MemoryStore;
use store::RecommendationStore;

#[derive(Parser)]
#[command(name = "student-recommendations")]
#[command(about = "Behavior and positive-action recommendations for students", long_about = None)]
struct Cli {
    /// Config file (defaults to ./recommendations.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import activity records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate recommendations for one student
    Recommend {
        #[arg(long)]
        student_id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write output to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Read data from a JSON snapshot instead of Postgres
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Evaluate the window as of this RFC 3339 timestamp instead of now
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
    },
    /// Serve recommendations over HTTP
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).compact())
            .try_init()
            .ok();
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(config.server.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, if cli.verbose { Level::DEBUG } else { Level::INFO });

    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} activities from {}.", csv.display());
        }
        Commands::Recommend {
            student_id,
            format,
            out,
            fixture,
            as_of,
        } => {
            let student_id = parse_student_id(&student_id)?;
            let store: Arc<dyn RecommendationStore> = match fixture {
                Some(path) => Arc::new(MemoryStore::load(&path)?),
                None => Arc::new(db::PgStore::new(connect(&config).await?)),
            };
            let engine = match as_of {
                Some(instant) => {
                    RecommendationEngine::with_clock(store, &config, Arc::new(FixedClock(instant)))
                }
                None => RecommendationEngine::new(store, &config),
            };

            let set = engine.comprehensive_recommendations(student_id).await?;
            let rendered = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&set)?,
                OutputFormat::Markdown => {
                    let profile = engine.profile(student_id).await?;
                    report::build_report(&profile, &set)
                }
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Recommendations written to {}.", path.display());
                }
                None => println!("{rendered}"),
            }
        }
        Commands::Serve { bind } => {
            let pool = connect(&config).await?;
            let engine = RecommendationEngine::new(Arc::new(db::PgStore::new(pool)), &config);
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            info!(window_days = config.analysis.window_days, "engine configured");
            http::serve(engine, &bind).await?;
        }
    }

    Ok(())
}
