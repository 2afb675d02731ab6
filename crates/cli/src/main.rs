mod commands;
mod logging;
mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use navload_orm::seed::{seed_demo_data, seed_generated};
use navload_orm::{blog_schema, InMemoryStore, Loader, NavloadConfig};

use logging::LoggingConfig;
use render::Output;

#[derive(Parser)]
#[command(name = "navload")]
#[command(about = "Relationship loading strategies and their round-trip cost")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Generate this many blogs instead of the three demo blogs
    #[arg(long, global = true)]
    blogs: Option<usize>,

    /// Posts per generated blog
    #[arg(long, global = true, default_value = "5")]
    posts_per_blog: usize,

    /// Comments per generated post
    #[arg(long, global = true, default_value = "3")]
    comments_per_post: usize,

    /// Simulated latency per round trip (overrides NAVLOAD_LATENCY_MS)
    #[arg(long, global = true)]
    latency_ms: Option<u64>,

    /// Fail round trips slower than this (overrides NAVLOAD_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Log level (overrides NAVLOAD_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Full tracing filter, e.g. "navload_orm=debug"
    #[arg(long, global = true)]
    log_filter: Option<String>,

    /// Emit logs as JSON (overrides NAVLOAD_LOG_JSON)
    #[arg(long, global = true)]
    json_logs: bool,

    /// Show every round trip the loader issues
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Print results as JSON instead of a tree
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what was seeded
    Seed,

    /// Lazy loading: one round trip per blog when its posts are touched
    NPlusOne,

    /// Eager loading of Posts: two round trips in total
    Eager,

    /// Eager loading of Posts.Comments: one round trip per level
    Nested,

    /// Eager loading of recent posts only
    Filtered {
        /// Keep posts published within this many days
        #[arg(long, default_value = "15")]
        days: i64,
    },

    /// Posts and Tags as separate round trips
    Split,

    /// Post counts and the most recent posts per blog
    Projection {
        /// Recent posts kept per blog
        #[arg(long, default_value = "2")]
        top: usize,
    },

    /// Explicit loading per blog, then for the whole set
    Explicit,

    /// Batch loading through filtered scans grouped in memory
    Batch,

    /// Load any entity with any strategy and include paths
    Load {
        /// Root entity
        entity: String,

        /// lazy, eager, explicit or batch
        #[arg(long, short, default_value = "eager")]
        strategy: String,

        /// Include paths such as Posts.Comments or "Posts[Title != 'x']"
        #[arg(long, short)]
        include: Vec<String>,

        /// Load a single root by key
        #[arg(long)]
        key: Option<i64>,
    },

    /// Run every strategy for Posts and compare round trips
    Compare,
}

/// Shared state of one CLI run
pub struct App {
    pub store: Arc<InMemoryStore>,
    pub loader: Loader,
    pub output: Output,
}

fn load_config(args: &GlobalArgs) -> anyhow::Result<NavloadConfig> {
    let mut config = NavloadConfig::from_env().context("invalid NAVLOAD_* environment")?;

    if let Some(ms) = args.latency_ms {
        config.source.latency = Duration::from_millis(ms);
    }
    if let Some(ms) = args.timeout_ms {
        config.source.timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.to_lowercase();
    }
    if args.json_logs {
        config.log_json = true;
    }

    config.validate()?;
    Ok(config)
}

async fn build_app(args: &GlobalArgs, config: &NavloadConfig) -> anyhow::Result<App> {
    let schema = Arc::new(blog_schema()?);
    let store = Arc::new(InMemoryStore::with_config(schema.clone(), config.source.clone()));

    match args.blogs {
        Some(blogs) => {
            seed_generated(store.as_ref(), blogs, args.posts_per_blog, args.comments_per_post).await?;
        }
        None => {
            seed_demo_data(store.as_ref()).await?;
        }
    }

    let loader = Loader::with_config(schema, store.clone(), config.engine.clone());
    let output = if args.json { Output::Json } else { Output::Text };
    Ok(App { store, loader, output })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.global)?;

    let mut logging = if cli.global.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::from_config(&config)
    };
    logging.json_format = config.log_json;
    if let Some(filter) = &cli.global.log_filter {
        logging = logging.with_env_filter(filter.clone());
    }
    logging::init_logging(&logging)?;

    let app = build_app(&cli.global, &config).await?;

    match cli.command {
        Commands::Seed => commands::seed::run(&app).await?,
        Commands::NPlusOne => commands::strategies::n_plus_one(&app).await?,
        Commands::Eager => commands::strategies::eager(&app).await?,
        Commands::Nested => commands::strategies::nested(&app).await?,
        Commands::Filtered { days } => commands::strategies::filtered(&app, days).await?,
        Commands::Split => commands::strategies::split(&app).await?,
        Commands::Projection { top } => commands::projection::run(&app, top).await?,
        Commands::Explicit => commands::strategies::explicit(&app).await?,
        Commands::Batch => commands::strategies::batch(&app).await?,
        Commands::Load {
            entity,
            strategy,
            include,
            key,
        } => commands::strategies::load(&app, &entity, &strategy, &include, key).await?,
        Commands::Compare => commands::compare::run(&app).await?,
    }

    Ok(())
}
