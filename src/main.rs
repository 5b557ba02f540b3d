//! Social Insight - social-network dataset integration CLI
//!
//! Loads the four source tables, builds the integrated per-user dataset
//! and writes a report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any failure (config, loading, degenerate input, writing output)

mod cli;
mod config;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use social_insight::loader::Loader;
use social_insight::pipeline::Pipeline;
use social_insight::report::{self, Insights, Report, ReportMetadata};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Social Insight v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .social-insight.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to point at local tables or change report settings.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over `--verbose`/`--quiet` when set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(args.log_level()).into())
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete load, build and report workflow.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let sources = config.source_set();
    let output_path = config.output_path();

    // Step 1: Load and build
    println!("📥 Loading tables...");
    println!("   Users: {}", sources.users);
    println!("   Friendships: {}", sources.friendships);
    println!("   Posts: {}", sources.posts);
    println!("   Reactions: {}", sources.reactions);
    if sources.any_remote() {
        println!("   Timeout: {}s", config.loader.timeout_seconds);
    }

    let loader = Loader::new(config.loader_options(!args.quiet))
        .context("Failed to initialize loader")?;
    let mut pipeline = Pipeline::new(loader);
    let dataset = pipeline
        .run(&sources)
        .await
        .context("Failed to build the integrated dataset")?;

    let cleaning = &dataset.cleaning;
    println!("\n🧹 Cleaning:");
    println!(
        "   Reactions: {} in, {} dropped (missing user), {} types filled, {} dates filled, {} duplicates removed",
        cleaning.reactions.rows_in,
        cleaning.reactions.missing_actor_dropped,
        cleaning.reactions.types_filled,
        cleaning.reactions.dates_filled,
        cleaning.reactions.duplicates_removed
    );

    // Step 2: Build the report
    println!("\n📝 Generating report...");

    let filter = config.user_filter();
    if !filter.is_empty() {
        info!("Filtered summary: {:?}", filter);
    }
    let insights = Insights::compute(&dataset, config.report.top_n, filter);
    let duration = start_time.elapsed().as_secs_f64();

    let output = match config.report.format {
        OutputFormat::Csv => report::generate_csv_table(&dataset.users)?,
        format => {
            let report = Report {
                metadata: ReportMetadata {
                    generated_at: Utc::now(),
                    users_source: sources.users.to_string(),
                    friendships_source: sources.friendships.to_string(),
                    posts_source: sources.posts.to_string(),
                    reactions_source: sources.reactions.to_string(),
                    duration_seconds: duration,
                },
                cleaning: dataset.cleaning,
                insights: insights.clone(),
            };
            if format == OutputFormat::Json {
                report::generate_json_report(&report)?
            } else {
                report::generate_markdown_report(&report)
            }
        }
    };

    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    let overview = &insights.overview;
    println!("\n📊 Summary:");
    println!(
        "   👥 Users: {} | 🤝 Friendships: {} | 📝 Posts: {} | 💝 Reactions: {}",
        overview.total_users,
        overview.total_friendships,
        overview.total_posts,
        overview.total_reactions
    );
    if let Some(group) = insights.key_insights.most_active_age_group {
        println!("   Most active age group: {}", group);
    }
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Done! Output saved to: {}", output_path.display());

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
