//! ragline CLI - LINE webhook relay with retrieval-augmented replies.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use ragline::retrieval::{IndexBuilder, Retriever, VectorIndex};
use ragline::server::{router, serve, shutdown_signal};
use ragline_bot::app;
use ragline_bot::config::{self, BotConfig, IssueLevel};
use ragline_bot::error::{BotError, Result};
use ragline_bot::util::{env_status, redacted, truncate_str};
use tokio::net::TcpListener;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

/// ragline - answer LINE messages with OpenAI, grounded on a local index
#[derive(Parser)]
#[command(name = "ragline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "RAGLINE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init(InitArgs),

    /// Run the webhook server
    Serve(ServeArgs),

    /// Build or query the retrieval index
    Index(IndexArgs),

    /// Show configuration and environment status
    Status,

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(short, long)]
    force: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Answer without consulting the retrieval index
    #[arg(long)]
    no_retrieval: bool,
}

#[derive(Args)]
struct IndexArgs {
    #[command(subcommand)]
    command: IndexCommands,
}

#[derive(Subcommand)]
enum IndexCommands {
    /// Embed a corpus file and write the index
    Build(BuildArgs),

    /// Search the index for a query
    Query(QueryArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Corpus file (.txt paragraphs or .jsonl records)
    #[arg(short, long)]
    input: PathBuf,

    /// Index file to write (defaults to retrieval.index_path, then data/index.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Passages embedded per request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Embedding model (overrides config)
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Args)]
struct QueryArgs {
    /// Text to search for
    text: String,

    /// Number of hits to show
    #[arg(short, default_value_t = 3)]
    k: usize,

    /// Index file to search (defaults to retrieval.index_path, then data/index.json)
    #[arg(long)]
    index: Option<PathBuf>,

    /// Print hits as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration with secrets masked
    Show,
    /// Show configuration file path
    Path,
    /// Validate the effective configuration
    Validate,
}

fn main() -> ExitCode {
    // Loaded before parsing so RAGLINE_CONFIG can come from .env.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "failed to load .env"),
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ragline_bot={level},ragline={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let path = cli.config;
    match cli.command {
        Commands::Init(args) => cmd_init(args, path).await,
        Commands::Serve(args) => cmd_serve(args, path).await,
        Commands::Index(args) => match args.command {
            IndexCommands::Build(args) => cmd_index_build(args, path).await,
            IndexCommands::Query(args) => cmd_index_query(args, path).await,
        },
        Commands::Status => cmd_status(path).await,
        Commands::Config(args) => cmd_config(args, path).await,
    }
}

fn resolve_path(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(config::config_path)
}

fn index_path(config: &BotConfig, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| config.retrieval.resolved_index_path())
}

/// Print issues and fail if any is an error.
fn check(config: &BotConfig) -> Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.level {
            IssueLevel::Error => tracing::error!("{issue}"),
            IssueLevel::Warning => warn!("{issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.level == IssueLevel::Error)
        .count();
    if errors > 0 {
        return Err(BotError::config(format!(
            "{errors} configuration error(s), see above"
        )));
    }
    Ok(())
}

async fn cmd_init(args: InitArgs, path: Option<PathBuf>) -> Result<()> {
    let config_file = resolve_path(path);

    if !config::init_config(&config_file, args.force).await? {
        println!("Configuration already exists at: {}", config_file.display());
        println!("Use --force to overwrite.");
        return Ok(());
    }

    println!("Configuration created: {}", config_file.display());
    println!();
    println!("Next steps:");
    println!("  1. export LINE_CHANNEL_ACCESS_TOKEN=<token> LINE_CHANNEL_SECRET=<secret>");
    println!("  2. export OPENAI_API_KEY=<key>");
    println!("  3. ragline index build --input <corpus.txt>   (optional)");
    println!("  4. ragline serve");

    Ok(())
}

async fn cmd_serve(args: ServeArgs, path: Option<PathBuf>) -> Result<()> {
    let mut config = config::load_layered(path.as_deref()).await?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_retrieval {
        config.retrieval.enabled = false;
    }
    check(&config)?;

    let relay = app::relay(&config).await?;
    let routes = router(relay, &app::server_config(&config));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        address = %addr,
        webhook = %config.server.webhook_path,
        model = %config.openai.model,
        retrieval = config.retrieval.enabled,
        "starting ragline"
    );

    serve(listener, routes, shutdown_signal()).await?;
    Ok(())
}

async fn cmd_index_build(args: BuildArgs, path: Option<PathBuf>) -> Result<()> {
    let config = config::load_layered(path.as_deref()).await?;
    let openai = app::openai_client(&config)?;

    let mut builder = IndexBuilder::new(Arc::new(openai));
    if let Some(model) = args.model {
        builder = builder.with_model(model);
    }
    if let Some(batch_size) = args.batch_size {
        builder = builder.with_batch_size(batch_size);
    }

    let output = index_path(&config, args.output);
    let file = builder.build_from_path(&args.input).await?;
    file.save(&output).await?;

    println!(
        "Indexed {} passages ({}, {} dimensions) into {}",
        file.len(),
        file.model,
        file.dimension,
        output.display()
    );
    Ok(())
}

async fn cmd_index_query(args: QueryArgs, path: Option<PathBuf>) -> Result<()> {
    let config = config::load_layered(path.as_deref()).await?;
    let openai = app::openai_client(&config)?;

    let index = VectorIndex::load(index_path(&config, args.index), app::index_params(&config)).await?;
    let retriever = Retriever::new(Arc::new(openai), Arc::new(index)).with_top_k(args.k);
    let hits = retriever.lookup(&args.text).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&hits).map_err(ragline::Error::from)?;
        println!("{json}");
        return Ok(());
    }

    if hits.is_empty() {
        println!("No matches.");
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{:>2}. [{:.4}] {}  {}",
            rank + 1,
            hit.score,
            hit.id,
            truncate_str(&hit.text, 80)
        );
    }
    Ok(())
}

async fn cmd_status(path: Option<PathBuf>) -> Result<()> {
    let config_file = resolve_path(path);

    println!("ragline status\n");

    println!("Configuration:");
    println!("  Path:   {}", config_file.display());
    println!(
        "  Exists: {}",
        if config_file.exists() { "yes" } else { "no" }
    );

    match config::load_layered(Some(config_file.as_path())).await {
        Ok(config) => {
            println!(
                "  Valid:  {}",
                if config.is_valid() { "yes" } else { "no (run 'ragline config validate')" }
            );
            println!();
            println!("Server:");
            println!("  Listen:  {}:{}", config.server.host, config.server.port);
            println!("  Webhook: {}", config.server.webhook_path);
            println!();
            println!("OpenAI:");
            println!("  Model:     {}", config.openai.model);
            println!("  Embedding: {}", config.openai.embedding_model);
            println!();
            println!("Retrieval:");
            if config.retrieval.enabled {
                let index = index_path(&config, None);
                println!("  Index: {}", index.display());
                println!("  Exists: {}", if index.exists() { "yes" } else { "no" });
                println!("  Top k: {}", config.retrieval.top_k);
            } else {
                println!("  disabled");
            }
        }
        Err(e) => println!("  Valid:  no ({e})"),
    }

    println!();
    println!("Environment:");
    for name in [
        "LINE_CHANNEL_ACCESS_TOKEN",
        "LINE_CHANNEL_SECRET",
        "OPENAI_API_KEY",
        "OPENAI_MODEL",
        "PORT",
    ] {
        println!("  {name}: {}", env_status(name));
    }

    Ok(())
}

async fn cmd_config(args: ConfigArgs, path: Option<PathBuf>) -> Result<()> {
    let config_file = resolve_path(path);

    match args.command {
        ConfigCommands::Path => {
            println!("{}", config_file.display());
        }
        ConfigCommands::Show => {
            let config = config::load_layered(Some(config_file.as_path())).await?;
            let content = toml::to_string_pretty(&redacted(&config))
                .map_err(config::ConfigError::from)?;
            println!("{content}");
        }
        ConfigCommands::Validate => {
            let config = config::load_layered(Some(config_file.as_path())).await?;
            let issues = config.validate();
            for issue in &issues {
                println!("{issue}");
            }
            if config.is_valid() {
                println!("Configuration is valid");
            } else {
                return Err(BotError::config("configuration is invalid"));
            }
        }
    }

    Ok(())
}
