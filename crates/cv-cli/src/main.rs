use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cv_core::ToolRegistry;
use cv_providers::AnthropicProvider;
use cv_review::{Analyzer, EvidenceFetcher, ReviewLoop, ReviewMode, ReviewSession};
use cv_tools::{create_search_tools, WEB_SEARCH_TOOL};

mod config;
mod display;
mod interactive;
mod setup;

use config::{expand_path, Config, Credentials};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose: includes request and response payloads
    Trace,
    /// Verbose: requests, router decisions, tool execution details
    Debug,
    /// Standard: run start and finish
    Info,
    /// Quiet: only warnings and errors
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How the model asks for evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Model calls the web_search tool explicitly
    ToolCalls,
    /// Any reply mentioning "search" triggers a search with that reply
    Heuristic,
}

impl From<ModeArg> for ReviewMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::ToolCalls => ReviewMode::ToolCalls,
            ModeArg::Heuristic => ReviewMode::Heuristic,
        }
    }
}

#[derive(Parser)]
#[command(name = "cv")]
#[command(author, version, about = "Content validator: fact-check product articles against the web", long_about = None)]
pub struct Cli {
    /// Config file (default: $CONFIG_DIR/content-validator/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Evidence mode (overrides config)
    #[arg(long, value_enum, global = true)]
    pub mode: Option<ModeArg>,

    /// Maximum analyzer calls per review (minimum 1)
    #[arg(long, global = true)]
    pub max_rounds: Option<usize>,

    /// Model to use (overrides config)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Maximum tokens to generate
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Write logs to file (JSON-lines format)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Print every message of the run before the final text
    #[arg(long, global = true)]
    pub show_transcript: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Review one article and exit
    Review {
        /// Article text (reads stdin when neither TEXT nor --file is given)
        text: Option<String>,

        /// Read the article from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start an interactive session (default)
    Chat,
    /// Show current configuration
    Config,
    /// Initialize the configuration file
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };

    let filter = EnvFilter::new(log_level.as_filter());

    if let Some(log_path) = &cli.log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    // Handle setup before config is required
    if matches!(&cli.command, Some(Commands::Setup)) {
        return setup::run();
    }

    let config_path = match &cli.config {
        Some(path) => expand_path(path),
        None => Config::config_path()?,
    };
    let mut config = Config::load(&config_path)?;
    apply_overrides(&cli, &mut config);

    match &cli.command {
        Some(Commands::Config) => show_config(&config, &config_path),
        Some(Commands::Review { text, file, json }) => {
            let credentials = config.credentials()?;
            let article = read_article(text.as_deref(), file.as_deref())?;
            let review_loop = build_review_loop(&config, &credentials);
            review_once(&review_loop, &article, *json, cli.show_transcript).await
        }
        Some(Commands::Chat) | None => {
            let credentials = config.credentials()?;
            let review_loop = build_review_loop(&config, &credentials);
            interactive::run_session(&review_loop, cli.show_transcript).await
        }
        Some(Commands::Setup) => unreachable!(),
    }
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(mode) = cli.mode {
        config.review.mode = mode.into();
    }
    if let Some(max_rounds) = cli.max_rounds {
        config.review.max_rounds = max_rounds;
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.llm.max_tokens = max_tokens;
    }
}

/// Wire the provider, search tool, analyzer and fetcher into a loop.
fn build_review_loop(config: &Config, credentials: &Credentials) -> ReviewLoop {
    let mut provider = AnthropicProvider::new(credentials.llm_api_key.as_str())
        .with_default_model(config.llm.model.as_str())
        .with_headers(config.llm.headers.clone());
    if let Some(base_url) = &config.llm.base_url {
        provider = provider.with_base_url(base_url.as_str());
    }

    let mut registry = ToolRegistry::new();
    for tool in create_search_tools(config.search_config(&credentials.search_api_key)) {
        registry.register(tool);
    }

    let analyzer = Analyzer::new(Arc::new(provider), config.review.mode)
        .with_prompt(config.review.prompt())
        .with_model(config.llm.model.as_str())
        .with_max_tokens(config.llm.max_tokens)
        .with_tools(registry.definitions());

    tracing::debug!(
        mode = %config.review.mode,
        model = %config.llm.model,
        tools = ?registry.names(),
        "Review loop configured"
    );

    ReviewLoop::new(analyzer, EvidenceFetcher::new(registry, WEB_SEARCH_TOOL))
        .with_max_rounds(config.review.max_rounds)
}

fn read_article(text: Option<&str>, file: Option<&std::path::Path>) -> Result<String> {
    let article = match (text, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read article from {}", path.display()))?,
        (None, None) => {
            if atty::is(atty::Stream::Stdin) {
                eprintln!("Paste the article, then press Ctrl+D:");
            }
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read article from stdin")?;
            buf
        }
    };

    if article.trim().is_empty() {
        anyhow::bail!("No article text given");
    }
    Ok(article)
}

async fn review_once(
    review_loop: &ReviewLoop,
    article: &str,
    json: bool,
    show_transcript: bool,
) -> Result<()> {
    let mut session = ReviewSession::new();
    let outcome = review_loop
        .run(&mut session, article)
        .await
        .context("Review failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if show_transcript {
        display::print_transcript(&outcome);
    }
    display::print_outcome(&outcome);
    Ok(())
}

fn show_config(config: &Config, path: &std::path::Path) -> Result<()> {
    println!("Configuration file: {}", path.display());
    if !path.exists() {
        println!("  (not found, using defaults; run `cv setup` to create it)");
    }
    println!();

    let rendered = toml::to_string_pretty(&config.masked())
        .context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}
