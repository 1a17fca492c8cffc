//! wari - an interactive shell & chat assistant.
//!
//! Turns natural-language questions into a single shell command to review and
//! run, or answers them conversationally, using a locally hosted model.

mod assistant;
mod config;
mod context;
mod conversation;
mod exec;
mod llm;
mod mode;
mod normalize;
mod session;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use context::Environment;
use exec::ShellExecutor;
use mode::{Mode, SystemPrompts};
use session::Session;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ui::{Console, Notice, TerminalConsole};

#[derive(Parser)]
#[command(name = "wari")]
#[command(author, version, about = "An interactive shell & chat assistant backed by a local LLM")]
#[command(long_about = "Ask for a shell command in plain language, review it, and run it.\n\n\
At the prompt, type '/chat' for conversational answers, '/command' to go back to \
shell commands, and 'exit' or 'quit' to leave.")]
struct Cli {
    /// Override the configured model
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    /// Override the model server URL
    #[arg(long, value_name = "URL")]
    host: Option<String>,

    /// Start in chat mode
    #[arg(long)]
    chat: bool,

    /// Write the default configuration file and exit
    #[arg(long)]
    init_config: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    if cli.init_config {
        return init_config();
    }

    let mut config = config::Config::load().context("Failed to load configuration")?;
    config.apply_overrides(cli.model, cli.host);
    let start_mode = if cli.chat {
        Mode::Chat
    } else {
        config.preferences.start_mode
    };
    info!(
        "Using backend: {} (model: {})",
        config.backend_type(),
        config.model_name()
    );

    let env = Environment::capture();
    let prompts = SystemPrompts::new(
        &env,
        config.preferences.share_context,
        config.preferences.location.as_deref(),
    );
    let backend = llm::create_backend(&config.backend)?;
    let executor = ShellExecutor::new(config.execution.shell.clone());

    let mut console = TerminalConsole::new();
    console.show(Notice::Banner(start_mode))?;
    if !session::preflight(&mut console, backend.health_check()).await? {
        return Ok(());
    }

    let mut session = Session::new(backend, executor, console, prompts, start_mode);
    session.run().await?;
    info!(
        "Leaving in {} mode after {} messages",
        session.mode(),
        session.history().len()
    );
    Ok(())
}

/// Handle `--init-config`: write defaults unless a file is already there.
fn init_config() -> Result<()> {
    let path = config::Config::config_path()?;
    if path.exists() {
        println!("Config already exists at {}", path.display());
    } else {
        config::Config::default().save()?;
        println!("Created default config at {}", path.display());
    }
    Ok(())
}

/// Log to stderr; quiet by default so the prompt stays clean.
fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("wari={},reqwest=warn", level))
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}
