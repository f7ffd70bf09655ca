//! tern - AI coding agent CLI

mod config;
mod host;
mod prompt;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tern_core::context::ContextManager;
use tern_core::file_tracker::FileTracker;
use tern_core::tools::builtin_registry;
use tern_core::{Task, TaskConfig, TaskOutcome};
use tern_model::{AnthropicClient, ModelInfo};

use config::Config;
use host::TerminalHost;
use prompt::SystemPromptBuilder;
use session::{SessionStore, UsageLogEntry};

/// tern - AI coding agent
#[derive(Parser, Debug)]
#[command(name = "tern")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a message to the agent
    Chat {
        /// The message to send
        message: String,
        /// Resume an existing session by id
        #[arg(long)]
        session: Option<String>,
        /// Run every tool without an approval prompt
        #[arg(long)]
        auto_approve: bool,
        /// Model id override
        #[arg(long)]
        model: Option<String>,
    },
    /// Manage saved sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
    /// Print a session's conversation (latest session by default)
    History {
        /// Session id
        id: Option<String>,
    },
    /// Print a workspace file
    Read {
        /// File path
        file: String,
    },
    /// Read or write configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum SessionsAction {
    /// List saved sessions
    List,
    /// Show one session's metadata
    Show { id: String },
    /// Delete all sessions
    Clear,
    /// Delete one session
    Delete { id: String },
    /// Dump a session as JSON
    Export { id: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print one config value
    Get { key: String },
    /// Set one config value
    Set { key: String, value: String },
    /// Print all config values
    List,
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tern")
        .join("logs")
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "tern=debug" } else { "tern=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Chat {
            message,
            session,
            auto_approve,
            model,
        } => chat(&message, session, auto_approve, model).await,
        Commands::Sessions { action } => sessions(action),
        Commands::History { id } => history(id),
        Commands::Read { file } => {
            let content =
                std::fs::read_to_string(&file).with_context(|| format!("reading {}", file))?;
            print!("{}", content);
            Ok(())
        }
        Commands::Config { action } => config_cmd(action),
    }
}

async fn chat(
    message: &str,
    session_id: Option<String>,
    auto_approve: bool,
    model_override: Option<String>,
) -> anyhow::Result<()> {
    let config = Config::load();

    // Missing credentials are fatal at startup
    let Some(api_key) = config.get_api_key() else {
        bail!(
            "missing configuration: api_key (set ANTHROPIC_API_KEY or run `tern config set api_key <key>`)"
        );
    };

    let model_id = model_override.unwrap_or_else(|| config.model_id());
    let info = ModelInfo::new(
        model_id.clone(),
        config.effective_base_url(),
        config.effective_context_window(),
    );

    let client = Arc::new(AnthropicClient::new(api_key, info));
    let registry = Arc::new(builtin_registry());
    let host = Arc::new(TerminalHost::new(
        auto_approve,
        config.auto_approve.clone(),
        log_dir(),
    ));
    let prompt_builder = Arc::new(SystemPromptBuilder::new(load_user_instructions()));

    let cwd = std::env::current_dir().context("resolving working directory")?;
    let mut task_config = TaskConfig::new(cwd);
    task_config.search_binary = config.search_binary.as_ref().map(PathBuf::from);

    let mut task = Task::new(client, registry, host.clone(), prompt_builder, task_config);

    let store = SessionStore::open_default();
    let mut meta = match &session_id {
        Some(id) => {
            let meta = store
                .load_meta(id)
                .with_context(|| format!("session not found: {}", id))?;
            task.set_history(store.load_history(id).unwrap_or_default());
            task.set_total_tokens(meta.total_tokens);
            if let Some(updates) = store.load_context_updates(id)? {
                task.set_context_manager(ContextManager::from_serialized(updates));
            }
            let task_meta = store.load_task_metadata(id)?;
            task.set_deleted_range(task_meta.deleted_range);
            *task.tracker().lock() = FileTracker::from_entries(task_meta.file_entries);
            meta
        }
        None => store.create(&model_id)?,
    };

    let outcome = task.run(message).await;

    // Persist the session even when the turn failed
    store.save_history(&meta.id, task.history())?;
    store.save_context_updates(&meta.id, &task.context_manager().to_serialized())?;
    let mut task_meta = store.load_task_metadata(&meta.id)?;
    task_meta.file_entries = task.tracker().lock().entries().to_vec();
    task_meta.deleted_range = task.state().lock().deleted_range;
    task_meta.usage_log.push(UsageLogEntry {
        ts: chrono::Utc::now().timestamp_millis(),
        total_tokens: task.total_tokens(),
    });
    store.save_task_metadata(&meta.id, &task_meta)?;

    meta.message_count = task.history().len();
    meta.last_active_at = chrono::Utc::now().timestamp_millis();
    meta.total_tokens = task.total_tokens();
    store.save_meta(&meta)?;

    match outcome {
        Ok(TaskOutcome::Completed { command, .. }) => {
            if let Some(command) = command {
                println!("\nSuggested check: {}", command);
            }
            println!("\nSession: {}", meta.id);
            Ok(())
        }
        Ok(TaskOutcome::AwaitingUser) => {
            println!(
                "\n\nContinue with: tern chat \"...\" --session {}",
                meta.id
            );
            Ok(())
        }
        Ok(TaskOutcome::Aborted) => {
            println!("\nAborted. Session: {}", meta.id);
            Ok(())
        }
        Err(e) => {
            host.log_error(e.kind(), &e.to_string(), e.hint());
            bail!("{} ({})", e, e.hint());
        }
    }
}

/// Project instructions from AGENTS.md in the working directory, if present
fn load_user_instructions() -> Option<String> {
    let content = std::fs::read_to_string("AGENTS.md").ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn sessions(action: SessionsAction) -> anyhow::Result<()> {
    let store = SessionStore::open_default();
    match action {
        SessionsAction::List => {
            let sessions = store.list();
            if sessions.is_empty() {
                println!("No saved sessions");
                return Ok(());
            }
            for meta in sessions {
                let when = chrono::DateTime::from_timestamp_millis(meta.last_active_at)
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}  {}  {} messages  {} tokens  {}",
                    meta.id, when, meta.message_count, meta.total_tokens, meta.model_id
                );
            }
            Ok(())
        }
        SessionsAction::Show { id } => {
            let meta = store.load_meta(&id)?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
            Ok(())
        }
        SessionsAction::Clear => {
            let count = store.clear()?;
            println!("Deleted {} sessions", count);
            Ok(())
        }
        SessionsAction::Delete { id } => {
            store.delete(&id)?;
            println!("Deleted {}", id);
            Ok(())
        }
        SessionsAction::Export { id } => {
            println!("{}", store.export(&id)?);
            Ok(())
        }
    }
}

fn history(id: Option<String>) -> anyhow::Result<()> {
    let store = SessionStore::open_default();
    let meta = match id {
        Some(id) => store.load_meta(&id)?,
        None => match store.latest() {
            Some(meta) => meta,
            None => {
                println!("No saved sessions");
                return Ok(());
            }
        },
    };

    let history = store.load_history(&meta.id).unwrap_or_default();
    for message in &history {
        println!("--- {} ---", message.role);
        println!("{}\n", message.text());
    }
    Ok(())
}

fn config_cmd(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load();
            match config.get(&key) {
                Some(value) => println!("{}", value),
                None => bail!("unknown config key: {}", key),
            }
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load();
            if !config.set(&key, &value) {
                bail!("unknown config key or invalid value: {}", key);
            }
            config.save()?;
            println!("Set {}", key);
            Ok(())
        }
        ConfigAction::List => {
            let config = Config::load();
            for (key, value) in config.list() {
                println!("{} = {}", key, value);
            }
            println!("\nConfig file: {}", Config::config_path().display());
            Ok(())
        }
    }
}
