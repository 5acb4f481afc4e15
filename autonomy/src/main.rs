//! Command-line front end for bounded autonomous missions.
//!
//! `handle` feeds one inbound message through the full pipeline (trigger,
//! shield, mission, redaction) and prints the reply. The other commands expose
//! the pieces individually for inspection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use autonomy::core::context::select_context;
use autonomy::core::contract::{AutonomyLevel, build_contract};
use autonomy::core::types::ApprovalDecision;
use autonomy::exit_codes;
use autonomy::inbound::{InboundReply, Sidecar};
use autonomy::io::agent::ScriptedAgent;
use autonomy::io::approval::{ApprovalGate, PromptApproval, StaticApproval};
use autonomy::io::config::{AutonomyConfig, load_config, write_config};
use autonomy::io::memory::{InMemoryStore, load_snapshot};
use autonomy::io::tools::default_registry;
use autonomy::logging;
use autonomy::mission::MissionStatus;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

const DEFAULT_CONFIG: &str = "autonomy.toml";

#[derive(Parser)]
#[command(
    name = "autonomy",
    version,
    about = "Bounded autonomous missions with sandboxed tools"
)]
struct Cli {
    /// Config file; missing means built-in defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default config file if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the contract a mission at this level would get.
    Contract {
        #[arg(long)]
        level: AutonomyLevel,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        goal: String,
    },
    /// Print the context selected from a memory snapshot for some text.
    Context {
        #[arg(long)]
        memory: PathBuf,
        #[arg(long)]
        text: String,
    },
    /// Run one inbound message through the mission pipeline.
    Handle {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        message: String,
        /// JSON array of agent replies to replay.
        #[arg(long)]
        script: Option<PathBuf>,
        /// Distilled memory snapshot (JSON).
        #[arg(long)]
        memory: Option<PathBuf>,
        /// How gated tool calls are decided.
        #[arg(long, value_enum, default_value_t = ApproveMode::Deny)]
        approve: ApproveMode,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ApproveMode {
    Deny,
    Approve,
    Prompt,
}

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Contract { level, actor, goal } => {
            print_json(&build_contract(&actor, &goal, level, Utc::now()))?;
            Ok(exit_codes::OK)
        }
        Command::Context { memory, text } => {
            let snapshot = load_snapshot(&memory)?;
            print_json(&select_context(&snapshot, &text))?;
            Ok(exit_codes::OK)
        }
        Command::Handle {
            actor,
            message,
            script,
            memory,
            approve,
        } => {
            let request = HandleRequest {
                config: &cli.config,
                actor: &actor,
                message: &message,
                script: script.as_deref(),
                memory: memory.as_deref(),
            };
            match approve {
                ApproveMode::Deny => {
                    cmd_handle(request, StaticApproval(ApprovalDecision::Denied)).await
                }
                ApproveMode::Approve => {
                    cmd_handle(request, StaticApproval(ApprovalDecision::Approved)).await
                }
                ApproveMode::Prompt => cmd_handle(request, PromptApproval::default()).await,
            }
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if !force && path.exists() {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &AutonomyConfig::default())?;
    println!("{}", path.display());
    Ok(exit_codes::OK)
}

struct HandleRequest<'a> {
    config: &'a Path,
    actor: &'a str,
    message: &'a str,
    script: Option<&'a Path>,
    memory: Option<&'a Path>,
}

async fn cmd_handle<G: ApprovalGate + 'static>(
    request: HandleRequest<'_>,
    approvals: G,
) -> Result<i32> {
    let cfg = load_config(request.config)?;
    let agent = match request.script {
        Some(path) => ScriptedAgent::from_file(path)?,
        None => ScriptedAgent::default(),
    };
    let tools = default_registry(&cfg, Arc::new(InMemoryStore::default()));
    let mut sidecar = Sidecar::new(cfg, tools, agent, approvals)?;
    if let Some(path) = request.memory {
        sidecar = sidecar.with_memory(load_snapshot(path)?);
    }

    let reply = sidecar
        .handle_message(request.actor, request.message)
        .await
        .context("handle inbound message")?;
    if let Some(text) = reply.reply_text() {
        println!("{text}");
    }
    Ok(match reply {
        InboundReply::Passthrough => exit_codes::OK,
        InboundReply::RateLimited { .. } => exit_codes::RATE_LIMITED,
        InboundReply::Mission(mission) => match mission.outcome.status() {
            MissionStatus::Completed => exit_codes::OK,
            MissionStatus::Stopped => exit_codes::STOPPED,
        },
    })
}

/// Pretty-print `value` as JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
