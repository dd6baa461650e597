//! Dactyl CLI - double dactyl poems from a poet/critic feedback loop
//!
//! Usage:
//!   dactyl                      Run the full feedback loop
//!   dactyl run [options]        Same, with flags spelled out
//!   dactyl test                 One generate+validate pair, no retries
//!   dactyl replay               Re-print a previous run from the round log
//!   dactyl train -i <N>         Run the loop N times and summarize outcomes
//!   dactyl init                 Scaffold .dactyl/config.toml

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dactyl_agent::OpenRouterClient;
use dactyl_core::config::{DactylConfig, GatewayConfig, LoopDefaults};
use dactyl_core::FinalOutcome;
use dactyl_orchestrator::{FeedbackLoop, LogRecord, RoundLog};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "dactyl")]
#[command(author, version, about = "Double dactyl poems from a poet/critic feedback loop")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full feedback loop (the default action)
    Run(RunArgs),

    /// One generate+validate pair without the retry loop
    Test(CallArgs),

    /// Re-print a previous run from the round log
    Replay {
        /// Round log to read (defaults to the configured path)
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Run the full loop repeatedly and summarize the outcomes
    Train {
        /// Number of runs
        #[arg(short = 'i', long, default_value = "3")]
        iterations: usize,

        /// Where to append one summary line per run
        #[arg(long, default_value = "training_log.ndjson")]
        summary: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Scaffold .dactyl/config.toml with defaults
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

/// Flags shared by every loop-running command
#[derive(Args, Default)]
struct RunArgs {
    /// Maximum rejected rounds before giving up
    #[arg(short = 'n', long)]
    max_rounds: Option<usize>,

    /// Round log path (NDJSON, append-only)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Final poem path, written only on approval
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    call: CallArgs,
}

/// Flags controlling individual gateway calls
#[derive(Args, Default)]
struct CallArgs {
    /// Model identifier override (defaults to the MODEL env var)
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum tokens per agent response
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Per-call timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Test(args) => cmd_test(args).await,
        Commands::Replay { log } => cmd_replay(log).await,
        Commands::Train {
            iterations,
            summary,
            run,
        } => cmd_train(iterations, summary, run).await,
        Commands::Init { path } => cmd_init(path),
    }
}

/// Resolve config file + flags into engine inputs
struct RunSetup {
    defaults: LoopDefaults,
    client: OpenRouterClient,
    log_path: PathBuf,
    output_path: PathBuf,
}

fn prepare_run(args: &RunArgs) -> Result<RunSetup> {
    let config = DactylConfig::load_or_default(Path::new("."))?;

    // Credentials are validated here, before any gateway call
    let mut gateway_config = GatewayConfig::from_env()?;
    if let Some(model) = &args.call.model {
        gateway_config = gateway_config.with_model(model);
    }

    let mut defaults = config.loop_defaults.clone();
    if let Some(max_rounds) = args.max_rounds {
        defaults.max_rounds = max_rounds;
    }
    if let Some(timeout) = args.call.timeout {
        defaults.request_timeout_secs = timeout;
    }
    if let Some(max_tokens) = args.call.max_tokens {
        defaults.max_tokens = max_tokens;
    }

    let client = OpenRouterClient::new(gateway_config).with_max_tokens(defaults.max_tokens);

    let log_path = args
        .log
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.round_log));
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.final_poem));

    Ok(RunSetup {
        defaults,
        client,
        log_path,
        output_path,
    })
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let setup = prepare_run(&args)?;

    let engine = FeedbackLoop::new(setup.client, setup.defaults)
        .with_round_log(&setup.log_path)
        .with_final_poem_path(&setup.output_path);

    // Ctrl-C cancels between rounds, never mid-call
    let cancel = engine.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current round...");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let result = engine.run().await?;

    match result.outcome {
        FinalOutcome::Approved { poem } => {
            println!("Poem approved after {} retries:\n", result.retry_count);
            println!("{}", poem);
            println!("\nSaved to {}", setup.output_path.display());
        }
        FinalOutcome::MaxRoundsReached { poem, issues } => {
            println!(
                "No approval after {} rounds. Last poem:\n",
                result.rounds
            );
            println!("{}", poem);
            if !issues.is_empty() {
                println!("\nOutstanding issues:");
                for issue in &issues {
                    println!("  {}", issue);
                }
            }
        }
        FinalOutcome::Cancelled => {
            println!("Run cancelled after {} round(s)", result.rounds);
        }
    }

    info!(
        "Token usage: {} prompt, {} completion",
        result.total_usage.prompt_tokens, result.total_usage.completion_tokens
    );

    Ok(())
}

async fn cmd_test(args: CallArgs) -> Result<()> {
    let setup = prepare_run(&RunArgs {
        call: args,
        ..RunArgs::default()
    })?;

    let engine = FeedbackLoop::new(setup.client, setup.defaults);
    let report = engine.run_single_round().await?;

    println!("Poem:\n{}\n", report.poem);
    if report.verdict.approved {
        println!("Verdict: approved");
    } else {
        println!("Verdict: not approved");
        for issue in &report.verdict.issues {
            println!("  {}", issue);
        }
    }

    Ok(())
}

async fn cmd_replay(log: Option<PathBuf>) -> Result<()> {
    let config = DactylConfig::load_or_default(Path::new("."))?;
    let path = log.unwrap_or_else(|| PathBuf::from(&config.output.round_log));

    let records = RoundLog::read_all(&path)
        .await
        .with_context(|| format!("Failed to read round log {}", path.display()))?;

    if records.is_empty() {
        println!("No records in {}", path.display());
        return Ok(());
    }

    for record in records {
        match record {
            LogRecord::Start {
                run_id, max_rounds, ..
            } => {
                println!("=== Run {} (max {} rounds) ===", run_id, max_rounds);
            }
            LogRecord::Round { round, poem, .. } => {
                println!("\n--- Round {} ---", round);
                println!("{}", poem);
            }
            LogRecord::Verdict {
                approved,
                issues,
                feedback,
                ..
            } => {
                if approved {
                    println!("\nVerdict: approved");
                } else {
                    println!("\nVerdict: not approved");
                    if issues.is_empty() {
                        if let Some(feedback) = feedback {
                            println!("  {}", feedback);
                        }
                    } else {
                        for issue in &issues {
                            println!("  {}", issue);
                        }
                    }
                }
            }
            LogRecord::Final {
                outcome,
                retry_count,
                ..
            } => {
                println!("\n=== Outcome: {} ({} retries) ===\n", outcome, retry_count);
            }
        }
    }

    Ok(())
}

async fn cmd_train(iterations: usize, summary_path: PathBuf, args: RunArgs) -> Result<()> {
    let setup = prepare_run(&args)?;

    let mut approved = 0usize;
    let mut summaries = Vec::new();

    for iteration in 1..=iterations {
        info!("Training run {} of {}", iteration, iterations);

        let engine = FeedbackLoop::new(setup.client.clone(), setup.defaults.clone())
            .with_round_log(&setup.log_path);

        let summary = match engine.run().await {
            Ok(result) => {
                if matches!(result.outcome, FinalOutcome::Approved { .. }) {
                    approved += 1;
                }
                serde_json::json!({
                    "iteration": iteration,
                    "outcome": result.outcome.label(),
                    "retry_count": result.retry_count,
                    "rounds": result.rounds,
                    "prompt_tokens": result.total_usage.prompt_tokens,
                    "completion_tokens": result.total_usage.completion_tokens,
                })
            }
            Err(e) => {
                warn!("Training run {} failed: {}", iteration, e);
                serde_json::json!({
                    "iteration": iteration,
                    "outcome": "gateway_failure",
                    "error": e.to_string(),
                })
            }
        };
        summaries.push(summary.to_string());
    }

    let mut content = summaries.join("\n");
    content.push('\n');
    tokio::fs::write(&summary_path, content)
        .await
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;

    println!(
        "{}/{} runs approved. Summaries written to {}",
        approved,
        iterations,
        summary_path.display()
    );

    Ok(())
}

fn cmd_init(path: PathBuf) -> Result<()> {
    DactylConfig::write_default(&path)
        .with_context(|| format!("Failed to initialize {}", path.display()))?;

    println!("Initialized Dactyl in {}", path.display());
    println!("Created:");
    println!("  .dactyl/config.toml");
    println!("\nNext steps:");
    println!("  1. Export OPENROUTER_API_KEY, OPENROUTER_BASE_URL and MODEL");
    println!("  2. Run 'dactyl' to generate a poem");
    println!("  3. Use 'dactyl replay' to revisit a run");

    Ok(())
}
