//! Stepflow CLI - run agent workflows locally or on a workflow server.

mod render;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use colored::Colorize;
use sf_core::agents::HttpAgentRuntime;
use sf_core::client::WorkflowClient;
use sf_core::config::{load_config, AppConfig, CONFIG_DIR};
use sf_core::engine::{cancel_after, PipelineController};
use sf_core::inputs::{collect_runtime_inputs, RuntimeInputs};
use sf_core::workflow::Workflow;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stepflow")]
#[command(about = "Stepflow - sequential agent workflow runner")]
#[command(version)]
struct Cli {
    /// Project directory containing `.stepflow/`
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log at debug level when RUST_LOG is not set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the workflows of the project
    List,

    /// Show the runtime inputs a workflow asks for
    Inputs {
        /// Workflow id
        id: String,
    },

    /// Run a workflow on the workflow server
    Run(RunArgs),

    /// Run a workflow in-process, calling agents over HTTP
    Exec {
        #[command(flatten)]
        run: RunArgs,

        /// Write the event stream to stdout as SSE frames
        #[arg(long)]
        emit_sse: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Workflow id
    id: String,

    /// Preset a runtime input; missing ones are prompted for
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Override `server_url` from config.toml
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Cancel the run after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli.root)
        .await
        .wrap_err_with(|| format!("failed to load {}", cli.root.join(CONFIG_DIR).display()))?;

    match cli.command {
        Commands::List => list_workflows(&config),
        Commands::Inputs { id } => show_inputs(&config, &id),
        Commands::Run(args) => run_remote(&config, args).await,
        Commands::Exec { run, emit_sse } => run_local(&config, run, emit_sse).await,
    }
}

/// Logs go to stderr so stdout stays clean for `--emit-sse`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn find_workflow<'a>(config: &'a AppConfig, id: &str) -> Result<&'a Workflow> {
    config
        .workflow(id)
        .ok_or_else(|| eyre!("unknown workflow '{id}'"))
}

fn list_workflows(config: &AppConfig) -> Result<()> {
    if config.workflows.is_empty() {
        println!("No workflows found in {CONFIG_DIR}/workflows");
        return Ok(());
    }

    for workflow in &config.workflows {
        println!(
            "{}  {}  {}",
            workflow.id.bold(),
            workflow.name,
            format!("({} steps)", workflow.steps.len()).dimmed()
        );
    }
    Ok(())
}

fn show_inputs(config: &AppConfig, id: &str) -> Result<()> {
    let keys = find_workflow(config, id)?.runtime_input_keys();
    if keys.is_empty() {
        println!("Workflow '{id}' takes no runtime inputs");
    }
    for key in keys {
        println!("{key}");
    }
    Ok(())
}

/// Gather runtime inputs, prompting on stderr/stdin for keys not preset.
fn gather_inputs(workflow: &Workflow, vars: &[(String, String)]) -> Result<RuntimeInputs> {
    let preset: RuntimeInputs = vars.iter().cloned().collect();
    let mut prompt = |key: &str| -> anyhow::Result<String> {
        eprint!("{} ", format!("{key}:").cyan());
        std::io::stderr().flush()?;

        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            anyhow::bail!("stdin closed while reading input '{key}'");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    };

    collect_runtime_inputs(workflow, &preset, &mut prompt).map_err(|e| eyre!(e))
}

/// A token cancelled by Ctrl-C, and by the timeout when one is set.
fn run_token(timeout_secs: Option<u64>) -> CancellationToken {
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{} cancelling run", "Interrupted:".yellow());
            on_interrupt.cancel();
        }
    });

    if let Some(secs) = timeout_secs {
        debug!(secs, "run timeout armed");
        cancel_after(cancel.clone(), Duration::from_secs(secs));
    }
    cancel
}

async fn run_remote(config: &AppConfig, args: RunArgs) -> Result<()> {
    let workflow = find_workflow(config, &args.id)?;
    let inputs = gather_inputs(workflow, &args.vars)?;

    let client = match &args.server {
        Some(url) => WorkflowClient::new(url.as_str()),
        None => WorkflowClient::from_config(&config.global),
    };
    let cancel = run_token(args.timeout.or(config.global.request_timeout_secs));

    let (tx, rx) = mpsc::channel(64);
    let printer = tokio::spawn(render::print_events(rx));
    let result = client.run(workflow, &inputs, Some(tx), cancel).await;
    printer.await?;

    let outcome = result.wrap_err_with(|| format!("workflow '{}' failed", workflow.id))?;
    render::print_outcome(workflow, &outcome);
    if outcome.is_cancelled() {
        bail!("run cancelled before workflow '{}' finished", workflow.id);
    }
    Ok(())
}

async fn run_local(config: &AppConfig, args: RunArgs, emit_sse: bool) -> Result<()> {
    let workflow = find_workflow(config, &args.id)?;
    let inputs = gather_inputs(workflow, &args.vars)?;

    let runtime = match &args.server {
        Some(url) => HttpAgentRuntime::new(url.as_str()),
        None => HttpAgentRuntime::from_config(&config.global),
    };
    let controller = PipelineController::new(Arc::new(runtime))
        .with_preview_chars(config.global.preview_chars);
    let cancel = run_token(args.timeout.or(config.global.request_timeout_secs));

    let (tx, rx) = mpsc::channel(64);
    let writer = if emit_sse {
        tokio::spawn(render::write_sse(rx))
    } else {
        tokio::spawn(async move {
            render::print_events(rx).await;
            Ok::<_, color_eyre::Report>(())
        })
    };
    let result = controller.run(workflow, &inputs, tx, cancel).await;
    writer.await??;

    let outcome = result.wrap_err_with(|| format!("workflow '{}' failed", workflow.id))?;
    if !emit_sse {
        render::print_outcome(workflow, &outcome);
    }
    if outcome.is_cancelled() {
        bail!("run cancelled before workflow '{}' finished", workflow.id);
    }
    Ok(())
}
