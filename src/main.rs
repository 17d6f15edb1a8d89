mod check;
mod console;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dialflow_actions::ActionExecutor;
use dialflow_agent::FlowController;
use dialflow_core::config::AppConfig;
use dialflow_core::types::ChatHistory;
use dialflow_flow::{CompiledFlow, Flow};

#[derive(Parser)]
#[command(name = "dialflow", version, about = "Declarative conversational flow runner")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "dialflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a flow and run structural and lint checks
    Validate {
        /// Flow file (.yaml, .yml or .json); defaults to [flow] path in config
        flow: Option<PathBuf>,
    },
    /// Print the synthesized user-data JSON Schema
    Schema {
        flow: Option<PathBuf>,
    },
    /// Print the tool definitions exposed on a node
    Tools {
        flow: Option<PathBuf>,
        /// Node id (defaults to the initial node)
        #[arg(long)]
        node: Option<String>,
    },
    /// Drive a flow from the console, typing `<edge_id> [json-args]`
    Simulate {
        flow: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "dialflow", &mut std::io::stdout());
        return Ok(());
    }

    let config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        AppConfig::default()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .init();

    if cli.config.exists() {
        debug!(path = %cli.config.display(), "Loaded config");
    }

    match &cli.command {
        Commands::Validate { flow } => {
            let path = resolve_flow_path(flow.as_deref(), &config, &cli.config)?;
            check::run_checks(&path)
        }
        Commands::Schema { flow } => {
            let flow = load_flow(flow.as_deref(), &config, &cli.config)?;
            println!("{}", serde_json::to_string_pretty(&flow.schema().json_schema())?);
            Ok(())
        }
        Commands::Tools { flow, node } => {
            let flow = Arc::new(load_flow(flow.as_deref(), &config, &cli.config)?);
            let controller =
                FlowController::new(flow, node.as_deref(), ChatHistory::new(), None)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&controller.tool_definitions())?
            );
            Ok(())
        }
        Commands::Simulate { flow } => {
            let flow = Arc::new(load_flow(flow.as_deref(), &config, &cli.config)?);
            let executor = Arc::new(
                ActionExecutor::new(
                    &flow.flow().actions,
                    flow.flow().environment_variables.clone(),
                )
                .with_config(config.http.clone())
                .with_environment_overrides(&config.environment),
            );
            console::run_simulation(flow, executor).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

/// Flow path from the command line, else from the config file.
fn resolve_flow_path(
    arg: Option<&Path>,
    config: &AppConfig,
    config_path: &Path,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = arg {
        return Ok(path.to_path_buf());
    }
    config.flow_path(config_path).ok_or_else(|| {
        anyhow::anyhow!(
            "No flow file given. Pass one on the command line or set [flow] path in {}",
            config_path.display()
        )
    })
}

fn load_flow(
    arg: Option<&Path>,
    config: &AppConfig,
    config_path: &Path,
) -> anyhow::Result<CompiledFlow> {
    let path = resolve_flow_path(arg, config, config_path)?;
    let flow = Flow::from_file(&path)?;
    info!(path = %path.display(), nodes = flow.nodes.len(), "Flow loaded");
    CompiledFlow::new(flow).with_context(|| format!("compiling {}", path.display()))
}
