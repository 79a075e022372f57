use clap::{Parser, Subcommand};
use code_workbench::api::{self, ServerState};
use code_workbench::config::{self, WorkbenchConfig};
use code_workbench::error::WorkbenchError;
use code_workbench::logging::{init_logging, LogLevel};
use code_workbench::tools::all_definitions;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "code-workbench",
    version,
    about = "Session-scoped sandbox and tool-calling backend for LLM code assistants"
)]
struct Cli {
    /// Configuration file (skips the default search paths)
    #[arg(long, short = 'c', env = "CODE_WORKBENCH_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CODE_WORKBENCH_LOG_LEVEL", global = true)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Interface to bind
        #[arg(long, env = "CODE_WORKBENCH_HOST")]
        host: Option<String>,
        /// Port to bind
        #[arg(long, short = 'p', env = "CODE_WORKBENCH_PORT")]
        port: Option<u16>,
        /// Directory holding session workspaces
        #[arg(long, short = 'w', env = "CODE_WORKBENCH_WORKSPACE")]
        workspace: Option<PathBuf>,
    },
    /// Print the configuration file search paths
    ConfigPaths,
    /// Print the tool schemas offered to the model
    Tools,
}

fn load_config(cli: &Cli) -> Result<WorkbenchConfig, WorkbenchError> {
    let mut config = match &cli.config {
        Some(path) => config::from_path(path)?,
        None => config::load()?,
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    Ok(config)
}

async fn serve(
    mut config: WorkbenchConfig,
    host: Option<String>,
    port: Option<u16>,
    workspace: Option<PathBuf>,
) -> Result<(), WorkbenchError> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(workspace) = workspace {
        config.workspace.root = workspace;
    }

    let state = ServerState::from_config(&config)?;
    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| WorkbenchError::launch_failed(format!("cannot bind {address}: {e}")))?;
    api::serve(listener, state, &config).await
}

fn print_tools() -> Result<(), WorkbenchError> {
    let json = serde_json::to_string_pretty(&all_definitions())
        .map_err(|e| WorkbenchError::launch_failed(e.to_string()))?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        None => serve(config, None, None, None).await,
        Some(Command::Serve {
            host,
            port,
            workspace,
        }) => serve(config, host, port, workspace).await,
        Some(Command::ConfigPaths) => {
            for path in config::search_paths() {
                println!("{}", path.display());
            }
            Ok(())
        }
        Some(Command::Tools) => print_tools(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "code-workbench failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
