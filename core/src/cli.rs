use crate::config::Config;
use crate::executor::check::check_program;
use crate::executor::driver::load_program;
use crate::executor::{Driver, RunOutcome, StdHost};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Strata - A stack-free structured concurrency engine", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum trace entries kept on errors (overrides config file and env vars)
    #[arg(long, global = true)]
    pub trace_depth: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a JSON execution tree and print its outcome
    Run {
        /// Program file
        program: PathBuf,

        /// Wait for timers in real time instead of skipping ahead
        #[arg(long)]
        realtime: bool,
    },

    /// Report statistics and structural warnings for a program
    Check {
        /// Program file
        program: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments (for embedders that need to filter args)
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before executing any command
    let config = Config::builder()
        .config_path(cli.config.clone())
        .trace_depth(cli.trace_depth)
        .build()?;
    init_tracing(&config);

    match cli.command {
        Commands::Run { program, realtime } => run_program(&program, realtime, &config).await,
        Commands::Check { program } => {
            let node = load_program(&program)?;
            let report = check_program(&node);
            for warning in &report.warnings {
                eprintln!("warning: {}", warning);
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml());
            Ok(())
        }
    }
}

async fn run_program(path: &Path, realtime: bool, config: &Config) -> Result<()> {
    let program = load_program(path)?;
    let host = StdHost::new();
    let mut driver = Driver::new(Box::new(host.clone()), config);
    let file = path.display().to_string();

    let outcome = if realtime || config.realtime {
        driver.run_realtime(&program, &file).await
    } else {
        driver.run(&program, &file)
    }
    .with_context(|| format!("running {}", file))?;

    let summary = serde_json::json!({
        "run_id": driver.run_id(),
        "outcome": &outcome,
        "output": host.output(),
        "uncaught": host.uncaught().len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    match outcome {
        RunOutcome::Threw(error) => Err(anyhow!("uncaught {}", error.render())),
        RunOutcome::Completed(_) | RunOutcome::Suspended => Ok(()),
    }
}

/// Log to stderr; RUST_LOG wins over the configured filter.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    // A subscriber may already be installed by an embedding process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::parse_from(["strata", "run", "prog.json", "--realtime"]);
        let Commands::Run { program, realtime } = cli.command else {
            unreachable!("Expected Run command");
        };
        assert_eq!(program, PathBuf::from("prog.json"));
        assert!(realtime);
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["strata", "check", "p.json", "--config", "strata.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("strata.toml")));
        assert!(matches!(cli.command, Commands::Check { .. }));
    }
}
