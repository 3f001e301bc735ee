mod run;

use crate::conf::{self, Config, LogFormat};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(name = "ecs-run-task")]
#[clap(about = "Runs an Amazon ECS task as a CI pipeline step.")]
#[clap(
    long_about = "Runs an Amazon ECS task as a CI pipeline step.\n\n Step inputs are read from the environment the
    runner provides (INPUT_<NAME>), the started task ARNs are reported as the 'task-arn' output and, when asked to,
    the step waits for the tasks to stop and fails if any container exited with a non-zero code."
)]
#[clap(version)]
struct Cli {
    /// Set configuration path; if empty default paths are used
    #[clap(long, value_name = "PATH")]
    config_path: Option<String>,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the step; this is what happens when no command is given.
    Run,

    /// Print the inputs and outputs the step understands.
    Inputs,

    /// Print the effective configuration after defaults, files and env vars are merged.
    Config,
}

struct CliHarness {
    config: Config,
}

fn init_logging(config: &conf::General) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("could not parse log_level '{}'", config.log_level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("could not init logging; {e}"))
}

/// init the CLI and appropriately run the correct command. Returns the process exit code.
pub async fn init() -> Result<i32> {
    let args = Cli::parse();

    let config = Config::parse(args.config_path.as_deref()).context("could not load configuration")?;

    init_logging(&config.general)?;

    let cli = CliHarness { config };

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => cli.run().await,
        Commands::Inputs => {
            print!("{}", crate::launcher::documentation().render());
            Ok(0)
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&cli.config)?);
            Ok(0)
        }
    }
}
