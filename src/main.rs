use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "cake-console")]
#[command(version, about = "Discover and run CakePHP console commands")]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// CakePHP project directory (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Upper bound in seconds on each console run. Overrides cake-console.toml.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the project's console commands
    List {
        /// Print the commands as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the help of a console command
    Help {
        /// Command and subcommand, e.g. `bake model`
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },
    /// Run a console command on the terminal
    Run {
        /// Command and its arguments
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Run `bake` interactively
    Bake,
    /// Show the detected project layout
    Info,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default cake-console.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cake_console::logging::init_logging(cli.verbose)?;

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::List { json } => cmd::cmd_list(&cli, project_dir, *json).await?,
        Commands::Help { command } => cmd::cmd_help(&cli, project_dir, command).await?,
        Commands::Run { command } => cmd::cmd_run(&cli, project_dir, command).await?,
        Commands::Bake => cmd::cmd_bake(&cli, project_dir).await?,
        Commands::Info => cmd::cmd_info(&cli, project_dir)?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
