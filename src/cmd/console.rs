//! Console commands: `list`, `help`, `run`, `bake`.

use anyhow::{Context, Result, bail};
use console::style;
use std::path::PathBuf;

use cake_console::{CakeScript, ExecutionResult, OutputSink};

use super::super::Cli;
use super::{ctrl_c_interrupt, load_config};

fn open_script(cli: &Cli, project_dir: PathBuf) -> Result<CakeScript> {
    let config = load_config(cli, project_dir)?;
    CakeScript::for_project(&config, ctrl_c_interrupt()).context("Cannot use the project's cake script")
}

fn finish(command: &[String], result: ExecutionResult) -> Result<()> {
    if result.cancelled {
        bail!("'{}' was cancelled", command.join(" "));
    }
    if result.exit_code != 0 {
        bail!("'{}' exited with code {}", command.join(" "), result.exit_code);
    }
    Ok(())
}

pub async fn cmd_list(cli: &Cli, project_dir: PathBuf, json: bool) -> Result<()> {
    let script = open_script(cli, project_dir)?;

    let Some(entries) = script.commands().await else {
        bail!("Command list unavailable for {}", script.project().name());
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialize commands")?
        );
        return Ok(());
    }

    let width = entries
        .iter()
        .map(|e| e.command_line().len())
        .max()
        .unwrap_or(0);
    for entry in &entries {
        println!(
            "{:<width$}  {}",
            style(entry.command_line()).bold(),
            style(&entry.description).dim(),
            width = width
        );
    }
    Ok(())
}

pub async fn cmd_help(cli: &Cli, project_dir: PathBuf, command: &[String]) -> Result<()> {
    let script = open_script(cli, project_dir)?;
    let help = script.help(command).await;
    if help.is_empty() {
        bail!("No help available for '{}'", command.join(" "));
    }
    print!("{}", help);
    Ok(())
}

pub async fn cmd_run(cli: &Cli, project_dir: PathBuf, command: &[String]) -> Result<()> {
    let script = open_script(cli, project_dir)?;
    eprintln!(
        "{}",
        style(script.project().display_name(&command[0])).cyan().bold()
    );
    let result = script.run_command(command, OutputSink::Console).await?;
    finish(command, result)
}

pub async fn cmd_bake(cli: &Cli, project_dir: PathBuf) -> Result<()> {
    let script = open_script(cli, project_dir)?;
    eprintln!("{}", style(script.project().display_name("bake")).cyan().bold());
    let result = script.bake().await?;
    finish(&["bake".to_string()], result)
}
