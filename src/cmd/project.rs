//! Project layout report: `cake-console info`.

use anyhow::Result;
use console::style;
use std::path::PathBuf;

use super::super::Cli;
use super::load_config;

pub fn cmd_info(cli: &Cli, project_dir: PathBuf) -> Result<()> {
    let config = load_config(cli, project_dir)?;
    let project = config.project();

    println!("Project:   {}", style(project.name()).bold());
    println!("CakePHP:   {}", project.cake_dir().display());
    match project.version() {
        Some(version) => println!("Version:   {}", version),
        None => println!("Version:   {}", style("unknown").yellow()),
    }

    let script = config.script_override().or_else(|| project.locate_script());
    match script {
        Some(path) => {
            let runner = cake_console::runner::ScriptRunner::new(&path, project.cake_dir())
                .with_interpreter(config.interpreter());
            match runner.validate() {
                Ok(()) => println!("Script:    {}", path.display()),
                Err(e) => println!("Script:    {} ({})", path.display(), style(e).red()),
            }
        }
        None => println!("Script:    {}", style("not found").red()),
    }
    if let Some(interpreter) = config.interpreter() {
        println!("Interpreter: {}", interpreter);
    }

    println!("Shell directories:");
    for (place, dir) in project.shell_directories() {
        let marker = if dir.is_dir() { style("✓").green() } else { style("-").dim() };
        println!("  {} {:<10} {}", marker, place.label(), dir.display());
    }
    Ok(())
}
