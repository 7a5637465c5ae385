//! Configuration view and validation commands: `cake-console config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use cake_console::cake_config::{CONFIG_FILE_NAME, CakeToml};

    let config_path = project_dir.join(CONFIG_FILE_NAME);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Cake Console Configuration");
            println!("==========================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No {} found, using defaults.", CONFIG_FILE_NAME);
            }
            println!();

            let toml = CakeToml::load_or_default(project_dir)?;

            println!("[project]");
            if let Some(name) = &toml.project.name {
                println!("  name = \"{}\"", name);
            }
            if let Some(dir) = &toml.project.cake_dir {
                println!("  cake_dir = \"{}\"", dir.display());
            }
            if let Some(script) = toml.script() {
                println!("  script = \"{}\"", script.display());
            }
            if let Some(interpreter) = toml.interpreter() {
                println!("  interpreter = \"{}\"", interpreter);
            }
            println!();

            println!("[discovery]");
            println!("  timeout_secs = {}", toml.discovery.timeout_secs);
            println!("  interactive_rerun = {}", toml.discovery.interactive_rerun);
            println!("  default_params = {:?}", toml.discovery.default_params);
        }
        Some(ConfigCommands::Validate) => {
            if !config_path.exists() {
                println!("No {} found. Run 'cake-console config init' to create one.", CONFIG_FILE_NAME);
                return Ok(());
            }

            let toml = CakeToml::load(&config_path)?;
            let warnings = toml.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE_NAME, config_path.display());
                return Ok(());
            }
            CakeToml::default().save(&config_path)?;
            println!("Created {}", config_path.display());
        }
    }

    Ok(())
}
