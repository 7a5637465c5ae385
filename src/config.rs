use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::cake_config::{CONFIG_FILE_NAME, CakeToml};
use crate::commands::DiscoveryOptions;
use crate::project::CakeProject;
use crate::runner::Interrupt;

/// Runtime configuration.
///
/// Bridges `cake-console.toml` with CLI arguments and exposes the pieces the
/// script facade needs: the project layout and the discovery options.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub verbose: bool,
    /// CLI override for `discovery.timeout_secs`
    pub timeout: Option<Duration>,
    toml: CakeToml,
}

impl Config {
    pub fn new(project_dir: PathBuf, verbose: bool, timeout_secs: Option<u64>) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let toml = CakeToml::load_or_default(&project_dir)?;

        Ok(Self {
            project_dir,
            verbose,
            timeout: timeout_secs.map(Duration::from_secs),
            toml,
        })
    }

    pub fn toml(&self) -> &CakeToml {
        &self.toml
    }

    pub fn config_path(&self) -> PathBuf {
        self.project_dir.join(CONFIG_FILE_NAME)
    }

    pub fn project(&self) -> CakeProject {
        CakeProject::new(
            &self.project_dir,
            self.toml.project.cake_dir.as_deref(),
            self.toml.project.name.clone(),
        )
    }

    /// Explicit script path (env → file), resolved against the CakePHP root.
    pub fn script_override(&self) -> Option<PathBuf> {
        let script = self.toml.script()?;
        Some(self.project().resolve_script(&script))
    }

    pub fn interpreter(&self) -> Option<String> {
        self.toml.interpreter()
    }

    pub fn default_params(&self) -> Vec<String> {
        self.toml.discovery.default_params.clone()
    }

    /// Wait bound (CLI → file).
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or_else(|| self.toml.timeout())
    }

    pub fn discovery_options(&self, interrupt: Interrupt) -> DiscoveryOptions {
        DiscoveryOptions {
            timeout: Some(self.timeout()),
            xml_discovery: true,
            interactive_rerun: self.toml.discovery.interactive_rerun,
            temp_dir: None,
            interrupt,
        }
    }
}
