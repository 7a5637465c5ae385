//! Project configuration for console discovery.
//!
//! Settings live in `cake-console.toml` at the project root and are layered
//! file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [project]
//! name = "blog"
//! cake_dir = "."
//! script = "app/Console/cake.php"
//! interpreter = "php"
//!
//! [discovery]
//! timeout_secs = 120
//! interactive_rerun = true
//! default_params = []
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "cake-console.toml";

/// Project-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSection {
    /// Display name (defaults to the project directory name)
    #[serde(default)]
    pub name: Option<String>,
    /// CakePHP root relative to the project directory
    #[serde(default)]
    pub cake_dir: Option<PathBuf>,
    /// Console script override, relative to the CakePHP root or absolute
    #[serde(default)]
    pub script: Option<PathBuf>,
    /// Interpreter used to launch the script (e.g. "php")
    #[serde(default)]
    pub interpreter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySection {
    /// Upper bound on each wait for a console run
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Re-run `command_list` on the console when discovery fails (2.x only)
    #[serde(default = "default_interactive_rerun")]
    pub interactive_rerun: bool,
    /// Arguments prepended to every invocation
    #[serde(default)]
    pub default_params: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_interactive_rerun() -> bool {
    true
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            interactive_rerun: default_interactive_rerun(),
            default_params: Vec::new(),
        }
    }
}

/// Contents of `cake-console.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CakeToml {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
}

impl CakeToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| format!("Failed to parse {}", CONFIG_FILE_NAME))
    }

    /// Load from the project directory, or defaults when the file is absent.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .with_context(|| format!("Failed to serialize {}", CONFIG_FILE_NAME))?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Script override (env → file).
    pub fn script(&self) -> Option<PathBuf> {
        std::env::var("CAKE_SCRIPT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| self.project.script.clone())
    }

    /// Interpreter (env → file).
    pub fn interpreter(&self) -> Option<String> {
        std::env::var("CAKE_INTERPRETER")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.project.interpreter.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.discovery.timeout_secs)
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.discovery.timeout_secs == 0 {
            warnings.push("discovery.timeout_secs is 0; every console run will be cancelled".to_string());
        }
        if matches!(&self.project.interpreter, Some(i) if i.trim().is_empty()) {
            warnings.push("project.interpreter is set but empty".to_string());
        }
        if let Some(dir) = self.project.cake_dir.as_ref().filter(|d| d.is_absolute()) {
            warnings.push(format!(
                "project.cake_dir '{}' is absolute; expected a path relative to the project",
                dir.display()
            ));
        }
        for param in &self.discovery.default_params {
            if param.trim().is_empty() {
                warnings.push("discovery.default_params contains an empty argument".to_string());
                break;
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_empty() {
        let toml = CakeToml::parse("").unwrap();
        assert!(toml.project.name.is_none());
        assert_eq!(toml.discovery.timeout_secs, 120);
        assert!(toml.discovery.interactive_rerun);
        assert!(toml.discovery.default_params.is_empty());
    }

    #[test]
    fn test_parse_project_section() {
        let toml = CakeToml::parse(
            r#"
[project]
name = "blog"
cake_dir = "vendor/cakephp"
interpreter = "php"
"#,
        )
        .unwrap();
        assert_eq!(toml.project.name.as_deref(), Some("blog"));
        assert_eq!(toml.project.cake_dir, Some(PathBuf::from("vendor/cakephp")));
        assert_eq!(toml.project.interpreter.as_deref(), Some("php"));
    }

    #[test]
    fn test_parse_discovery_section() {
        let toml = CakeToml::parse(
            r#"
[discovery]
timeout_secs = 5
interactive_rerun = false
default_params = ["-q"]
"#,
        )
        .unwrap();
        assert_eq!(toml.timeout(), Duration::from_secs(5));
        assert!(!toml.discovery.interactive_rerun);
        assert_eq!(toml.discovery.default_params, vec!["-q".to_string()]);
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(CakeToml::parse("[project\nname=").is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = CakeToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.discovery.timeout_secs, 120);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut toml = CakeToml::default();
        toml.project.name = Some("shop".to_string());
        toml.discovery.timeout_secs = 30;
        toml.save(&path).unwrap();

        let loaded = CakeToml::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.project.name.as_deref(), Some("shop"));
        assert_eq!(loaded.discovery.timeout_secs, 30);
    }

    #[test]
    fn test_validate_default_is_clean() {
        assert!(CakeToml::default().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let toml = CakeToml::parse(
            r#"
[project]
cake_dir = "/opt/cake"
interpreter = " "

[discovery]
timeout_secs = 0
"#,
        )
        .unwrap();
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("timeout_secs")));
        assert!(warnings.iter().any(|w| w.contains("interpreter")));
        assert!(warnings.iter().any(|w| w.contains("cake_dir")));
    }
}
