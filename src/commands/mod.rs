//! Console command model: parsed descriptors and the flattened registry.

pub mod parser;
pub mod registry;

pub use parser::{parse, parse_help};
pub use registry::{DiscoveryOptions, RegistryBuilder};

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Provider that never gets a namespace prefix.
pub const CORE_PROVIDER: &str = "CORE";

static PLAIN_PROVIDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]+$").unwrap());

/// A command as reported by the console, with its immediate subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandDescriptor {
    pub command: String,
    pub description: String,
    pub display_name: String,
    pub subcommands: Vec<CommandDescriptor>,
}

impl CommandDescriptor {
    pub fn new(
        command: impl Into<String>,
        description: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
            display_name: display_name.into(),
            subcommands: Vec::new(),
        }
    }
}

/// A resolved command offered to the caller.
///
/// `commands` holds one segment (`bake`) or two (`bake`, `model`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub commands: Vec<String>,
    pub description: String,
    pub display_name: String,
}

impl RegistryEntry {
    pub fn single(
        command: impl Into<String>,
        description: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            commands: vec![command.into()],
            description: description.into(),
            display_name: display_name.into(),
        }
    }

    pub fn compound(
        command: impl Into<String>,
        subcommand: impl Into<String>,
        description: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            commands: vec![command.into(), subcommand.into()],
            description: description.into(),
            display_name: display_name.into(),
        }
    }

    /// Degraded entry built straight from a command-list item.
    pub fn bare(item: &CommandDescriptor) -> Self {
        Self::single(&item.command, &item.description, &item.display_name)
    }

    pub fn command_line(&self) -> String {
        self.commands.join(" ")
    }
}

/// Qualify `command` with its provider unless the provider is `CORE` or a
/// plain lowercase identifier.
pub fn qualify(provider: &str, command: &str) -> String {
    if provider == CORE_PROVIDER || PLAIN_PROVIDER_REGEX.is_match(provider) {
        command.to_string()
    } else {
        format!("{}.{}", provider, command)
    }
}

/// `"[PROVIDER] description"`.
pub fn tag_description(provider: &str, description: &str) -> String {
    format!("[{}] {}", provider, description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_plugin_provider() {
        assert_eq!(qualify("Bake", "all"), "Bake.all");
        assert_eq!(qualify("DebugKit", "benchmark"), "DebugKit.benchmark");
    }

    #[test]
    fn test_qualify_core_provider() {
        assert_eq!(qualify("CORE", "all"), "all");
    }

    #[test]
    fn test_qualify_plain_provider() {
        assert_eq!(qualify("app", "report"), "report");
        assert_eq!(qualify("my-plugin_2", "sync"), "sync");
    }

    #[test]
    fn test_qualify_mixed_case_is_prefixed() {
        assert_eq!(qualify("app Vendor", "x"), "app Vendor.x");
        assert_eq!(qualify("", "x"), ".x");
    }

    #[test]
    fn test_tag_description() {
        assert_eq!(tag_description("CORE", "Bake stuff"), "[CORE] Bake stuff");
    }

    #[test]
    fn test_registry_entry_shapes() {
        let single = RegistryEntry::single("bake", "[CORE] Bake", "bake");
        assert_eq!(single.commands, vec!["bake".to_string()]);
        assert_eq!(single.command_line(), "bake");

        let compound = RegistryEntry::compound("bake", "model", "[CORE] Model", "bake model");
        assert_eq!(compound.commands, vec!["bake".to_string(), "model".to_string()]);
        assert_eq!(compound.command_line(), "bake model");
    }

    #[test]
    fn test_registry_entry_serializes() {
        let entry = RegistryEntry::single("acl", "[CORE]", "acl");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["commands"][0], "acl");
        assert_eq!(json["description"], "[CORE]");
        assert_eq!(json["display_name"], "acl");
    }
}
