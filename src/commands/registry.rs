//! Command discovery.
//!
//! Three tiers are tried in order and the first that yields commands wins:
//!
//! 1. XML: `command_list --xml`, then `<cmd> --help xml` per command
//! 2. Directories: shell scripts found in the 1.x shell directories
//! 3. Interactive rerun: `command_list` on the console so the user sees the
//!    error (2.x only). Nothing is parsed and the result is `None`.
//!
//! No state survives a `build` call; every call spawns its own processes
//! and owns its own temporary file.

use super::{CommandDescriptor, RegistryEntry, parse, parse_help, qualify, tag_description};
use crate::errors::ConsoleError;
use crate::project::CakeProject;
use crate::runner::{Interrupt, OutputSink, RunRequest, ScriptRunner};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

pub const HELP_COMMAND: &str = "--help";
pub const LIST_COMMAND: &str = "command_list";
const LIST_XML_COMMAND: [&str; 2] = [LIST_COMMAND, "--xml"];
const TEMP_FILE_PREFIX: &str = "cake-console-commands-";
const TEMP_FILE_SUFFIX: &str = ".xml";
/// File stem of the base class living next to the shells.
const SHELL_BASE_NAME: &str = "shell";

/// Knobs for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Upper bound on each wait; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub xml_discovery: bool,
    pub interactive_rerun: bool,
    /// Directory for the temporary XML file (system temp dir when unset).
    pub temp_dir: Option<PathBuf>,
    pub interrupt: Interrupt,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(120)),
            xml_discovery: true,
            interactive_rerun: true,
            temp_dir: None,
            interrupt: Interrupt::new(),
        }
    }
}

pub struct RegistryBuilder<'a> {
    project: &'a CakeProject,
    runner: &'a ScriptRunner,
    options: &'a DiscoveryOptions,
}

impl<'a> RegistryBuilder<'a> {
    pub fn new(
        project: &'a CakeProject,
        runner: &'a ScriptRunner,
        options: &'a DiscoveryOptions,
    ) -> Self {
        Self {
            project,
            runner,
            options,
        }
    }

    /// Discover the project's commands.
    ///
    /// `None` means every tier failed and the command list is unavailable.
    pub async fn build(&self) -> Option<Vec<RegistryEntry>> {
        if self.options.xml_discovery {
            match self.discover_xml().await {
                Ok(entries) => {
                    tracing::info!("Discovered {} commands from console XML", entries.len());
                    return Some(entries);
                }
                Err(e) if e.is_recoverable() => tracing::info!("XML command discovery failed: {}", e),
                Err(e) => tracing::warn!("XML command discovery failed: {}", e),
            }
        }

        match self.discover_directories() {
            Ok(entries) => {
                tracing::info!("Discovered {} commands from shell directories", entries.len());
                return Some(entries);
            }
            Err(e) => tracing::info!("Directory command discovery failed: {}", e),
        }

        if self.options.interactive_rerun && self.project.version().is_some_and(|v| v.is_major(2)) {
            self.rerun_interactive().await;
        }
        None
    }

    fn temp_file(&self) -> Result<NamedTempFile, ConsoleError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_FILE_PREFIX).suffix(TEMP_FILE_SUFFIX);
        let file = match &self.options.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        file.map_err(ConsoleError::TempFile)
    }

    async fn redirect_to_file(&self, file: &Path, arguments: &[&str]) -> Result<(), ConsoleError> {
        let request = RunRequest::new(arguments.iter().copied(), OutputSink::File(file.to_path_buf()))
            .display_name(self.project.display_name(arguments[0]));
        let handle = self.runner.run(request)?;
        handle
            .wait(self.options.timeout, &self.options.interrupt)
            .await?
            .check()
    }

    async fn read_descriptors(
        &self,
        file: &Path,
        parser: fn(&str) -> Result<Vec<CommandDescriptor>, ConsoleError>,
    ) -> Result<Vec<CommandDescriptor>, ConsoleError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|source| ConsoleError::OutputFile {
                path: file.to_path_buf(),
                source,
            })?;
        parser(&String::from_utf8_lossy(&bytes))
    }

    /// Tier 1. The temporary file is removed when `tmp` drops, on every path.
    async fn discover_xml(&self) -> Result<Vec<RegistryEntry>, ConsoleError> {
        let tmp = self.temp_file()?;
        let path = tmp.path();

        self.redirect_to_file(path, &LIST_XML_COMMAND).await?;
        let items = self.read_descriptors(path, parse).await?;
        if items.is_empty() {
            return Err(ConsoleError::EmptyDiscovery);
        }

        let mut entries = Vec::new();
        for item in &items {
            let help = [item.command.as_str(), HELP_COMMAND, "xml"];
            if let Err(e) = self.redirect_to_file(path, &help).await {
                // Degrade to the list item rather than failing the tier.
                tracing::debug!("Help for {} unavailable: {}", item.command, e);
                entries.push(RegistryEntry::bare(item));
                continue;
            }

            let described = match self.read_descriptors(path, parse_help).await {
                Ok(described) => described,
                Err(e) => {
                    tracing::warn!("Xml file error for {}: {}", item.command, e);
                    entries.push(RegistryEntry::bare(item));
                    continue;
                }
            };
            let Some(main) = described.first() else {
                return Err(ConsoleError::EmptyDiscovery);
            };

            let provider = item.description.as_str();
            let main_command = qualify(provider, &main.command);
            entries.push(RegistryEntry::single(
                &main_command,
                tag_description(provider, &main.description),
                &main.display_name,
            ));
            for sub in &main.subcommands {
                entries.push(RegistryEntry::compound(
                    &main_command,
                    &sub.command,
                    tag_description(provider, &sub.description),
                    format!("{} {}", main.command, sub.display_name),
                ));
            }
        }
        Ok(entries)
    }

    /// Tier 2, for 1.x layouts without XML introspection.
    fn discover_directories(&self) -> Result<Vec<RegistryEntry>, ConsoleError> {
        let mut entries = Vec::new();
        for (place, dir) in self.project.shell_directories() {
            let Ok(read_dir) = std::fs::read_dir(&dir) else {
                continue;
            };
            let mut shells: Vec<PathBuf> = read_dir
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && !is_hidden(p))
                .collect();
            shells.sort();

            for shell in shells {
                let Some(name) = shell.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                    continue;
                };
                if name == SHELL_BASE_NAME {
                    continue;
                }
                entries.push(RegistryEntry::single(&name, format!("[{}]", place), &name));
            }
        }

        if entries.is_empty() {
            return Err(ConsoleError::EmptyDiscovery);
        }
        Ok(entries)
    }

    /// Tier 3: show `command_list` on the console so errors reach the user.
    async fn rerun_interactive(&self) {
        tracing::info!("Re-running {} interactively", LIST_COMMAND);
        let request = RunRequest::new([LIST_COMMAND], OutputSink::Console)
            .display_name(self.project.display_name(LIST_COMMAND));
        let result = match self.runner.run(request) {
            Ok(handle) => handle.wait(self.options.timeout, &self.options.interrupt).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!("Interactive {} failed: {}", LIST_COMMAND, e);
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::tests::create_test_script;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const LIST_XML: &str = r#"<?xml version="1.0"?>
<shells>
  <shell name="bake" call_as="bake" provider="CORE" help="bake -h"/>
  <shell name="all" call_as="Bake.all" provider="Bake" help="Bake.all -h"/>
  <shell name="broken" call_as="broken" provider="CORE" help="broken -h"/>
</shells>"#;

    const BAKE_HELP_XML: &str = r#"<?xml version="1.0"?>
<shell>
  <command>bake</command>
  <description>Bake code</description>
  <subcommands>
    <command name="model" help="Bake a model."/>
    <command name="view" help="Bake views."/>
  </subcommands>
</shell>"#;

    const ALL_HELP_XML: &str = r#"<?xml version="1.0"?>
<shell>
  <command>all</command>
  <description>Bake everything</description>
</shell>"#;

    struct Fixture {
        dir: TempDir,
        tmp: TempDir,
        project: CakeProject,
        runner: ScriptRunner,
    }

    impl Fixture {
        fn options(&self) -> DiscoveryOptions {
            DiscoveryOptions {
                timeout: Some(Duration::from_secs(10)),
                temp_dir: Some(self.tmp.path().to_path_buf()),
                ..Default::default()
            }
        }

        fn temp_files(&self) -> usize {
            fs::read_dir(self.tmp.path()).unwrap().count()
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn log(&self) -> String {
            fs::read_to_string(self.dir.path().join("calls.log")).unwrap_or_default()
        }
    }

    /// A fake console whose body is a `case "$*"` over argument strings.
    fn fixture(cases: &str) -> Fixture {
        let dir = tempdir().unwrap();
        let tmp = tempdir().unwrap();
        for (name, content) in [
            ("list.xml", LIST_XML),
            ("bake.xml", BAKE_HELP_XML),
            ("all.xml", ALL_HELP_XML),
        ] {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let body = format!(
            "#!/bin/sh\nD=\"$(dirname \"$0\")\"\necho \"$*\" >> \"$D/calls.log\"\ncase \"$*\" in\n{}\n*) exit 1 ;;\nesac\n",
            cases
        );
        let script = create_test_script(dir.path(), "cake", &body);
        let project = CakeProject::new(dir.path(), None, Some("blog".into()));
        let runner = ScriptRunner::new(&script, dir.path());
        Fixture {
            dir,
            tmp,
            project,
            runner,
        }
    }

    const FULL_CASES: &str = r#"
"command_list --xml") cat "$D/list.xml" ;;
"bake --help xml") cat "$D/bake.xml" ;;
"Bake.all --help xml") cat "$D/all.xml" ;;
"broken --help xml") echo "PHP Fatal error" ;;"#;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_xml_discovery_flattens_commands() {
        let f = fixture(FULL_CASES);
        let options = f.options();
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await
            .unwrap();

        assert_eq!(
            entries,
            vec![
                RegistryEntry::single("bake", "[CORE] Bake code", "bake"),
                RegistryEntry::compound("bake", "model", "[CORE] Bake a model.", "bake model"),
                RegistryEntry::compound("bake", "view", "[CORE] Bake views.", "bake view"),
                RegistryEntry::single("Bake.all", "[Bake] Bake everything", "all"),
                // malformed help degrades to the list item
                RegistryEntry::single("broken", "CORE", "broken"),
            ]
        );
        assert_eq!(f.temp_files(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_help_run_degrades_to_bare_entry() {
        let f = fixture(
            r#"
"command_list --xml") cat "$D/list.xml" ;;
"bake --help xml") cat "$D/bake.xml" ;;"#,
        );
        let options = f.options();
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await
            .unwrap();

        // Bake.all and broken exit 1 on --help
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[3], RegistryEntry::single("Bake.all", "Bake", "all"));
        assert_eq!(entries[4], RegistryEntry::single("broken", "CORE", "broken"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_xml_success_skips_directory_tier() {
        let f = fixture(FULL_CASES);
        f.write("cake/console/libs/schema.php", "<?php");
        let options = f.options();
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await
            .unwrap();

        assert!(entries.iter().all(|e| e.commands[0] != "schema"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_list_falls_back_to_directories() {
        let f = fixture(r#""command_list --xml") echo "<shells></shells>" ;;"#);
        f.write("cake/console/libs/bake.php", "<?php");
        let options = f.options();
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await
            .unwrap();

        assert_eq!(entries, vec![RegistryEntry::single("bake", "[CORE]", "bake")]);
        assert_eq!(f.temp_files(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_malformed_list_falls_back_and_cleans_up() {
        let f = fixture(r#""command_list --xml") echo "Error: Shell class not found" ;;"#);
        f.write("vendors/shells/cleanup.php", "<?php");
        let options = f.options();
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await
            .unwrap();

        assert_eq!(entries, vec![RegistryEntry::single("cleanup", "[VENDOR]", "cleanup")]);
        assert_eq!(f.temp_files(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_help_abandons_xml_tier() {
        let f = fixture(
            r#"
"command_list --xml") cat "$D/list.xml" ;;
"bake --help xml") echo "<shell/>" ;;"#,
        );
        f.write("cake/console/libs/acl.php", "<?php");
        let options = f.options();
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await
            .unwrap();

        assert_eq!(entries, vec![RegistryEntry::single("acl", "[CORE]", "acl")]);
        assert_eq!(f.temp_files(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_directory_scenario_without_xml() {
        let f = fixture("");
        f.write("cake/console/libs/bake.php", "<?php");
        f.write("cake/console/libs/shell.php", "<?php");
        fs::create_dir_all(f.dir.path().join("cake/console/libs/templates")).unwrap();
        fs::create_dir_all(f.dir.path().join("vendors/shells")).unwrap();
        f.write("app/vendors/shells/custom.php", "<?php");
        f.write("app/vendors/shells/shell.php", "<?php");

        let options = DiscoveryOptions {
            xml_discovery: false,
            ..f.options()
        };
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await
            .unwrap();

        assert_eq!(
            entries,
            vec![
                RegistryEntry::single("bake", "[CORE]", "bake"),
                RegistryEntry::single("custom", "[APP VENDOR]", "custom"),
            ]
        );
        // the console was never invoked
        assert!(f.log().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_directory_tier_skips_hidden_files() {
        let f = fixture("");
        f.write("vendors/shells/.gitkeep", "");
        f.write("vendors/shells/.DS_Store", "");
        f.write("vendors/shells/deploy.php", "<?php");

        let options = DiscoveryOptions {
            xml_discovery: false,
            ..f.options()
        };
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await
            .unwrap();

        assert_eq!(entries, vec![RegistryEntry::single("deploy", "[VENDOR]", "deploy")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_directory_tier_with_only_hidden_files_fails() {
        let f = fixture("");
        f.write("vendors/shells/.gitkeep", "");
        let options = DiscoveryOptions {
            xml_discovery: false,
            ..f.options()
        };

        assert!(RegistryBuilder::new(&f.project, &f.runner, &options).build().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_items_with_text_are_not_read_as_help() {
        let f = fixture(
            r#"
"command_list --xml") echo '<shells><shell name="cache" provider="CORE">Cache tools</shell><shell name="i18n" provider="CORE"/></shells>' ;;"#,
        );
        let options = f.options();
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await
            .unwrap();

        // both help runs exit 1, so each list item is kept as-is
        assert_eq!(
            entries,
            vec![
                RegistryEntry::single("cache", "CORE", "cache"),
                RegistryEntry::single("i18n", "CORE", "i18n"),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancelled_run_falls_through() {
        let f = fixture(r#""command_list --xml") sleep 10 ;;"#);
        f.write("app/vendors/shells/custom.php", "<?php");
        let options = DiscoveryOptions {
            timeout: Some(Duration::from_millis(200)),
            ..f.options()
        };
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await
            .unwrap();

        assert_eq!(
            entries,
            vec![RegistryEntry::single("custom", "[APP VENDOR]", "custom")]
        );
        assert_eq!(f.temp_files(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_all_tiers_fail_reruns_for_2x() {
        let f = fixture(r#""command_list") exit 0 ;;"#);
        f.write("lib/Cake/VERSION.txt", "2.4.0\n");
        let options = f.options();
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await;

        assert!(entries.is_none());
        assert_eq!(f.log(), "command_list --xml\ncommand_list\n");
        assert_eq!(f.temp_files(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_all_tiers_fail_without_rerun_for_1x() {
        let f = fixture("");
        f.write("cake/VERSION.txt", "1.3.15\n");
        let options = f.options();
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await;

        assert!(entries.is_none());
        assert_eq!(f.log(), "command_list --xml\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rerun_disabled_by_option() {
        let f = fixture("");
        f.write("lib/Cake/VERSION.txt", "2.4.0\n");
        let options = DiscoveryOptions {
            interactive_rerun: false,
            ..f.options()
        };
        let entries = RegistryBuilder::new(&f.project, &f.runner, &options)
            .build()
            .await;

        assert!(entries.is_none());
        assert_eq!(f.log(), "command_list --xml\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_concurrent_builds_use_separate_temp_files() {
        let f = fixture(FULL_CASES);
        let options = f.options();
        let builder = RegistryBuilder::new(&f.project, &f.runner, &options);
        let (a, b) = tokio::join!(builder.build(), builder.build());

        assert_eq!(a, b);
        assert_eq!(a.map(|e| e.len()), Some(5));
        assert_eq!(f.temp_files(), 0);
    }
}
