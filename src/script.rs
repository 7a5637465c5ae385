//! Per-project entry point to the CakePHP console.

use crate::commands::registry::{HELP_COMMAND, LIST_COMMAND};
use crate::commands::{DiscoveryOptions, RegistryBuilder, RegistryEntry};
use crate::config::Config;
use crate::errors::ConsoleError;
use crate::project::{CakeProject, SCRIPT_NAME_LONG};
use crate::runner::{ExecutionResult, Interrupt, LineCollector, OutputSink, RunRequest, ScriptRunner};

pub const BAKE_COMMAND: &str = "bake";

/// A project's validated console script.
pub struct CakeScript {
    project: CakeProject,
    runner: ScriptRunner,
    options: DiscoveryOptions,
}

impl CakeScript {
    pub fn new(project: CakeProject, runner: ScriptRunner, options: DiscoveryOptions) -> Self {
        Self {
            project,
            runner,
            options,
        }
    }

    /// Locate and validate the project's script.
    ///
    /// Fails with [`ConsoleError::InvalidExecutable`] before anything is run.
    pub fn for_project(config: &Config, interrupt: Interrupt) -> Result<Self, ConsoleError> {
        let project = config.project();
        let Some(script) = config.script_override().or_else(|| project.locate_script()) else {
            let e = ConsoleError::invalid_executable(
                project.cake_dir().join("app/Console").join(SCRIPT_NAME_LONG),
                "cake script not found",
            );
            tracing::warn!("Project's cake script is not valid: {}", e);
            return Err(e);
        };

        let runner = ScriptRunner::new(&script, project.cake_dir())
            .with_interpreter(config.interpreter())
            .with_default_params(config.default_params());
        if let Err(e) = runner.validate() {
            tracing::warn!("Project's cake script is not valid: {}", e);
            return Err(e);
        }

        Ok(Self::new(project, runner, config.discovery_options(interrupt)))
    }

    pub fn project(&self) -> &CakeProject {
        &self.project
    }

    pub fn runner(&self) -> &ScriptRunner {
        &self.runner
    }

    /// Run a command with output going to `sink` and wait for it.
    pub async fn run_command(
        &self,
        arguments: &[String],
        sink: OutputSink,
    ) -> Result<ExecutionResult, ConsoleError> {
        let command = arguments.first().map(String::as_str).unwrap_or(LIST_COMMAND);
        let request =
            RunRequest::new(arguments.iter().cloned(), sink).display_name(self.project.display_name(command));
        let handle = self.runner.run(request)?;
        // Interactive runs are driven by the user, so no upper bound here.
        handle.wait(None, &self.options.interrupt).await
    }

    /// Help text of a command (`<args..> --help`), empty when unavailable.
    pub async fn help(&self, arguments: &[String]) -> String {
        let mut all = arguments.to_vec();
        all.push(HELP_COMMAND.to_string());

        let collector = LineCollector::new();
        let command = all[0].clone();
        let request =
            RunRequest::new(all, collector.sink()).display_name(self.project.display_name(&command));

        let waited = match self.runner.run(request) {
            Ok(handle) => handle.wait(self.options.timeout, &self.options.interrupt).await,
            Err(e) => Err(e),
        };
        match waited {
            Ok(result) if result.cancelled => tracing::debug!("Help for {} was cancelled", command),
            Ok(_) => {}
            Err(ConsoleError::Interrupted) => tracing::debug!("Interrupted while reading help for {}", command),
            Err(e) => tracing::warn!("Failed to read help for {}: {}", command, e),
        }
        collector.contents()
    }

    /// Discover the commands; `None` when the list is unavailable.
    pub async fn commands(&self) -> Option<Vec<RegistryEntry>> {
        RegistryBuilder::new(&self.project, &self.runner, &self.options)
            .build()
            .await
    }

    pub async fn bake(&self) -> Result<ExecutionResult, ConsoleError> {
        self.run_command(&[BAKE_COMMAND.to_string()], OutputSink::Console)
            .await
    }
}
