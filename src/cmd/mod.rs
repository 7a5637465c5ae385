//! CLI command implementations.
//!
//! | Module     | Commands handled              |
//! |------------|-------------------------------|
//! | `console`  | `List`, `Help`, `Run`, `Bake` |
//! | `project`  | `Info`                        |
//! | `config`   | `Config`                      |

pub mod config;
pub mod console;
pub mod project;

pub use config::cmd_config;
pub use console::{cmd_bake, cmd_help, cmd_list, cmd_run};
pub use project::cmd_info;

use anyhow::Result;
use cake_console::config::Config;
use cake_console::runner::Interrupt;
use std::path::PathBuf;

use super::Cli;

pub(crate) fn load_config(cli: &Cli, project_dir: PathBuf) -> Result<Config> {
    Config::new(project_dir, cli.verbose, cli.timeout)
}

/// Interrupt raised on Ctrl-C.
pub(crate) fn ctrl_c_interrupt() -> Interrupt {
    let interrupt = Interrupt::new();
    let trigger = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.raise();
        }
    });
    interrupt
}
