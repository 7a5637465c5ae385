pub mod cake_config;
pub mod commands;
pub mod config;
pub mod errors;
pub mod logging;
pub mod project;
pub mod runner;
pub mod script;

pub use commands::{CommandDescriptor, RegistryEntry};
pub use errors::ConsoleError;
pub use runner::{ExecutionResult, Interrupt, OutputSink};
pub use script::CakeScript;
