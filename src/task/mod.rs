//! Task plugins - the subcommands of the runner.
//!
//! Each task contributes its own options to the command line, pulls its
//! configuration out of the parsed arguments once, and then runs once.

pub mod build;
pub mod pack;

use clap::{ArgMatches, Command};

use crate::config::Config;
use crate::error::Result;
use crate::iso::{ImageEncoder, Xorriso};
use crate::registry::Registries;

pub use build::{BuildOptions, BuildTask};
pub use pack::PackagingTask;

pub trait Task {
    /// Add this task's arguments to its subcommand.
    fn configure_options(&self, command: Command, registries: &Registries) -> Command;

    /// Read the parsed arguments into the task.
    fn extract_arguments(&mut self, matches: &ArgMatches, registries: &Registries) -> Result<()>;

    fn run(&self, ctx: &TaskContext) -> Result<()>;
}

/// Everything a task needs from its environment.
pub struct TaskContext {
    pub config: Config,
    encoder: Box<dyn ImageEncoder>,
}

impl TaskContext {
    /// Context using xorriso as configured.
    pub fn new(config: Config) -> Self {
        let encoder = Box::new(Xorriso::new(config.xorriso.clone()));
        Self { config, encoder }
    }

    pub fn with_encoder(config: Config, encoder: Box<dyn ImageEncoder>) -> Self {
        Self { config, encoder }
    }

    pub fn encoder(&self) -> &dyn ImageEncoder {
        self.encoder.as_ref()
    }
}
