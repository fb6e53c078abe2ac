//! `pack` - builds the kernel and packs it with the bootloader into a hybrid ISO.
//!
//! Runs Building, Staging and Imaging in order. The first failure ends the
//! run; an image left behind by a failed run must not be used.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

use super::build::BuildTask;
use super::{Task, TaskContext};
use crate::config::DEFAULT_OUTPUT;
use crate::error::{Error, Result};
use crate::iso::ImageAssembler;
use crate::registry::Registries;
use crate::staging::StagingAssembler;
use crate::timing::timed;

pub const NAME: &str = "pack";

pub fn register(registries: &mut Registries) -> Result<()> {
    registries.tasks.register(NAME, create)
}

fn create() -> Box<dyn Task> {
    Box::new(PackagingTask::new())
}

/// Stages of one packaging run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackStage {
    Building,
    Staging,
    Imaging,
}

impl fmt::Display for PackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackStage::Building => f.write_str("Building kernel"),
            PackStage::Staging => f.write_str("Staging disk"),
            PackStage::Imaging => f.write_str("Creating image"),
        }
    }
}

pub struct PackagingTask {
    build: BuildTask,
    output: PathBuf,
    force: bool,
}

impl Default for PackagingTask {
    fn default() -> Self {
        Self::new()
    }
}

impl PackagingTask {
    pub fn new() -> Self {
        Self {
            build: BuildTask::new(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            force: false,
        }
    }

    pub fn with(build: BuildTask, output: PathBuf, force: bool) -> Result<Self> {
        if !build.bootloader().supports_disk_boot() {
            return Err(Error::configuration(format!(
                "the {} bootloader does not support booting from disk",
                build.bootloader().name()
            )));
        }
        Ok(Self {
            build,
            output,
            force,
        })
    }

    /// Output path, relative paths resolved against the workspace.
    fn output_path(&self, ctx: &TaskContext) -> PathBuf {
        if self.output.is_absolute() {
            self.output.clone()
        } else {
            ctx.config.workspace.join(&self.output)
        }
    }

    /// Stage the disk tree and write the image, assuming the kernel is built.
    pub fn package(&self, ctx: &TaskContext) -> Result<()> {
        let bootloader = self.build.bootloader();
        let staging = StagingAssembler::new(&ctx.config, self.build.options(), self.force);

        timed(PackStage::Staging, || staging.assemble(bootloader))?;

        let output = self.output_path(ctx);
        timed(PackStage::Imaging, || {
            ImageAssembler::new(&ctx.config.disk_dir).package(bootloader, ctx.encoder(), &output)?;
            bootloader.post_process(&staging.area(), &output)
        })?;

        info!("Created image at {}", output.display());
        Ok(())
    }
}

impl Task for PackagingTask {
    fn configure_options(&self, command: Command, registries: &Registries) -> Command {
        self.build
            .configure_options(command, registries)
            .about(
                "Packages the kernel and bootloader into a hybrid iso image. Builds the kernel before packaging.",
            )
            .arg(
                Arg::new("output")
                    .short('o')
                    .long("output")
                    .value_name("PATH")
                    .help("Path to the iso file to create")
                    .value_parser(value_parser!(PathBuf))
                    .default_value(DEFAULT_OUTPUT),
            )
            .arg(
                Arg::new("force")
                    .short('f')
                    .long("force")
                    .help("Forces a new disk directory to be created")
                    .action(ArgAction::SetTrue),
            )
    }

    fn extract_arguments(&mut self, matches: &ArgMatches, registries: &Registries) -> Result<()> {
        let mut build = BuildTask::new();
        build.extract_arguments(matches, registries)?;

        let output = matches
            .get_one::<PathBuf>("output")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        let force = matches.get_flag("force");

        *self = Self::with(build, output, force)?;
        Ok(())
    }

    fn run(&self, ctx: &TaskContext) -> Result<()> {
        ctx.encoder().check()?;

        timed(PackStage::Building, || self.build.build(&ctx.config))?;

        self.package(ctx)
    }
}
