//! `build` - compiles the kernel with cargo.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::info;

use super::{Task, TaskContext};
use crate::bootloader::{Bootloader, Limine};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::Cmd;
use crate::registry::Registries;
use crate::target::Target;

pub const NAME: &str = "build";

pub fn register(registries: &mut Registries) -> Result<()> {
    registries.tasks.register(NAME, create)
}

fn create() -> Box<dyn Task> {
    Box::new(BuildTask::new())
}

/// Options shared by every task that builds the kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub target: Target,
    pub release: bool,
}

impl BuildOptions {
    pub fn profile(&self) -> &'static str {
        if self.release {
            "release"
        } else {
            "debug"
        }
    }
}

/// Add `--target`, `--bootloader` and `--release` to `command`.
pub fn build_arguments(command: Command, registries: &Registries) -> Command {
    let bootloaders: Vec<String> = registries.bootloaders.names().map(String::from).collect();

    command
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .value_name("ARCH")
                .help("Architecture to build for")
                .value_parser(value_parser!(Target))
                .default_value("x86_64"),
        )
        .arg(
            Arg::new("bootloader")
                .short('b')
                .long("bootloader")
                .value_name("LOADER")
                .help("Bootloader to build the kernel for")
                .value_parser(clap::builder::PossibleValuesParser::new(bootloaders))
                .default_value(crate::bootloader::limine::NAME),
        )
        .arg(
            Arg::new("release")
                .short('r')
                .long("release")
                .help("Do a release build of the kernel")
                .action(ArgAction::SetTrue),
        )
}

pub struct BuildTask {
    options: BuildOptions,
    bootloader: Box<dyn Bootloader>,
}

impl Default for BuildTask {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildTask {
    pub fn new() -> Self {
        Self {
            options: BuildOptions::default(),
            bootloader: Box::new(Limine),
        }
    }

    pub fn with(options: BuildOptions, bootloader: Box<dyn Bootloader>) -> Result<Self> {
        if !bootloader.supports_target(options.target) {
            return Err(Error::configuration(format!(
                "the selected bootloader ({}) does not support the selected target ({})",
                bootloader.name(),
                options.target
            )));
        }
        Ok(Self {
            options,
            bootloader,
        })
    }

    pub fn options(&self) -> BuildOptions {
        self.options
    }

    pub fn bootloader(&self) -> &dyn Bootloader {
        self.bootloader.as_ref()
    }

    /// Compile the kernel package of the selected bootloader.
    ///
    /// A nonzero cargo exit is a build failure; nothing is staged from a
    /// failed build.
    pub fn build(&self, config: &Config) -> Result<()> {
        if config.install_targets {
            install_target_if_needed(config, self.options.target)?;
        }

        let mut cargo = Cmd::new(&config.cargo)
            .args(["build", "--target", self.options.target.as_rust_target()])
            .args(["--package", self.bootloader.project()])
            .dir(&config.workspace)
            .error_msg(format!("cargo build of {} failed", self.bootloader.project()));
        if self.options.release {
            cargo = cargo.arg("--release");
        }

        cargo
            .run_interactive()
            .map_err(|e| Error::build(e.to_string()))?;
        Ok(())
    }
}

impl Task for BuildTask {
    fn configure_options(&self, command: Command, registries: &Registries) -> Command {
        build_arguments(command, registries).about(
            "Builds the kernel using cargo. The output will be an ELF file under the targets directory.",
        )
    }

    fn extract_arguments(&mut self, matches: &ArgMatches, registries: &Registries) -> Result<()> {
        let target = matches.get_one::<Target>("target").copied().unwrap_or_default();
        let bootloader = match matches.get_one::<String>("bootloader") {
            Some(name) => registries.bootloaders.create(name)?,
            None => Box::new(Limine),
        };
        let release = matches.get_flag("release");

        *self = Self::with(BuildOptions { target, release }, bootloader)?;
        Ok(())
    }

    fn run(&self, ctx: &TaskContext) -> Result<()> {
        self.build(&ctx.config)
    }
}

fn install_target_if_needed(config: &Config, target: Target) -> Result<()> {
    let triple = target.as_rust_target();
    let installed = Cmd::new(&config.rustup)
        .args(["target", "list", "--installed"])
        .run()
        .map_err(|e| Error::build(e.to_string()))?;

    if !installed.stdout.lines().any(|line| line.trim() == triple) {
        info!("Rust target {} not installed. Installing...", triple);
        Cmd::new(&config.rustup)
            .args(["target", "add", triple])
            .run_interactive()
            .map_err(|e| Error::build(e.to_string()))?;
    }

    Ok(())
}
