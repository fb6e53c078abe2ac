//! Command line assembled from the task registry.

use clap::{ArgMatches, Command};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::Registries;
use crate::task::{Task, TaskContext};

/// Prints the resolved configuration.
pub const CONFIG_COMMAND: &str = "config";

/// The root command with one subcommand per registered task.
pub fn command(registries: &Registries) -> Command {
    let mut root = Command::new("xtask")
        .about("Helper program to build and develop the microdragon kernel")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .after_help(
            "QUICK START:\n  xtask build        Build the kernel\n  xtask pack         Build the kernel and create microdragon.iso\n  xtask pack --force Rebuild the disk directory from scratch",
        );

    for name in registries.tasks.names() {
        // Plugins are only instantiated here to describe their options.
        if let Ok(task) = registries.tasks.create(name) {
            root = root.subcommand(task.configure_options(Command::new(name.to_string()), registries));
        }
    }

    root.subcommand(Command::new(CONFIG_COMMAND).about("Show the resolved configuration"))
}

/// Resolve the task named by `name` and configure it from `matches`.
pub fn resolve_task(
    registries: &Registries,
    name: &str,
    matches: &ArgMatches,
) -> Result<Box<dyn Task>> {
    let mut task = registries.tasks.create(name)?;
    task.extract_arguments(matches, registries)?;
    Ok(task)
}

/// Run the subcommand selected in `matches`.
pub fn dispatch(registries: &Registries, matches: &ArgMatches, config: Config) -> Result<()> {
    match matches.subcommand() {
        Some((CONFIG_COMMAND, _)) => {
            config.print();
            Ok(())
        }
        Some((name, sub)) => {
            let task = resolve_task(registries, name, sub)?;
            task.run(&TaskContext::new(config))
        }
        None => Err(Error::configuration("no subcommand given")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (String, ArgMatches) {
        let registries = Registries::builtin().unwrap();
        let matches = command(&registries).try_get_matches_from(args).unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        (name.to_string(), sub.clone())
    }

    #[test]
    fn test_subcommands_come_from_registry() {
        let registries = Registries::builtin().unwrap();
        let cmd = command(&registries);
        let names: Vec<_> = cmd.get_subcommands().map(|c| c.get_name()).collect();
        assert_eq!(names, ["build", "pack", "config"]);
    }

    #[test]
    fn test_build_defaults() {
        let (name, _) = parse(&["xtask", "build"]);
        assert_eq!(name, "build");
    }

    #[test]
    fn test_unknown_bootloader_rejected_by_parser() {
        let registries = Registries::builtin().unwrap();
        let result = command(&registries).try_get_matches_from(["xtask", "build", "-b", "Grub"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_target_rejected_by_parser() {
        let registries = Registries::builtin().unwrap();
        let result = command(&registries).try_get_matches_from(["xtask", "pack", "-t", "mips"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_pack_with_rust_bootloader_is_configuration_error() {
        let registries = Registries::builtin().unwrap();
        let (name, sub) = parse(&["xtask", "pack", "--bootloader", "Rust"]);
        let err = resolve_task(&registries, &name, &sub).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_with_rust_bootloader_on_riscv_is_configuration_error() {
        let registries = Registries::builtin().unwrap();
        let (name, sub) = parse(&["xtask", "build", "-b", "Rust", "-t", "riscv"]);
        let err = resolve_task(&registries, &name, &sub).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_pack_options_resolve() {
        let registries = Registries::builtin().unwrap();
        let (name, sub) = parse(&["xtask", "pack", "-t", "aarch64", "-r", "-f", "-o", "out.iso"]);
        assert!(resolve_task(&registries, &name, &sub).is_ok());
        assert!(sub.get_flag("force"));
        assert!(sub.get_flag("release"));
    }
}
