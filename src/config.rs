//! Configuration management for the xtask runner.
//!
//! Reads configuration from the process environment. `main` loads a `.env`
//! file first (via dotenvy), so variables set there act as defaults that the
//! real environment overrides.

use std::path::{Path, PathBuf};
use tracing::info;

/// Default staging directory name, relative to the workspace root.
pub const DEFAULT_DISK_DIR: &str = "disk";
/// Default location of fetched dependencies (`deps/limine`, `deps/manifest.json`).
pub const DEFAULT_DEPS_DIR: &str = "deps";
/// Default cargo output directory.
pub const DEFAULT_TARGET_DIR: &str = "target";
/// Default image written by `pack`.
pub const DEFAULT_OUTPUT: &str = "microdragon.iso";

/// Workspace configuration shared by all tasks.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace root (where `Cargo.toml`, `bootloader/` and `deps/` live)
    pub workspace: PathBuf,
    /// Staging tree that gets turned into the image
    pub disk_dir: PathBuf,
    /// Downloaded dependencies (`deps/limine`, ...)
    pub deps_dir: PathBuf,
    /// Cargo target directory holding the built kernel
    pub target_dir: PathBuf,
    /// Program used to build the kernel
    pub cargo: String,
    /// Program used to manage Rust targets
    pub rustup: String,
    /// Program used to encode the ISO image
    pub xorriso: String,
    /// Program used to fetch git dependencies
    pub git: String,
    /// Program used to build dependency host tools
    pub make: String,
    /// Install the rustup target before building if it is missing
    pub install_targets: bool,
}

impl Config {
    /// Load configuration for the current directory from the environment.
    pub fn load() -> std::io::Result<Self> {
        let workspace = std::env::current_dir()?;
        Ok(Self::from_lookup(&workspace, |key| std::env::var(key).ok()))
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(workspace: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |value: Option<String>, default: &str| {
            let path = PathBuf::from(value.unwrap_or_else(|| default.to_string()));
            if path.is_absolute() {
                path
            } else {
                workspace.join(path)
            }
        };

        let disk_dir = resolve(lookup("MICRODRAGON_DISK_DIR"), DEFAULT_DISK_DIR);
        let deps_dir = resolve(lookup("MICRODRAGON_DEPS_DIR"), DEFAULT_DEPS_DIR);
        let target_dir = resolve(
            lookup("MICRODRAGON_TARGET_DIR").or_else(|| lookup("CARGO_TARGET_DIR")),
            DEFAULT_TARGET_DIR,
        );

        let install_targets = lookup("MICRODRAGON_INSTALL_TARGETS")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        Self {
            workspace: workspace.to_path_buf(),
            disk_dir,
            deps_dir,
            target_dir,
            cargo: lookup("CARGO").unwrap_or_else(|| "cargo".to_string()),
            rustup: lookup("RUSTUP").unwrap_or_else(|| "rustup".to_string()),
            xorriso: lookup("XORRISO").unwrap_or_else(|| "xorriso".to_string()),
            git: lookup("GIT").unwrap_or_else(|| "git".to_string()),
            make: lookup("MAKE").unwrap_or_else(|| "make".to_string()),
            install_targets,
        }
    }

    /// Log the resolved configuration.
    pub fn print(&self) {
        info!("Configuration:");
        info!("  workspace:        {}", self.workspace.display());
        info!("  disk directory:   {}", self.disk_dir.display());
        info!("  deps directory:   {}", self.deps_dir.display());
        info!("  target directory: {}", self.target_dir.display());
        info!("  cargo:            {}", self.cargo);
        info!("  rustup:           {}", self.rustup);
        info!("  xorriso:          {}", self.xorriso);
        info!("  git:              {}", self.git);
        info!("  make:             {}", self.make);
        info!("  install targets:  {}", self.install_targets);
    }
}
