//! Staging tree assembly.
//!
//! The staging tree (`disk/` by default) mirrors the final image. It is kept
//! between runs and refreshed with copy-if-newer semantics, so an unchanged
//! input costs one `stat` and no I/O. `--force` wipes it first. Bootloader
//! dependencies are resolved into `deps/` before their files are staged.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::bootloader::Bootloader;
use crate::config::Config;
use crate::deps::DependencyManager;
use crate::error::{missing_source, Error, Result};
use crate::target::Target;
use crate::task::BuildOptions;

/// Directory below the staging root that receives the kernel.
pub const SYSTEM_DIR: &str = "system";
/// File name of the kernel inside [`SYSTEM_DIR`].
pub const KERNEL_FILE: &str = "kernel";

/// Create `path` and all missing parents.
pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::staging_io("create directory", path, e))
}

/// Copy `source` to `target` unless `target` is at least as new as `source`.
///
/// Returns whether a copy happened. After a copy the target carries the
/// source's modification time, so calling this again is a no-op until the
/// source changes.
pub fn copy_if_newer(target: &Path, source: &Path) -> Result<bool> {
    let source_meta = match fs::metadata(source) {
        Ok(meta) if meta.is_file() => meta,
        Ok(_) => {
            return Err(Error::staging(format!(
                "source is not a regular file: {}",
                source.display()
            )))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(missing_source(source)),
        Err(e) => return Err(Error::staging_io("read metadata of", source, e)),
    };
    let source_time = source_meta
        .modified()
        .map_err(|e| Error::staging_io("read modification time of", source, e))?;

    match fs::metadata(target) {
        Ok(target_meta) => {
            let target_time = target_meta
                .modified()
                .map_err(|e| Error::staging_io("read modification time of", target, e))?;
            if source_time <= target_time {
                debug!("Up to date: {}", target.display());
                return Ok(false);
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::staging_io("read metadata of", target, e)),
    }

    info!(
        "Copying file from {} to {}...",
        source.display(),
        target.display()
    );
    // Content only; the staged copy keeps its own permission bits.
    let mut reader =
        fs::File::open(source).map_err(|e| Error::staging_io("open", source, e))?;
    let mut writer = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(target)
        .map_err(|e| Error::staging_io("open", target, e))?;
    io::copy(&mut reader, &mut writer).map_err(|e| Error::staging_io("copy to", target, e))?;

    writer
        .set_modified(source_time)
        .map_err(|e| Error::staging_io("set modification time of", target, e))?;

    Ok(true)
}

/// View of the staging tree handed to bootloaders.
///
/// Relative paths are resolved against the staging root.
#[derive(Debug, Clone, Copy)]
pub struct StagingArea<'a> {
    config: &'a Config,
    target: Target,
}

impl<'a> StagingArea<'a> {
    pub fn new(config: &'a Config, target: Target) -> Self {
        Self { config, target }
    }

    pub fn root(&self) -> &Path {
        &self.config.disk_dir
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn deps_dir(&self) -> &Path {
        &self.config.deps_dir
    }

    pub fn workspace(&self) -> &Path {
        &self.config.workspace
    }

    /// Ensure `relative` exists below the staging root.
    pub fn ensure_directory(&self, relative: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        ensure_directory(&path)?;
        Ok(path)
    }

    /// Copy-if-newer `source` into the staging tree at `relative`.
    pub fn copy_if_newer(&self, relative: &str, source: &Path) -> Result<bool> {
        copy_if_newer(&self.path(relative), source)
    }
}

/// Builds or refreshes the staging tree for one packaging run.
pub struct StagingAssembler<'a> {
    area: StagingArea<'a>,
    options: BuildOptions,
    force: bool,
}

impl<'a> StagingAssembler<'a> {
    pub fn new(config: &'a Config, options: BuildOptions, force: bool) -> Self {
        Self {
            area: StagingArea::new(config, options.target),
            options,
            force,
        }
    }

    pub fn area(&self) -> StagingArea<'a> {
        self.area
    }

    /// Where cargo leaves the kernel built for `bootloader`.
    pub fn kernel_artifact(&self, bootloader: &dyn Bootloader) -> PathBuf {
        self.area
            .config()
            .target_dir
            .join(self.area.target().as_rust_target())
            .join(self.options.profile())
            .join(bootloader.project())
    }

    pub fn assemble(&self, bootloader: &dyn Bootloader) -> Result<()> {
        let root = self.area.root();

        if self.force && root.exists() {
            info!("Cleaning existing disk folder...");
            fs::remove_dir_all(root).map_err(|e| Error::staging_io("remove", root, e))?;
        }

        ensure_directory(root)?;
        self.copy_kernel(bootloader)?;
        self.resolve_dependencies(bootloader)?;

        info!("Copying {} files...", bootloader.name());
        bootloader.copy_files(&self.area)
    }

    fn resolve_dependencies(&self, bootloader: &dyn Bootloader) -> Result<()> {
        let dependencies = bootloader.dependencies();
        if dependencies.is_empty() {
            return Ok(());
        }

        let mut manager = DependencyManager::load(self.area.config())?;
        for dependency in dependencies {
            manager.resolve(dependency)?;
        }
        Ok(())
    }

    fn copy_kernel(&self, bootloader: &dyn Bootloader) -> Result<()> {
        let source = self.kernel_artifact(bootloader);
        if !source.is_file() {
            return Err(Error::staging(format!(
                "kernel binary not found at {} (did the build succeed?)",
                source.display()
            )));
        }

        self.area.ensure_directory(SYSTEM_DIR)?;

        info!("Copying kernel binary...");
        self.area
            .copy_if_newer(&format!("{}/{}", SYSTEM_DIR, KERNEL_FILE), &source)?;
        Ok(())
    }
}
