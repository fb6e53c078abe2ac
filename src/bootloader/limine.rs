//! Limine bootloader.
//!
//! Stages the Limine CD boot images, its BIOS stage and configuration under
//! `limine/`, the UEFI removable-media loader for the selected architecture
//! under `EFI/BOOT/`, and registers a BIOS and a UEFI El Torito entry.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::Bootloader;
use crate::config::Config;
use crate::deps::{Dependency, GitDependency};
use crate::error::{Error, Result};
use crate::iso::{BootEntry, DiskImage};
use crate::process::Cmd;
use crate::registry::Registries;
use crate::staging::StagingArea;

pub const NAME: &str = "Limine";

/// Staging directory holding the Limine files.
pub const LIMINE_DIR: &str = "limine";
/// Staging directory holding the UEFI loaders.
pub const EFI_BOOT_DIR: &str = "EFI/BOOT";

pub const BIOS_CD_IMAGE: &str = "limine-bios-cd.bin";
pub const UEFI_CD_IMAGE: &str = "limine-uefi-cd.bin";
pub const BIOS_STAGE: &str = "limine-bios.sys";
pub const CONFIG_FILE: &str = "limine.cfg";

/// Host utility built from the Limine sources.
const HOST_TOOL: &str = if cfg!(windows) { "limine.exe" } else { "limine" };

/// Binary release branch of Limine, cloned into `deps/limine`.
pub static DEPENDENCY: GitDependency = GitDependency {
    id: "limine",
    repo_url: "https://github.com/limine-bootloader/limine",
    branch: Some("v5.x-branch-binary"),
    post_install: Some(build_host_tool),
};

/// Rebuild the `limine` utility inside a fresh or updated clone.
fn build_host_tool(config: &Config, dir: &Path) -> Result<()> {
    if cfg!(windows) {
        // The binary branch ships limine.exe prebuilt.
        return Ok(());
    }

    let tool = dir.join(HOST_TOOL);
    if tool.exists() {
        fs::remove_file(&tool).map_err(|e| Error::staging_io("remove", &tool, e))?;
    }

    info!("Building the limine host utility...");
    Cmd::new(&config.make)
        .dir(dir)
        .error_msg("building the limine host utility failed")
        .run()
        .map_err(|e| Error::staging(e.to_string()))?;
    Ok(())
}

pub fn register(registries: &mut Registries) -> Result<()> {
    registries.bootloaders.register(NAME, create)
}

fn create() -> Box<dyn Bootloader> {
    Box::new(Limine)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Limine;

impl Limine {
    fn dependency_dir(staging: &StagingArea<'_>) -> PathBuf {
        staging.deps_dir().join(DEPENDENCY.id())
    }

    fn host_tool(staging: &StagingArea<'_>) -> PathBuf {
        Self::dependency_dir(staging).join(HOST_TOOL)
    }

    fn boot_entry(image: &DiskImage, file: &str, entry: fn(String) -> BootEntry) -> Result<BootEntry> {
        let rr_path = format!("/{}/{}", LIMINE_DIR, file);
        let record = image.get_record(&rr_path)?;
        Ok(entry(record.iso_path().to_string()))
    }
}

impl Bootloader for Limine {
    fn name(&self) -> &'static str {
        NAME
    }

    fn project(&self) -> &'static str {
        "microdragon-limine"
    }

    fn dependencies(&self) -> Vec<&'static dyn Dependency> {
        let limine: &'static dyn Dependency = &DEPENDENCY;
        vec![limine]
    }

    fn copy_files(&self, staging: &StagingArea<'_>) -> Result<()> {
        let deps = Self::dependency_dir(staging);
        let config = staging
            .workspace()
            .join("bootloader")
            .join("limine")
            .join(CONFIG_FILE);

        staging.ensure_directory(LIMINE_DIR)?;
        let limine_file = |name: &str| format!("{}/{}", LIMINE_DIR, name);

        staging.copy_if_newer(&limine_file(UEFI_CD_IMAGE), &deps.join(UEFI_CD_IMAGE))?;
        staging.copy_if_newer(&limine_file(BIOS_CD_IMAGE), &deps.join(BIOS_CD_IMAGE))?;
        staging.copy_if_newer(&limine_file(BIOS_STAGE), &deps.join(BIOS_STAGE))?;
        staging.copy_if_newer(&limine_file(CONFIG_FILE), &config)?;

        staging.ensure_directory(EFI_BOOT_DIR)?;
        let efi = staging.target().efi_boot_file();
        staging.copy_if_newer(&format!("{}/{}", EFI_BOOT_DIR, efi), &deps.join(efi))?;

        Ok(())
    }

    fn make_bootable(&self, image: &mut DiskImage) -> Result<()> {
        info!("Creating El Torito boot entry for bios...");
        let bios = Self::boot_entry(image, BIOS_CD_IMAGE, BootEntry::bios)?;
        image.add_eltorito(bios)?;

        info!("Creating El Torito boot entry for UEFI...");
        let uefi = Self::boot_entry(image, UEFI_CD_IMAGE, BootEntry::uefi)?;
        image.add_eltorito(uefi)?;

        Ok(())
    }

    fn post_process(&self, staging: &StagingArea<'_>, image: &Path) -> Result<()> {
        let tool = Self::host_tool(staging);
        info!("Installing Limine BIOS stages into {}...", image.display());

        Cmd::new(tool.to_string_lossy())
            .arg("bios-install")
            .arg_path(image)
            .error_msg("limine bios-install failed")
            .run()
            .map_err(|e| Error::image(e.to_string()))?;

        Ok(())
    }
}
