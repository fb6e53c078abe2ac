//! The in-tree Rust bootloader.
//!
//! It builds a kernel package of its own but is loaded directly by firmware,
//! so it cannot be packed into a bootable optical image.

use super::Bootloader;
use crate::error::{Error, Result};
use crate::iso::DiskImage;
use crate::registry::Registries;
use crate::staging::StagingArea;
use crate::target::Target;

pub const NAME: &str = "Rust";

pub fn register(registries: &mut Registries) -> Result<()> {
    registries.bootloaders.register(NAME, create)
}

fn create() -> Box<dyn Bootloader> {
    Box::new(RustBootloader)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RustBootloader;

fn no_disk_boot() -> Error {
    Error::configuration("the Rust bootloader does not support booting from disk")
}

impl Bootloader for RustBootloader {
    fn name(&self) -> &'static str {
        NAME
    }

    fn project(&self) -> &'static str {
        "microdragon-rust"
    }

    fn supports_target(&self, target: Target) -> bool {
        matches!(target, Target::X86_64)
    }

    fn supports_disk_boot(&self) -> bool {
        false
    }

    fn copy_files(&self, _staging: &StagingArea<'_>) -> Result<()> {
        Err(no_disk_boot())
    }

    fn make_bootable(&self, _image: &mut DiskImage) -> Result<()> {
        Err(no_disk_boot())
    }
}
