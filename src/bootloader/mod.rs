//! Bootloader plugins.
//!
//! A bootloader contributes two things to a packaging run: the files it needs
//! in the staging tree, and the El Torito boot entries pointing at them.

pub mod limine;
pub mod rust;

use std::path::Path;

use crate::deps::Dependency;
use crate::error::Result;
use crate::iso::DiskImage;
use crate::staging::StagingArea;
use crate::target::Target;

pub use limine::Limine;
pub use rust::RustBootloader;

pub trait Bootloader {
    /// Registry name, as accepted by `--bootloader`.
    fn name(&self) -> &'static str;

    /// Cargo package producing the kernel for this bootloader.
    fn project(&self) -> &'static str;

    fn supports_target(&self, _target: Target) -> bool {
        true
    }

    /// Whether the bootloader can start the kernel from an optical image.
    fn supports_disk_boot(&self) -> bool {
        true
    }

    /// Dependencies resolved into `deps/` before [`Bootloader::copy_files`].
    fn dependencies(&self) -> Vec<&'static dyn Dependency> {
        Vec::new()
    }

    /// Stage everything this bootloader needs, copy-if-newer.
    fn copy_files(&self, staging: &StagingArea<'_>) -> Result<()>;

    /// Register boot catalog entries for files already added to `image`.
    fn make_bootable(&self, image: &mut DiskImage) -> Result<()>;

    /// Adjust the serialized image in place.
    fn post_process(&self, _staging: &StagingArea<'_>, _image: &Path) -> Result<()> {
        Ok(())
    }
}
