//! Image assembly - turns the staging tree into a bootable hybrid ISO.
//!
//! Walks the staging tree depth-first, adds every directory under its
//! uppercased path and every file under a compliant short name (original
//! names are kept as Rock Ridge names), lets the bootloader register its boot
//! entries and serializes the result.

pub mod compliance;
pub mod encoder;
pub mod image;

use std::path::{Component, Path};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::bootloader::Bootloader;
use crate::error::{Error, Result};

pub use compliance::ComplianceMap;
pub use encoder::{ImageEncoder, Xorriso};
pub use image::{BootEntry, DiskImage, Emulation, ImageState, Platform, Record};

/// Assembles one image from one staging tree.
///
/// Owns the run-scoped [`ComplianceMap`]; create a new assembler per run.
pub struct ImageAssembler<'a> {
    staging_root: &'a Path,
    names: ComplianceMap,
}

/// Uppercased ISO path for a path relative to the staging root.
fn iso_directory(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(format!("/{}", name.to_string_lossy().to_uppercase())),
            _ => None,
        })
        .collect()
}

impl<'a> ImageAssembler<'a> {
    pub fn new(staging_root: &'a Path) -> Self {
        Self {
            staging_root,
            names: ComplianceMap::new(),
        }
    }

    /// Add every directory and file of the staging tree to `image`.
    pub fn add_tree(&mut self, image: &mut DiskImage) -> Result<()> {
        let walker = WalkDir::new(self.staging_root)
            .min_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                Error::image(format!(
                    "failed to walk {}: {}",
                    self.staging_root.display(),
                    e
                ))
            })?;

            let relative = entry
                .path()
                .strip_prefix(self.staging_root)
                .map_err(|_| Error::image(format!("{} escapes the staging tree", entry.path().display())))?;
            let rr_name = entry.file_name().to_string_lossy().into_owned();
            let parent = iso_directory(relative.parent().unwrap_or(Path::new("")));

            if entry.file_type().is_dir() {
                let iso_path = format!("{}/{}", parent, rr_name.to_uppercase());
                debug!("Creating iso directory {} rr: {}", iso_path, rr_name);
                image.add_directory(&iso_path, &rr_name)?;
            } else {
                let iso_file = self.names.make_compliant(&rr_name);
                let iso_path = format!("{}/{}", parent, iso_file);
                debug!("Creating iso file {} rr: {}", iso_path, rr_name);
                image.add_file(entry.path(), &iso_path, &rr_name)?;
            }
        }

        Ok(())
    }

    /// Build the complete image model: tree first, then boot entries.
    pub fn assemble(&mut self, bootloader: &dyn Bootloader) -> Result<DiskImage> {
        let mut image = DiskImage::new();
        self.add_tree(&mut image)?;
        info!(
            "Added {} directories and {} files to the image",
            image.directories().count(),
            image.files().count()
        );

        bootloader.make_bootable(&mut image)?;
        Ok(image)
    }

    /// Assemble the image and write it to `output`.
    pub fn package(
        mut self,
        bootloader: &dyn Bootloader,
        encoder: &dyn ImageEncoder,
        output: &Path,
    ) -> Result<DiskImage> {
        let mut image = self.assemble(bootloader)?;
        image.serialize(encoder, output)?;
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_directory_uppercases_components() {
        assert_eq!(iso_directory(Path::new("")), "");
        assert_eq!(iso_directory(Path::new("limine")), "/LIMINE");
        assert_eq!(iso_directory(Path::new("EFI/boot")), "/EFI/BOOT");
    }
}
