//! Serialization of a [`DiskImage`] into an ISO9660 file.
//!
//! The sector-level encoding (ISO9660, Rock Ridge, El Torito) is delegated to
//! an external encoder; this module only translates the image layout into its
//! invocation.

use std::fs;
use std::path::Path;
use tracing::info;

use super::image::{DiskImage, Emulation, Platform};
use crate::error::{Error, Result};
use crate::process::{self, Cmd};

/// Volume identifier written into the primary volume descriptor.
pub const VOLUME_ID: &str = "MICRODRAGON";

pub trait ImageEncoder {
    /// Verify the encoder can run, before any expensive work happens.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    /// Write `image` to `output`, replacing any existing file.
    fn encode(&self, image: &DiskImage, output: &Path) -> Result<()>;
}

/// Escape a graft-point component (`=` and `\` are special to mkisofs).
fn escape_graft(path: &str) -> String {
    path.replace('\\', "\\\\").replace('=', "\\=")
}

/// Encoder driving `xorriso -as mkisofs`.
///
/// Files are grafted by their Rock Ridge path and xorriso derives the
/// ISO9660 identifiers itself, so the short names planned in the
/// [`DiskImage`] do not reach the written image. Boot files are passed by
/// Rock Ridge path for the same reason.
#[derive(Debug, Clone)]
pub struct Xorriso {
    program: String,
}

impl Xorriso {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// mkisofs-style arguments producing `image` at `output`.
    pub fn arguments(&self, image: &DiskImage, output: &Path) -> Result<Vec<String>> {
        let mut args: Vec<String> = ["-as", "mkisofs", "-R", "-graft-points", "-V"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(VOLUME_ID.to_string());
        args.push("-o".to_string());
        args.push(output.to_string_lossy().into_owned());

        let mut has_efi = false;
        for (index, entry) in image.boot_entries().iter().enumerate() {
            let record = image.record_at(&entry.boot_file).ok_or_else(|| {
                Error::image(format!("boot file '{}' is not in the image", entry.boot_file))
            })?;
            let boot_path = record.rr_path().trim_start_matches('/').to_string();

            if index > 0 {
                args.push("-eltorito-alt-boot".to_string());
            }
            match entry.platform {
                Platform::Bios => args.push("-b".to_string()),
                Platform::Uefi => {
                    has_efi = true;
                    args.push("-e".to_string());
                }
            }
            args.push(boot_path);
            match entry.emulation {
                Emulation::NoEmulation => args.push("-no-emul-boot".to_string()),
            }
            args.push("-boot-load-size".to_string());
            args.push(entry.load_size.to_string());
            if entry.boot_info_table {
                args.push("-boot-info-table".to_string());
            }
        }

        if has_efi {
            args.push("-efi-boot-part".to_string());
            args.push("--efi-boot-image".to_string());
            args.push("--protective-msdos-label".to_string());
        }

        for record in image.files() {
            if let Some(source) = record.source() {
                args.push(format!(
                    "{}={}",
                    escape_graft(record.rr_path()),
                    escape_graft(&source.to_string_lossy())
                ));
            }
        }

        Ok(args)
    }
}

impl ImageEncoder for Xorriso {
    fn check(&self) -> Result<()> {
        if process::exists(&self.program) {
            Ok(())
        } else {
            Err(Error::image(format!(
                "'{}' not found. Install xorriso to create images.",
                self.program
            )))
        }
    }

    fn encode(&self, image: &DiskImage, output: &Path) -> Result<()> {
        let args = self.arguments(image, output)?;

        if output.exists() {
            fs::remove_file(output).map_err(|e| Error::image_io("remove old image", output, e))?;
        }

        info!("Writing image to {}...", output.display());
        Cmd::new(&self.program)
            .args(args)
            .error_msg("xorriso failed")
            .run()
            .map_err(|e| Error::image(e.to_string()))?;

        Ok(())
    }
}
