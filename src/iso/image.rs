//! In-progress disk image.
//!
//! A [`DiskImage`] is built additively: directories and files (each with an
//! ISO9660 short path and a Rock Ridge alternate name), then El Torito boot
//! entries, then a single serialization through an [`ImageEncoder`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::encoder::ImageEncoder;
use crate::error::{Error, Result};

/// Boot-load size of every El Torito entry, in 512-byte virtual sectors.
pub const BOOT_LOAD_SIZE: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImageState {
    Empty,
    DirectoriesAdded,
    FilesAdded,
    BootEntriesRegistered,
    Serialized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RecordKind {
    Directory,
    File { source: PathBuf },
}

/// A directory or file in the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    iso_path: String,
    rr_path: String,
    rr_name: String,
    kind: RecordKind,
}

impl Record {
    /// Absolute ISO9660 path, e.g. `/LIMINE/LIMINE01.BIN`.
    pub fn iso_path(&self) -> &str {
        &self.iso_path
    }

    /// Absolute Rock Ridge path, e.g. `/limine/limine-bios-cd.bin`.
    pub fn rr_path(&self) -> &str {
        &self.rr_path
    }

    pub fn rr_name(&self) -> &str {
        &self.rr_name
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, RecordKind::Directory)
    }

    /// File on the host providing the contents, for file records.
    pub fn source(&self) -> Option<&Path> {
        match &self.kind {
            RecordKind::File { source } => Some(source),
            RecordKind::Directory => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Bios,
    Uefi,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Bios => f.write_str("BIOS"),
            Platform::Uefi => f.write_str("UEFI"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emulation {
    NoEmulation,
}

/// One El Torito boot catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootEntry {
    /// ISO9660 path of the boot image record.
    pub boot_file: String,
    pub platform: Platform,
    pub emulation: Emulation,
    pub load_size: u16,
    pub boot_info_table: bool,
}

impl BootEntry {
    /// No-emulation BIOS entry with a patched boot-info table.
    pub fn bios(boot_file: String) -> Self {
        Self {
            boot_file,
            platform: Platform::Bios,
            emulation: Emulation::NoEmulation,
            load_size: BOOT_LOAD_SIZE,
            boot_info_table: true,
        }
    }

    /// No-emulation UEFI entry.
    pub fn uefi(boot_file: String) -> Self {
        Self {
            boot_file,
            platform: Platform::Uefi,
            emulation: Emulation::NoEmulation,
            load_size: BOOT_LOAD_SIZE,
            boot_info_table: false,
        }
    }

    pub fn is_efi(&self) -> bool {
        self.platform == Platform::Uefi
    }
}

#[derive(Debug, Clone)]
pub struct DiskImage {
    state: ImageState,
    records: Vec<Record>,
    by_iso_path: HashMap<String, usize>,
    by_rr_path: HashMap<String, usize>,
    boot_entries: Vec<BootEntry>,
}

impl Default for DiskImage {
    fn default() -> Self {
        Self::new()
    }
}

fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

impl DiskImage {
    pub fn new() -> Self {
        Self {
            state: ImageState::Empty,
            records: Vec::new(),
            by_iso_path: HashMap::new(),
            by_rr_path: HashMap::new(),
            boot_entries: Vec::new(),
        }
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    pub fn boot_entries(&self) -> &[BootEntry] {
        &self.boot_entries
    }

    pub fn files(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| !r.is_directory())
    }

    pub fn directories(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.is_directory())
    }

    fn ensure_writable(&self, what: &str) -> Result<()> {
        if self.state >= ImageState::BootEntriesRegistered {
            return Err(Error::image(format!(
                "cannot add {} after boot entries were registered",
                what
            )));
        }
        Ok(())
    }

    /// Rock Ridge path for a child of the directory at `iso_path`.
    fn child_rr_path(&self, iso_path: &str, rr_name: &str) -> Result<String> {
        if !iso_path.starts_with('/') || iso_path.len() < 2 || iso_path.ends_with('/') {
            return Err(Error::image(format!("invalid image path '{}'", iso_path)));
        }
        if self.by_iso_path.contains_key(iso_path) {
            return Err(Error::image(format!("'{}' is already in the image", iso_path)));
        }

        let parent = parent_path(iso_path);
        let parent_rr = if parent == "/" {
            ""
        } else {
            match self.by_iso_path.get(parent).map(|&i| &self.records[i]) {
                Some(record) if record.is_directory() => record.rr_path(),
                _ => {
                    return Err(Error::image(format!(
                        "parent directory '{}' of '{}' is not in the image",
                        parent, iso_path
                    )))
                }
            }
        };

        let rr_path = format!("{}/{}", parent_rr, rr_name);
        if self.by_rr_path.contains_key(&rr_path) {
            return Err(Error::image(format!("'{}' is already in the image", rr_path)));
        }
        Ok(rr_path)
    }

    fn push(&mut self, record: Record) {
        let index = self.records.len();
        self.by_iso_path.insert(record.iso_path.clone(), index);
        self.by_rr_path.insert(record.rr_path.clone(), index);
        self.records.push(record);
    }

    /// Add a directory at `iso_path` with the alternate name `rr_name`.
    pub fn add_directory(&mut self, iso_path: &str, rr_name: &str) -> Result<()> {
        self.ensure_writable("directories")?;
        let rr_path = self.child_rr_path(iso_path, rr_name)?;

        self.push(Record {
            iso_path: iso_path.to_string(),
            rr_path,
            rr_name: rr_name.to_string(),
            kind: RecordKind::Directory,
        });
        if self.state == ImageState::Empty {
            self.state = ImageState::DirectoriesAdded;
        }
        Ok(())
    }

    /// Add the host file `source` at `iso_path` with the alternate name `rr_name`.
    pub fn add_file(&mut self, source: &Path, iso_path: &str, rr_name: &str) -> Result<()> {
        self.ensure_writable("files")?;
        if !source.is_file() {
            return Err(Error::image(format!(
                "cannot add {}: not a regular file",
                source.display()
            )));
        }
        let rr_path = self.child_rr_path(iso_path, rr_name)?;

        self.push(Record {
            iso_path: iso_path.to_string(),
            rr_path,
            rr_name: rr_name.to_string(),
            kind: RecordKind::File {
                source: source.to_path_buf(),
            },
        });
        self.state = ImageState::FilesAdded;
        Ok(())
    }

    /// Look up a record by its Rock Ridge path.
    pub fn get_record(&self, rr_path: &str) -> Result<&Record> {
        self.by_rr_path
            .get(rr_path)
            .map(|&i| &self.records[i])
            .ok_or_else(|| Error::image(format!("no record for '{}' in the image", rr_path)))
    }

    /// Look up a record by its ISO9660 path.
    pub fn record_at(&self, iso_path: &str) -> Option<&Record> {
        self.by_iso_path.get(iso_path).map(|&i| &self.records[i])
    }

    /// Register an El Torito entry for a file already in the image.
    pub fn add_eltorito(&mut self, entry: BootEntry) -> Result<()> {
        if self.state == ImageState::Serialized {
            return Err(Error::image("image is already serialized"));
        }
        match self.record_at(&entry.boot_file) {
            Some(record) if !record.is_directory() => {}
            _ => {
                return Err(Error::image(format!(
                    "boot file '{}' is not a file in the image",
                    entry.boot_file
                )))
            }
        }

        self.boot_entries.push(entry);
        self.state = ImageState::BootEntriesRegistered;
        Ok(())
    }

    /// Write the image to `output`. Nothing can be added afterwards.
    pub fn serialize(&mut self, encoder: &dyn ImageEncoder, output: &Path) -> Result<()> {
        if self.state == ImageState::Serialized {
            return Err(Error::image("image is already serialized"));
        }
        encoder.encode(self, output)?;
        self.state = ImageState::Serialized;
        Ok(())
    }
}
