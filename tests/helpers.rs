//! Shared test utilities for xtask tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use microdragon_xtask::bootloader::Bootloader;
use microdragon_xtask::config::Config;
use microdragon_xtask::iso::{BootEntry, DiskImage, ImageEncoder};
use microdragon_xtask::staging::StagingArea;
use microdragon_xtask::target::Target;
use microdragon_xtask::Result;
use tempfile::TempDir;

/// Test workspace in a temporary directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub workspace: PathBuf,
    pub config: Config,
}

impl TestEnv {
    /// Workspace whose "cargo" always succeeds and never touches rustup.
    pub fn new() -> Self {
        Self::with_cargo("true")
    }

    pub fn with_cargo(cargo: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let workspace = temp_dir.path().to_path_buf();

        let cargo = cargo.to_string();
        let config = Config::from_lookup(&workspace, |key| match key {
            "CARGO" => Some(cargo.clone()),
            "MICRODRAGON_INSTALL_TARGETS" => Some("false".to_string()),
            _ => None,
        });

        Self {
            _temp_dir: temp_dir,
            workspace,
            config,
        }
    }

    pub fn disk(&self) -> &Path {
        &self.config.disk_dir
    }

    pub fn staging(&self, target: Target) -> StagingArea<'_> {
        StagingArea::new(&self.config, target)
    }

    /// Place a fake kernel where cargo would leave it.
    pub fn create_kernel(&self, target: Target, profile: &str, project: &str) -> PathBuf {
        let path = self
            .config
            .target_dir
            .join(target.as_rust_target())
            .join(profile)
            .join(project);
        write_file(&path, "\x7fELF kernel");
        path
    }

    /// Point `git` and `make` at shell stand-ins in `bin/`.
    ///
    /// `git clone` creates a Limine checkout, `git pull` prints
    /// `bin/pull-output`, and `make` writes an executable `limine` tool that
    /// records its arguments in `invoked`. Both log their calls to
    /// `bin/git.log` and `bin/make.log`.
    pub fn use_fake_dependency_tools(&mut self) -> PathBuf {
        let bin = self.workspace.join("bin");
        let git = bin.join("git");
        let make = bin.join("make");

        write_script(&git, FAKE_GIT);
        write_script(&make, FAKE_MAKE);
        self.config.git = git.to_string_lossy().into_owned();
        self.config.make = make.to_string_lossy().into_owned();
        bin
    }

    pub fn write_limine_config(&self) {
        write_file(
            &self.workspace.join("bootloader/limine/limine.cfg"),
            "TIMEOUT=0\n",
        );
    }

    /// Fake Limine distribution under `deps/limine` and its config file.
    pub fn create_limine_deps(&self) {
        let deps = self.config.deps_dir.join("limine");
        for name in [
            "limine-bios-cd.bin",
            "limine-uefi-cd.bin",
            "limine-bios.sys",
            "BOOTX64.EFI",
            "BOOTAA64.EFI",
            "BOOTRISCV64.EFI",
        ] {
            write_file(&deps.join(name), name);
        }
        self.write_limine_config();
    }
}

const FAKE_GIT: &str = r#"#!/bin/sh
bin="$(dirname "$0")"
echo "$@" >> "$bin/git.log"
case "$1" in
  clone)
    for last; do :; done
    mkdir -p "$last"
    for f in limine-bios-cd.bin limine-uefi-cd.bin limine-bios.sys BOOTX64.EFI; do
      echo "$f" > "$last/$f"
    done
    ;;
  pull)
    cat "$bin/pull-output" 2>/dev/null || true
    ;;
esac
"#;

const FAKE_MAKE: &str = r#"#!/bin/sh
echo make >> "$(dirname "$0")/make.log"
cat > limine <<'TOOL'
#!/bin/sh
echo "$@" > "$(dirname "$0")/invoked"
TOOL
chmod +x limine
"#;

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
}

pub fn write_script(path: &Path, content: &str) {
    write_file(path, content);
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod");
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::open(path)
        .and_then(|f| f.set_modified(time))
        .expect("Failed to set mtime");
}

pub fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

pub fn hours_ago(hours: u64) -> SystemTime {
    SystemTime::now() - Duration::from_secs(hours * 3600)
}

pub fn assert_file_exists(path: &Path) {
    assert!(path.is_file(), "expected file: {}", path.display());
}

pub fn assert_file_contains(path: &Path, expected: &str) {
    let content = fs::read_to_string(path).expect("Failed to read file");
    assert!(
        content.contains(expected),
        "{} does not contain {:?}",
        path.display(),
        expected
    );
}

/// Bootloader that stages two files and registers a BIOS and a UEFI entry.
pub struct TwoFileLoader;

impl TwoFileLoader {
    pub const PROJECT: &'static str = "microdragon-test";

    pub fn sources(workspace: &Path) -> (PathBuf, PathBuf) {
        (
            workspace.join("loader/stage-a.bin"),
            workspace.join("loader/b.efi"),
        )
    }
}

impl Bootloader for TwoFileLoader {
    fn name(&self) -> &'static str {
        "Test"
    }

    fn project(&self) -> &'static str {
        Self::PROJECT
    }

    fn copy_files(&self, staging: &StagingArea<'_>) -> Result<()> {
        let (a, b) = Self::sources(staging.workspace());
        staging.ensure_directory("boot")?;
        staging.copy_if_newer("boot/stage-a.bin", &a)?;
        staging.copy_if_newer("b.efi", &b)?;
        Ok(())
    }

    fn make_bootable(&self, image: &mut DiskImage) -> Result<()> {
        let a = image.get_record("/boot/stage-a.bin")?.iso_path().to_string();
        image.add_eltorito(BootEntry::bios(a))?;
        let b = image.get_record("/b.efi")?.iso_path().to_string();
        image.add_eltorito(BootEntry::uefi(b))?;
        Ok(())
    }
}

/// Encoder that keeps a copy of the image instead of running xorriso.
#[derive(Clone, Default)]
pub struct RecordingEncoder {
    pub written: Rc<RefCell<Option<DiskImage>>>,
}

impl ImageEncoder for RecordingEncoder {
    fn encode(&self, image: &DiskImage, output: &Path) -> Result<()> {
        fs::write(output, b"CD001").expect("Failed to write image");
        *self.written.borrow_mut() = Some(image.clone());
        Ok(())
    }
}
