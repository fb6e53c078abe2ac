//! Install/update bookkeeping for `deps/`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use super::Dependency;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::staging::ensure_directory;

/// Manifest file below the deps directory.
pub const MANIFEST_NAME: &str = "manifest.json";
/// Minimum time between two updates of the same dependency.
pub const UPDATE_DELAY: Duration = Duration::from_secs(60 * 60 * 24);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DependencyManifest {
    id: String,
    last_update: SystemTime,
}

/// Resolves dependencies into `deps/<id>`, installing or updating as needed.
pub struct DependencyManager<'a> {
    config: &'a Config,
    manifests: Vec<DependencyManifest>,
}

impl<'a> DependencyManager<'a> {
    /// Open the deps directory, creating it if missing, and read its manifest.
    pub fn load(config: &'a Config) -> Result<Self> {
        let deps = &config.deps_dir;
        match fs::metadata(deps) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(Error::staging(format!(
                    "deps directory {} is not a directory",
                    deps.display()
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => ensure_directory(deps)?,
            Err(e) => return Err(Error::staging_io("read metadata of", deps, e)),
        }

        let path = deps.join(MANIFEST_NAME);
        let manifests = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                Error::staging(format!(
                    "malformed dependency manifest {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(Error::staging_io("read", &path, e)),
        };

        Ok(Self { config, manifests })
    }

    fn manifest_path(&self) -> PathBuf {
        self.config.deps_dir.join(MANIFEST_NAME)
    }

    /// Make `dep` available and return its directory.
    ///
    /// A directory that already exists without a manifest entry is adopted
    /// as installed.
    pub fn resolve(&mut self, dep: &dyn Dependency) -> Result<PathBuf> {
        let deps = &self.config.deps_dir;
        let dir = deps.join(dep.id());

        match self.manifests.iter().position(|m| m.id == dep.id()) {
            Some(index) if !dir.is_dir() => {
                dep.install(self.config, deps)?;
                self.manifests[index].last_update = SystemTime::now();
                self.save()?;
            }
            Some(index) => {
                let age = self.manifests[index]
                    .last_update
                    .elapsed()
                    .unwrap_or_default();
                if age > UPDATE_DELAY {
                    dep.update(self.config, &dir)?;
                    self.manifests[index].last_update = SystemTime::now();
                    self.save()?;
                } else {
                    debug!("{} was updated recently", dep.id());
                }
            }
            None => {
                if dir.is_dir() {
                    info!("Using existing {}", dir.display());
                } else {
                    dep.install(self.config, deps)?;
                }
                self.manifests.push(DependencyManifest {
                    id: dep.id().to_string(),
                    last_update: SystemTime::now(),
                });
                self.save()?;
            }
        }

        Ok(dir)
    }

    fn save(&self) -> Result<()> {
        let path = self.manifest_path();
        let json = serde_json::to_string_pretty(&self.manifests)
            .map_err(|e| Error::staging(format!("failed to encode {}: {}", path.display(), e)))?;
        fs::write(&path, json).map_err(|e| Error::staging_io("write", &path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Counting {
        installs: Cell<u32>,
        updates: Cell<u32>,
        fail: bool,
    }

    impl Dependency for Counting {
        fn id(&self) -> &'static str {
            "counting"
        }

        fn install(&self, _config: &Config, deps: &Path) -> Result<()> {
            if self.fail {
                return Err(Error::staging("clone failed"));
            }
            self.installs.set(self.installs.get() + 1);
            fs::create_dir_all(deps.join(self.id())).unwrap();
            Ok(())
        }

        fn update(&self, _config: &Config, _dir: &Path) -> Result<()> {
            self.updates.set(self.updates.get() + 1);
            Ok(())
        }
    }

    fn config(tmp: &TempDir) -> Config {
        Config::from_lookup(tmp.path(), |_| None)
    }

    fn backdate(config: &Config, by: Duration) {
        let manifests = vec![DependencyManifest {
            id: "counting".to_string(),
            last_update: SystemTime::now() - by,
        }];
        fs::write(
            config.deps_dir.join(MANIFEST_NAME),
            serde_json::to_string(&manifests).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_first_resolve_installs_once() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let dep = Counting::default();

        let dir = DependencyManager::load(&config).unwrap().resolve(&dep).unwrap();
        assert_eq!(dir, config.deps_dir.join("counting"));
        assert!(config.deps_dir.join(MANIFEST_NAME).is_file());

        DependencyManager::load(&config).unwrap().resolve(&dep).unwrap();
        assert_eq!(dep.installs.get(), 1);
        assert_eq!(dep.updates.get(), 0);
    }

    #[test]
    fn test_stale_dependency_is_updated() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let dep = Counting::default();
        DependencyManager::load(&config).unwrap().resolve(&dep).unwrap();

        backdate(&config, UPDATE_DELAY + Duration::from_secs(60));
        DependencyManager::load(&config).unwrap().resolve(&dep).unwrap();
        assert_eq!(dep.updates.get(), 1);

        // The update refreshed the timestamp.
        DependencyManager::load(&config).unwrap().resolve(&dep).unwrap();
        assert_eq!(dep.updates.get(), 1);
        assert_eq!(dep.installs.get(), 1);
    }

    #[test]
    fn test_recent_dependency_is_not_updated() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let dep = Counting::default();
        DependencyManager::load(&config).unwrap().resolve(&dep).unwrap();

        backdate(&config, Duration::from_secs(60 * 60));
        DependencyManager::load(&config).unwrap().resolve(&dep).unwrap();
        assert_eq!(dep.updates.get(), 0);
    }

    #[test]
    fn test_existing_directory_is_adopted() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        fs::create_dir_all(config.deps_dir.join("counting")).unwrap();
        let dep = Counting::default();

        DependencyManager::load(&config).unwrap().resolve(&dep).unwrap();
        assert_eq!(dep.installs.get(), 0);
        assert!(config.deps_dir.join(MANIFEST_NAME).is_file());
    }

    #[test]
    fn test_deleted_directory_is_reinstalled() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let dep = Counting::default();
        DependencyManager::load(&config).unwrap().resolve(&dep).unwrap();

        fs::remove_dir_all(config.deps_dir.join("counting")).unwrap();
        DependencyManager::load(&config).unwrap().resolve(&dep).unwrap();
        assert_eq!(dep.installs.get(), 2);
    }

    #[test]
    fn test_failed_install_is_not_recorded() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let dep = Counting {
            fail: true,
            ..Counting::default()
        };

        let err = DependencyManager::load(&config).unwrap().resolve(&dep).unwrap_err();
        assert!(err.is_staging());
        assert!(!config.deps_dir.join(MANIFEST_NAME).exists());
    }

    #[test]
    fn test_deps_path_must_be_directory() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        fs::write(&config.deps_dir, "not a directory").unwrap();

        let err = DependencyManager::load(&config).err().unwrap();
        assert!(err.is_staging());
    }
}
