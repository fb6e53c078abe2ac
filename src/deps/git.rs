//! Dependencies tracked as shallow git clones.

use std::path::Path;
use tracing::{debug, info};

use super::Dependency;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::Cmd;

/// Hook run inside the clone after it was installed or changed by an update.
pub type PostInstall = fn(&Config, &Path) -> Result<()>;

/// Printed by `git pull` when nothing was fetched.
const UP_TO_DATE: &str = "Already up to date.";

#[derive(Debug)]
pub struct GitDependency {
    pub id: &'static str,
    pub repo_url: &'static str,
    pub branch: Option<&'static str>,
    pub post_install: Option<PostInstall>,
}

impl GitDependency {
    fn run_post_install(&self, config: &Config, dir: &Path) -> Result<()> {
        match self.post_install {
            Some(hook) => hook(config, dir),
            None => Ok(()),
        }
    }
}

impl Dependency for GitDependency {
    fn id(&self) -> &'static str {
        self.id
    }

    fn install(&self, config: &Config, deps: &Path) -> Result<()> {
        info!("Cloning {} into {}...", self.repo_url, deps.join(self.id).display());

        let mut cmd = Cmd::new(&config.git).args(["clone", "--depth=1", "--single-branch"]);
        if let Some(branch) = self.branch {
            cmd = cmd.args(["--branch", branch]);
        }
        cmd.args([self.repo_url, self.id])
            .dir(deps)
            .error_msg(format!("cloning {} failed", self.id))
            .run()
            .map_err(|e| Error::staging(e.to_string()))?;

        self.run_post_install(config, &deps.join(self.id))
    }

    fn update(&self, config: &Config, dir: &Path) -> Result<()> {
        info!("Updating {}...", self.id);

        let result = Cmd::new(&config.git)
            .args(["pull", "--depth=1"])
            .dir(dir)
            .error_msg(format!("updating {} failed", self.id))
            .run()
            .map_err(|e| Error::staging(e.to_string()))?;

        if result.stdout_trimmed().contains(UP_TO_DATE) {
            debug!("{} is up to date", self.id);
            return Ok(());
        }
        self.run_post_install(config, dir)
    }
}
