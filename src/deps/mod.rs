//! Third-party dependencies fetched into `deps/`.
//!
//! Each dependency lives in `deps/<id>`. It is installed on first use and
//! refreshed at most once per [`UPDATE_DELAY`]; `deps/manifest.json` records
//! when that last happened.

mod git;
mod manager;

pub use git::{GitDependency, PostInstall};
pub use manager::{DependencyManager, MANIFEST_NAME, UPDATE_DELAY};

use std::path::Path;

use crate::config::Config;
use crate::error::Result;

pub trait Dependency {
    /// Directory below `deps/`, also the manifest key.
    fn id(&self) -> &'static str;

    /// Fetch the dependency into `deps/<id>`.
    fn install(&self, config: &Config, deps: &Path) -> Result<()>;

    /// Refresh the installed copy in `dir`.
    fn update(&self, config: &Config, dir: &Path) -> Result<()>;
}
