//! Error taxonomy for the build/pack pipeline.
//!
//! Every stage fails fast: the first error aborts the remaining stages and
//! bubbles up to the dispatcher in `main`, which prints it and exits nonzero.

use std::io;
use std::path::Path;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Duplicate or missing registry name, malformed plugin, unsupported option combination.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The external build process could not be started or reported failure.
    #[error("Build failed: {0}")]
    BuildFailure(String),

    /// Missing source artifact or filesystem failure while preparing the staging tree.
    #[error("Staging error: {message}")]
    Staging {
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    /// A staged record could not be located, or the image could not be written.
    #[error("Image error: {message}")]
    Image {
        message: String,
        #[source]
        source: Option<io::Error>,
    },
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn build(message: impl Into<String>) -> Self {
        Error::BuildFailure(message.into())
    }

    pub fn staging(message: impl Into<String>) -> Self {
        Error::Staging {
            message: message.into(),
            source: None,
        }
    }

    pub fn image(message: impl Into<String>) -> Self {
        Error::Image {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an I/O failure hit while staging `path`.
    pub fn staging_io(action: &str, path: &Path, source: io::Error) -> Self {
        Error::Staging {
            message: format!("failed to {} {}", action, path.display()),
            source: Some(source),
        }
    }

    /// Wrap an I/O failure hit while assembling or writing the image.
    pub fn image_io(action: &str, path: &Path, source: io::Error) -> Self {
        Error::Image {
            message: format!("failed to {} {}", action, path.display()),
            source: Some(source),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_build_failure(&self) -> bool {
        matches!(self, Error::BuildFailure(_))
    }

    pub fn is_staging(&self) -> bool {
        matches!(self, Error::Staging { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Error::Image { .. })
    }
}

/// Missing source files are reported with the path that was expected.
pub(crate) fn missing_source(path: &Path) -> Error {
    Error::staging(format!("source file not found: {}", path.display()))
}
