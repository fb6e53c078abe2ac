//! Name-based plugin registries for tasks and bootloaders.
//!
//! Plugins are registered by an explicit startup routine ([`Registries::builtin`])
//! that calls one `register` function per built-in plugin. Registration happens
//! strictly before any lookup; after that the registries are only read.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::bootloader::{self, Bootloader};
use crate::error::{Error, Result};
use crate::task::{self, Task};

/// Constructor for a fresh plugin instance.
pub type Factory<T> = fn() -> Box<T>;

/// Mapping from plugin name to factory.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: BTreeMap<String, Factory<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry. `kind` names the plugin kind in diagnostics.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Register `factory` under `name`.
    ///
    /// Names must be unique and usable on the command line.
    pub fn register(&mut self, name: &str, factory: Factory<T>) -> Result<()> {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::configuration(format!(
                "{} name '{}' is malformed",
                self.kind, name
            )));
        }

        if self.entries.contains_key(name) {
            return Err(Error::configuration(format!(
                "{} {} is already registered",
                self.kind, name
            )));
        }

        self.entries.insert(name.to_string(), factory);
        Ok(())
    }

    /// Instantiate the plugin registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<T>> {
        match self.entries.get(name) {
            Some(factory) => Ok(factory()),
            None => Err(Error::configuration(format!(
                "no {} registered with name {}",
                self.kind, name
            ))),
        }
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The task and bootloader registries of one process.
#[derive(Debug)]
pub struct Registries {
    pub tasks: Registry<dyn Task>,
    pub bootloaders: Registry<dyn Bootloader>,
}

impl Registries {
    /// Empty registries, for callers that register their own plugins.
    pub fn empty() -> Self {
        Self {
            tasks: Registry::new("task"),
            bootloaders: Registry::new("bootloader"),
        }
    }

    /// Registries populated with every built-in task and bootloader.
    pub fn builtin() -> Result<Self> {
        let mut registries = Self::empty();

        task::build::register(&mut registries)?;
        task::pack::register(&mut registries)?;

        bootloader::limine::register(&mut registries)?;
        bootloader::rust::register(&mut registries)?;

        Ok(registries)
    }

    /// Process-wide registries, built on first use and never reset.
    pub fn global() -> Result<&'static Registries> {
        static GLOBAL: OnceLock<Registries> = OnceLock::new();

        if let Some(registries) = GLOBAL.get() {
            return Ok(registries);
        }
        let registries = Self::builtin()?;
        Ok(GLOBAL.get_or_init(|| registries))
    }
}
