//! Build tooling for the microdragon kernel.
//!
//! Tasks (`build`, `pack`) and bootloaders (`Limine`, `Rust`) are plugins
//! resolved by name through [`registry::Registries`]. `pack` compiles the
//! kernel, fetches bootloader dependencies into `deps/`, refreshes the
//! `disk/` staging tree and turns it into a hybrid BIOS/UEFI ISO image.

pub mod bootloader;
pub mod cli;
pub mod config;
pub mod deps;
pub mod error;
pub mod iso;
pub mod process;
pub mod registry;
pub mod staging;
pub mod target;
pub mod task;
pub mod timing;

pub use error::{Error, Result};
