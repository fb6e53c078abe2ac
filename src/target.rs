//! CPU architectures the kernel can be built for.

use clap::ValueEnum;
use std::fmt::{self, Display, Formatter};

#[derive(ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// 64-bit Intel / AMD.
    #[default]
    #[value(name = "x86_64")]
    X86_64,

    /// 64-bit RISC-V.
    #[value(name = "riscv")]
    RiscV64,

    /// 64-bit Arm.
    #[value(name = "aarch64")]
    AArch64,
}

impl Target {
    /// The rustc target triple used for `cargo build --target`.
    pub fn as_rust_target(self) -> &'static str {
        match self {
            Target::X86_64 => "x86_64-unknown-none",
            Target::RiscV64 => "riscv64imac-unknown-none-elf",
            Target::AArch64 => "aarch64-unknown-none-softfloat",
        }
    }

    /// Name of the removable-media UEFI loader for this architecture.
    pub fn efi_boot_file(self) -> &'static str {
        match self {
            Target::X86_64 => "BOOTX64.EFI",
            Target::RiscV64 => "BOOTRISCV64.EFI",
            Target::AArch64 => "BOOTAA64.EFI",
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Target::X86_64 => f.write_str("x86_64"),
            Target::RiscV64 => f.write_str("riscv"),
            Target::AArch64 => f.write_str("aarch64"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_names_round_trip() {
        for target in Target::value_variants() {
            let parsed = Target::from_str(&target.to_string(), false).unwrap();
            assert_eq!(parsed, *target);
        }
    }

    #[test]
    fn test_rust_triples() {
        assert_eq!(Target::X86_64.as_rust_target(), "x86_64-unknown-none");
        assert_eq!(
            Target::AArch64.as_rust_target(),
            "aarch64-unknown-none-softfloat"
        );
        assert_eq!(
            Target::RiscV64.as_rust_target(),
            "riscv64imac-unknown-none-elf"
        );
    }
}
