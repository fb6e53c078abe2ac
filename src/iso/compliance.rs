//! ISO9660 short-name generation.
//!
//! Primary names in the image must use the level-1 charset (`A-Z`, `0-9`,
//! `_`) with at most 8 base characters. Names that already fit are only
//! uppercased. Others are cut to a 6-character prefix plus a two-digit
//! sequence number that is unique per prefix within one packaging run; the
//! original name survives as the Rock Ridge alternate name.

use std::collections::{HashMap, HashSet};

/// Longest base name that passes through unchanged.
pub const MAX_BASE_LEN: usize = 8;
/// Prefix kept from a non-compliant base name.
pub const PREFIX_LEN: usize = 6;
/// Longest extension that is kept, including the dot.
pub const MAX_EXT_LEN: usize = 4;

fn is_valid_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'
}

/// Split like `os.path.splitext`: the extension starts at the last dot,
/// unless that dot only belongs to leading dots of a hidden file.
fn split_extension(file: &str) -> (&str, &str) {
    match file.rfind('.') {
        Some(idx) if file[..idx].chars().any(|c| c != '.') => file.split_at(idx),
        _ => (file, ""),
    }
}

/// Run-scoped collision counters, keyed by truncated prefix.
///
/// Generated names also skip any name already handed out, so a literal
/// `LONGFI01.BIN` does not collide with the one made for `longfilename.bin`.
#[derive(Debug, Default, Clone)]
pub struct ComplianceMap {
    numbering: HashMap<String, u32>,
    issued: HashSet<String>,
}

impl ComplianceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequence number for `prefix`, starting at 1.
    fn next_number(&mut self, prefix: &str) -> u32 {
        let next = self.numbering.entry(prefix.to_string()).or_insert(1);
        let number = *next;
        *next += 1;
        number
    }

    /// Map `file` onto a unique ISO9660 short name.
    pub fn make_compliant(&mut self, file: &str) -> String {
        let (base, ext) = split_extension(file);
        let base = base.to_uppercase();
        let mut ext = ext.to_uppercase();

        let sanitized: String = base
            .chars()
            .map(|c| if is_valid_char(c) { c } else { '_' })
            .collect();

        if ext.chars().count() > MAX_EXT_LEN || !ext.chars().skip(1).all(is_valid_char) {
            ext = ".".to_string();
        }

        let name = if sanitized.chars().count() > MAX_BASE_LEN || sanitized != base {
            let prefix: String = sanitized.chars().take(PREFIX_LEN).collect();
            loop {
                let candidate = format!("{}{:02}{}", prefix, self.next_number(&prefix), ext);
                if !self.issued.contains(&candidate) {
                    break candidate;
                }
            }
        } else {
            sanitized + &ext
        };

        self.issued.insert(name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compliant_names_are_uppercased() {
        let mut names = ComplianceMap::new();
        assert_eq!(names.make_compliant("kernel.elf"), "KERNEL.ELF");
        assert_eq!(names.make_compliant("BOOTX64.EFI"), "BOOTX64.EFI");
        assert_eq!(names.make_compliant("limine.cfg"), "LIMINE.CFG");
        assert_eq!(names.make_compliant("A_1.B"), "A_1.B");
    }

    #[test]
    fn test_name_without_extension() {
        let mut names = ComplianceMap::new();
        assert_eq!(names.make_compliant("kernel"), "KERNEL");
    }

    #[test]
    fn test_long_name_gets_sequence() {
        let mut names = ComplianceMap::new();
        assert_eq!(names.make_compliant("longfilename.bin"), "LONGFI01.BIN");
        assert_eq!(names.make_compliant("longfile_other.bin"), "LONGFI02.BIN");
        assert_eq!(names.make_compliant("longfi-x.txt"), "LONGFI03.TXT");
    }

    #[test]
    fn test_replaced_characters_force_sequence() {
        let mut names = ComplianceMap::new();
        // Short enough, but '-' is not allowed.
        assert_eq!(names.make_compliant("a-b.bin"), "A_B01.BIN");
        assert_eq!(names.make_compliant("limine-bios-cd.bin"), "LIMINE01.BIN");
        assert_eq!(names.make_compliant("limine-uefi-cd.bin"), "LIMINE02.BIN");
        assert_eq!(names.make_compliant("limine-bios.sys"), "LIMINE03.SYS");
    }

    #[test]
    fn test_bad_extension_is_dropped() {
        let mut names = ComplianceMap::new();
        assert_eq!(names.make_compliant("limine.config"), "LIMINE.");
        assert_eq!(names.make_compliant("data.t-z"), "DATA.");
        assert_eq!(names.make_compliant("archive.tar.gz"), "ARCHIV01.GZ");
    }

    #[test]
    fn test_hidden_file_has_no_extension() {
        let mut names = ComplianceMap::new();
        assert_eq!(names.make_compliant(".config"), "_CONFI01");
    }

    #[test]
    fn test_fresh_map_restarts_numbering() {
        let mut first = ComplianceMap::new();
        assert_eq!(first.make_compliant("longfilename.bin"), "LONGFI01.BIN");

        let mut second = ComplianceMap::new();
        assert_eq!(second.make_compliant("longfilename.bin"), "LONGFI01.BIN");
    }

    #[test]
    fn test_generated_name_skips_literal_name() {
        let mut names = ComplianceMap::new();
        assert_eq!(names.make_compliant("LONGFI01.BIN"), "LONGFI01.BIN");
        assert_eq!(names.make_compliant("longfilename.bin"), "LONGFI02.BIN");
        // A different extension does not collide.
        assert_eq!(names.make_compliant("longfilename.txt"), "LONGFI03.TXT");
    }

    #[test]
    fn test_prefixes_are_counted_independently() {
        let mut names = ComplianceMap::new();
        assert_eq!(names.make_compliant("alphabet_soup"), "ALPHAB01");
        assert_eq!(names.make_compliant("bravo-charlie"), "BRAVO_01");
        assert_eq!(names.make_compliant("alphabetical"), "ALPHAB02");
    }
}
