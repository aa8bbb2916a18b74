//! Initialization flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bitmask of engine initialization options.
///
/// Values match the engine's `aug_flags` so they can be passed through
/// unchanged. Bits this crate does not name are kept as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags(u32);

impl Flags {
    /// No options.
    pub const NONE: Flags = Flags(0);
    /// Keep the original file with a `.augsave` extension.
    pub const SAVE_BACKUP: Flags = Flags(1 << 0);
    /// Save changes into a file with extension `.augnew`.
    pub const SAVE_NEWFILE: Flags = Flags(1 << 1);
    /// Typecheck lenses.
    pub const TYPE_CHECK: Flags = Flags(1 << 2);
    /// Do not use the builtin load path for modules.
    pub const NO_STDINC: Flags = Flags(1 << 3);
    /// Make save a no-op; only record what would have changed.
    pub const SAVE_NOOP: Flags = Flags(1 << 4);
    /// Do not load the tree during init.
    pub const NO_LOAD: Flags = Flags(1 << 5);
    /// Do not autoload modules from the search path.
    pub const NO_MODL_AUTOLOAD: Flags = Flags(1 << 6);
    /// Track the span in the input of nodes.
    pub const ENABLE_SPAN: Flags = Flags(1 << 7);
    /// Do not close the handle automatically when init fails.
    pub const NO_ERR_CLOSE: Flags = Flags(1 << 8);

    /// Every named flag with its host-visible constant name.
    pub const NAMED: [(&'static str, Flags); 10] = [
        ("AUG_NONE", Flags::NONE),
        ("AUG_SAVE_BACKUP", Flags::SAVE_BACKUP),
        ("AUG_SAVE_NEWFILE", Flags::SAVE_NEWFILE),
        ("AUG_TYPE_CHECK", Flags::TYPE_CHECK),
        ("AUG_NO_STDINC", Flags::NO_STDINC),
        ("AUG_SAVE_NOOP", Flags::SAVE_NOOP),
        ("AUG_NO_LOAD", Flags::NO_LOAD),
        ("AUG_NO_MODL_AUTOLOAD", Flags::NO_MODL_AUTOLOAD),
        ("AUG_ENABLE_SPAN", Flags::ENABLE_SPAN),
        ("AUG_NO_ERR_CLOSE", Flags::NO_ERR_CLOSE),
    ];

    /// Creates flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Flags(bits)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets every bit of `other`.
    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0;
    }

    /// Returns true if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Looks a flag up by name.
    ///
    /// Accepts the constant spelling (`AUG_SAVE_BACKUP`) and the kebab
    /// spelling used on the command line (`save-backup`).
    pub fn from_name(name: &str) -> Option<Flags> {
        let normalized = name.trim().to_ascii_uppercase().replace('-', "_");
        let normalized = normalized
            .strip_prefix("AUG_")
            .unwrap_or(&normalized)
            .to_string();
        Self::NAMED
            .iter()
            .find(|(constant, _)| constant[4..] == normalized)
            .map(|(_, flags)| *flags)
    }

    /// Returns the names of the set flags, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(_, flag)| !flag.is_empty() && self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl From<u32> for Flags {
    fn from(bits: u32) -> Self {
        Flags(bits)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            f.write_str("AUG_NONE")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn values_match_engine() {
        assert_eq!(Flags::SAVE_BACKUP.bits(), 1);
        assert_eq!(Flags::SAVE_NOOP.bits(), 16);
        assert_eq!(Flags::NO_MODL_AUTOLOAD.bits(), 64);
        assert_eq!(Flags::NO_ERR_CLOSE.bits(), 256);
    }

    #[test]
    fn combine_and_contains() {
        let mut flags = Flags::NO_LOAD | Flags::SAVE_NEWFILE;
        assert!(flags.contains(Flags::NO_LOAD));
        assert!(!flags.contains(Flags::SAVE_BACKUP));
        flags |= Flags::SAVE_BACKUP;
        flags.insert(Flags::ENABLE_SPAN);
        assert!(flags.contains(Flags::SAVE_BACKUP | Flags::ENABLE_SPAN));
        assert!(flags.contains(Flags::NONE));
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(Flags::from_name("save-backup"), Some(Flags::SAVE_BACKUP));
        assert_eq!(Flags::from_name("AUG_NO_MODL_AUTOLOAD"), Some(Flags::NO_MODL_AUTOLOAD));
        assert_eq!(Flags::from_name("no_load"), Some(Flags::NO_LOAD));
        assert_eq!(Flags::from_name("none"), Some(Flags::NONE));
        assert_eq!(Flags::from_name("bogus"), None);
    }

    #[test]
    fn unknown_bits_pass_through() {
        let flags = Flags::from_bits(1 << 9 | 1);
        assert_eq!(flags.bits(), 513);
        assert_eq!(flags.names(), vec!["AUG_SAVE_BACKUP"]);
    }

    #[test]
    fn display() {
        assert_eq!(Flags::NONE.to_string(), "AUG_NONE");
        assert_eq!(
            (Flags::NO_LOAD | Flags::SAVE_BACKUP).to_string(),
            "AUG_SAVE_BACKUP|AUG_NO_LOAD"
        );
    }

    proptest! {
        #[test]
        fn union_contains_both_sides(a in any::<u32>(), b in any::<u32>()) {
            let union = Flags::from_bits(a) | Flags::from_bits(b);
            prop_assert!(union.contains(Flags::from_bits(a)));
            prop_assert!(union.contains(Flags::from_bits(b)));
            prop_assert_eq!(union.bits(), a | b);
        }
    }
}
