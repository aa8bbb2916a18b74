//! Session configuration.

use crate::flags::Flags;
use crate::script::Script;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Suffix that qualifies a lens name.
pub const LENS_SUFFIX: &str = ".lns";

/// Options for creating a session.
///
/// Deserializes from an options record with the keys `root`, `loadpath`,
/// `flags`, `lens`, `incl`, `excl` and `srun`. `incl`, `excl` and `srun`
/// accept either a single string or a list of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InitOptions {
    /// Filesystem root the engine operates under.
    pub root: Option<PathBuf>,

    /// Colon-separated list of extra lens directories.
    pub loadpath: Option<String>,

    /// Initialization flags.
    pub flags: Flags,

    /// Lens to load instead of autoloading every module.
    pub lens: Option<String>,

    /// Files the lens is applied to.
    #[serde(deserialize_with = "one_or_many")]
    pub incl: Vec<String>,

    /// Files excluded from the lens.
    #[serde(deserialize_with = "one_or_many")]
    pub excl: Vec<String>,

    /// Script run once the session is set up.
    pub srun: Option<Script>,
}

impl InitOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filesystem root.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Sets the lens load path.
    #[must_use]
    pub fn loadpath(mut self, loadpath: impl Into<String>) -> Self {
        self.loadpath = Some(loadpath.into());
        self
    }

    /// Replaces the flags.
    #[must_use]
    pub fn flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Adds a flag.
    #[must_use]
    pub fn with_flag(mut self, flag: Flags) -> Self {
        self.flags |= flag;
        self
    }

    /// Sets the lens.
    #[must_use]
    pub fn lens(mut self, lens: impl Into<String>) -> Self {
        self.lens = Some(lens.into());
        self
    }

    /// Adds an include pattern.
    #[must_use]
    pub fn incl(mut self, pattern: impl Into<String>) -> Self {
        self.incl.push(pattern.into());
        self
    }

    /// Adds an exclude pattern.
    #[must_use]
    pub fn excl(mut self, pattern: impl Into<String>) -> Self {
        self.excl.push(pattern.into());
        self
    }

    /// Sets the setup script.
    #[must_use]
    pub fn srun(mut self, script: impl Into<Script>) -> Self {
        self.srun = Some(script.into());
        self
    }

    /// Returns the lens name with its suffix, e.g. `Hosts.lns`.
    pub fn qualified_lens(&self) -> Option<String> {
        self.lens.as_deref().map(|lens| {
            if lens.contains('.') {
                lens.to_string()
            } else {
                format!("{lens}{LENS_SUFFIX}")
            }
        })
    }

    /// Returns the label of the lens' load entry, e.g. `Hosts`.
    pub fn lens_label(&self) -> Option<String> {
        self.lens.as_deref().map(|lens| {
            lens.split('.')
                .next()
                .filter(|module| !module.is_empty())
                .unwrap_or(lens)
                .to_string()
        })
    }

    /// Flags actually passed to the engine.
    ///
    /// Naming a lens disables module autoloading so only that lens is used.
    pub fn effective_flags(&self) -> Flags {
        if self.lens.is_some() {
            self.flags | Flags::NO_MODL_AUTOLOAD
        } else {
            self.flags
        }
    }
}

impl<'de> Deserialize<'de> for Flags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u32::deserialize(deserializer).map(Flags::from_bits)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = InitOptions::default();
        assert!(options.root.is_none());
        assert!(options.loadpath.is_none());
        assert_eq!(options.flags, Flags::NONE);
        assert_eq!(options.effective_flags(), Flags::NONE);
    }

    #[test]
    fn builder_pattern() {
        let options = InitOptions::new()
            .root("/tmp/root")
            .loadpath("/usr/local/share/lenses")
            .with_flag(Flags::SAVE_NEWFILE)
            .lens("Hosts")
            .incl("/etc/hosts")
            .srun(vec!["defnode hosts /files/etc/hosts".to_string()]);

        assert_eq!(options.root, Some(PathBuf::from("/tmp/root")));
        assert_eq!(options.incl, vec!["/etc/hosts"]);
        assert!(options.effective_flags().contains(Flags::SAVE_NEWFILE));
        assert!(options.effective_flags().contains(Flags::NO_MODL_AUTOLOAD));
    }

    #[test]
    fn lens_is_qualified_once() {
        let options = InitOptions::new().lens("Hosts");
        assert_eq!(options.qualified_lens().as_deref(), Some("Hosts.lns"));
        assert_eq!(options.lens_label().as_deref(), Some("Hosts"));

        let options = InitOptions::new().lens("Hosts.lns");
        assert_eq!(options.qualified_lens().as_deref(), Some("Hosts.lns"));
        assert_eq!(options.lens_label().as_deref(), Some("Hosts"));
    }

    #[test]
    fn deserialize_record() {
        let options: InitOptions = serde_json::from_str(
            r#"{
                "root": "/srv/root",
                "flags": 96,
                "lens": "hosts",
                "incl": "/etc/hosts",
                "excl": ["*.rpmnew", "*.bak"],
                "srun": ["load", "defnode hosts /files/etc/hosts"]
            }"#,
        )
        .unwrap();

        assert_eq!(options.flags, Flags::NO_LOAD | Flags::NO_MODL_AUTOLOAD);
        assert_eq!(options.incl, vec!["/etc/hosts"]);
        assert_eq!(options.excl.len(), 2);
        assert_eq!(
            options.srun.unwrap().text(),
            "load\ndefnode hosts /files/etc/hosts"
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<InitOptions, _> = serde_json::from_str(r#"{"rooot": "/"}"#);
        assert!(result.is_err());
    }
}
