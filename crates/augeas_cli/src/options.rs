//! Session options from the command line and an options file.

use crate::error::{CliError, CliResult};
use augeas_core::{Flags, InitOptions};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments describing how to open the session.
#[derive(Debug, Default, Args)]
pub struct SessionArgs {
    /// Filesystem root the engine operates under
    #[arg(global = true, short, long)]
    pub root: Option<PathBuf>,

    /// Colon-separated list of extra lens directories
    #[arg(global = true, short = 'I', long)]
    pub loadpath: Option<String>,

    /// Initialization flag, e.g. `save-backup` or `AUG_NO_LOAD` (repeatable)
    #[arg(global = true, long = "flag", value_name = "NAME", value_parser = parse_flag)]
    pub flags: Vec<Flags>,

    /// Load only this lens
    #[arg(global = true, long)]
    pub lens: Option<String>,

    /// File the lens is applied to (repeatable)
    #[arg(global = true, long, value_name = "PATTERN")]
    pub incl: Vec<String>,

    /// JSON options record; command-line options override its values
    #[arg(global = true, long, value_name = "FILE")]
    pub options: Option<PathBuf>,
}

fn parse_flag(name: &str) -> Result<Flags, String> {
    Flags::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = Flags::NAMED.iter().map(|(name, _)| *name).collect();
        format!("unknown flag '{name}' (expected one of {})", known.join(", "))
    })
}

impl SessionArgs {
    /// Builds the options the session is created with.
    pub fn init_options(&self) -> CliResult<InitOptions> {
        let mut options = match &self.options {
            Some(path) => load_options(path)?,
            None => InitOptions::new(),
        };
        if let Some(root) = &self.root {
            options.root = Some(root.clone());
        }
        if let Some(loadpath) = &self.loadpath {
            options.loadpath = Some(loadpath.clone());
        }
        for flag in &self.flags {
            options.flags |= *flag;
        }
        if let Some(lens) = &self.lens {
            options.lens = Some(lens.clone());
        }
        options.incl.extend(self.incl.iter().cloned());
        Ok(options)
    }
}

/// Reads an options record from a JSON file.
pub fn load_options(path: &Path) -> CliResult<InitOptions> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Options {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn options_file(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn flag_names() {
        assert_eq!(parse_flag("save-backup").unwrap(), Flags::SAVE_BACKUP);
        assert_eq!(parse_flag("AUG_NO_LOAD").unwrap(), Flags::NO_LOAD);
        let err = parse_flag("sideways").unwrap_err();
        assert!(err.contains("AUG_SAVE_NEWFILE"));
    }

    #[test]
    fn command_line_only() {
        let args = SessionArgs {
            root: Some("/srv/root".into()),
            flags: vec![Flags::SAVE_NEWFILE, Flags::NO_LOAD],
            lens: Some("Hosts".into()),
            incl: vec!["/etc/hosts".into()],
            ..SessionArgs::default()
        };
        let options = args.init_options().unwrap();
        assert_eq!(options.root, Some(PathBuf::from("/srv/root")));
        assert_eq!(options.flags, Flags::SAVE_NEWFILE | Flags::NO_LOAD);
        assert_eq!(options.qualified_lens().as_deref(), Some("Hosts.lns"));
        assert_eq!(options.incl, vec!["/etc/hosts"]);
    }

    #[test]
    fn file_values_are_overridden() {
        let file = options_file(
            r#"{"root": "/from/file", "flags": 1, "lens": "Fstab", "incl": "/etc/fstab", "srun": ["load"]}"#,
        );
        let args = SessionArgs {
            root: Some("/from/cli".into()),
            flags: vec![Flags::SAVE_NOOP],
            incl: vec!["/etc/fstab.d/*".into()],
            options: Some(file.path().to_path_buf()),
            ..SessionArgs::default()
        };
        let options = args.init_options().unwrap();
        assert_eq!(options.root, Some(PathBuf::from("/from/cli")));
        assert_eq!(options.flags, Flags::SAVE_BACKUP | Flags::SAVE_NOOP);
        assert_eq!(options.lens.as_deref(), Some("Fstab"));
        assert_eq!(options.incl, vec!["/etc/fstab", "/etc/fstab.d/*"]);
        assert_eq!(options.srun.unwrap().text(), "load");
    }

    #[test]
    fn bad_options_file() {
        let file = options_file(r#"{"lenz": "Hosts"}"#);
        let err = load_options(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Options { .. }));

        let err = load_options(Path::new("/nonexistent/options.json")).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }
}
