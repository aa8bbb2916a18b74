//! Script command: runs `srun` scripts from a file or stdin.

use crate::error::{CliError, CliResult};
use crate::output::Outcome;
use augeas_core::{AugError, Augeas, Engine, Script};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Reads a script from `source`; `-` reads stdin.
pub fn read_source(source: &Path) -> CliResult<Script> {
    let read = |path: &Path| {
        if path == Path::new("-") {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map(|_| text)
        } else {
            fs::read_to_string(path)
        }
    };
    read(source).map(Script::new).map_err(|source_err| CliError::Read {
        path: source.to_path_buf(),
        source: source_err,
    })
}

/// Runs the srun command. A `quit` ends the script without an error and
/// keeps what the script printed before it.
pub fn run<E: Engine>(aug: &mut Augeas<E>, script: &Script) -> CliResult<Outcome> {
    match aug.srun(script) {
        Ok(output) => Ok(Outcome::Script {
            executed: Some(output.executed),
            output: output.output,
            quit: false,
        }),
        Err(AugError::ScriptQuit { output }) => Ok(Outcome::Script {
            executed: None,
            output,
            quit: true,
        }),
        Err(e) => Err(e.into()),
    }
}
