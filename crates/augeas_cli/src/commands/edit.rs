//! Edit commands: `set`, `setm`, `rm`, `mv` and `insert`.

use crate::error::CliResult;
use crate::output::Outcome;
use augeas_core::{Augeas, Engine, Position};

/// Runs the set command.
pub fn set<E: Engine>(aug: &mut Augeas<E>, path: &str, value: Option<&str>) -> CliResult<Outcome> {
    aug.set(path, value)?;
    Ok(Outcome::Done { operation: "set" })
}

/// Runs the setm command. A `sub` of `.` targets the base nodes themselves.
pub fn setm<E: Engine>(
    aug: &mut Augeas<E>,
    base: &str,
    sub: &str,
    value: Option<&str>,
) -> CliResult<Outcome> {
    let sub = Some(sub).filter(|sub| sub.trim() != ".");
    Ok(Outcome::Count {
        operation: "setm",
        count: aug.setm(base, sub, value)?,
    })
}

/// Runs the rm command.
pub fn rm<E: Engine>(aug: &mut Augeas<E>, path: &str) -> CliResult<Outcome> {
    Ok(Outcome::Count {
        operation: "rm",
        count: aug.rm(path)?,
    })
}

/// Runs the mv command.
pub fn mv<E: Engine>(aug: &mut Augeas<E>, src: &str, dst: &str) -> CliResult<Outcome> {
    aug.mv(src, dst)?;
    Ok(Outcome::Done { operation: "mv" })
}

/// Runs the insert command.
pub fn insert<E: Engine>(
    aug: &mut Augeas<E>,
    path: &str,
    label: &str,
    before: bool,
) -> CliResult<Outcome> {
    let position = if before {
        Position::Before
    } else {
        Position::After
    };
    aug.insert(path, label, position)?;
    Ok(Outcome::Done { operation: "insert" })
}
