//! Query commands: `get`, `match` and `count`.

use crate::error::CliResult;
use crate::output::Outcome;
use augeas_core::{Augeas, Engine};

/// Runs the get command.
pub fn get<E: Engine>(aug: &Augeas<E>, path: &str) -> CliResult<Outcome> {
    Ok(Outcome::Value {
        path: path.to_string(),
        value: aug.get(path)?,
    })
}

/// Runs the match command.
pub fn matches<E: Engine>(aug: &Augeas<E>, path: &str) -> CliResult<Outcome> {
    Ok(Outcome::Paths {
        paths: aug.matches(path)?,
    })
}

/// Runs the count command.
pub fn count<E: Engine>(aug: &Augeas<E>, path: &str) -> CliResult<Outcome> {
    Ok(Outcome::Count {
        operation: "count",
        count: aug.count(path)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use augeas_testkit::TestSession;

    #[test]
    fn get_found_and_missing() {
        let aug = TestSession::hosts().into_inner();
        assert_eq!(
            get(&aug, "/files/etc/hosts/2/ipaddr").unwrap(),
            Outcome::Value {
                path: "/files/etc/hosts/2/ipaddr".into(),
                value: Some("192.168.0.1".into()),
            }
        );
        assert_eq!(
            get(&aug, "/files/etc/hosts/3/ipaddr").unwrap(),
            Outcome::Value {
                path: "/files/etc/hosts/3/ipaddr".into(),
                value: None,
            }
        );
        assert!(get(&aug, "/files/etc/hosts/*/ipaddr").is_err());
    }

    #[test]
    fn match_and_count() {
        let aug = TestSession::hosts().into_inner();
        assert_eq!(
            matches(&aug, "/files/etc/hosts/*").unwrap(),
            Outcome::Paths {
                paths: vec!["/files/etc/hosts/1".into(), "/files/etc/hosts/2".into()],
            }
        );
        assert_eq!(
            count(&aug, "/files/etc/hosts/*/canonical").unwrap(),
            Outcome::Count {
                operation: "count",
                count: 2,
            }
        );
    }
}
