//! Integration tests for tree operations over the in-memory engine.

use augeas_core::{AugError, DefinedNode, ErrorCode, Position, Script};
use augeas_testkit::prelude::*;

#[test]
fn setm_sets_below_every_base() {
    with_hosts(|aug| {
        let changed = aug.setm(&format!("{HOSTS}/*"), Some("comment"), Some("managed")).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(aug.count(&format!("{HOSTS}/*/comment")).unwrap(), 2);
        assert_eq!(
            aug.get(&format!("{HOSTS}/2/comment")).unwrap().as_deref(),
            Some("managed")
        );
    });
}

#[test]
fn setm_without_sub_sets_base_nodes() {
    with_hosts(|aug| {
        assert_eq!(aug.setm(&format!("{HOSTS}/*/canonical"), None, Some("x")).unwrap(), 2);
        assert_eq!(aug.matches(&format!("{HOSTS}/*/canonical")).unwrap().len(), 2);
        assert_eq!(aug.get(&format!("{HOSTS}/1/canonical")).unwrap().as_deref(), Some("x"));
    });
}

#[test]
fn setm_without_matches_changes_nothing() {
    with_session(|aug| {
        assert_eq!(aug.setm("/files/none/*", Some("x"), Some("1")).unwrap(), 0);
    });
}

#[test]
fn mv_replaces_destination() {
    with_hosts(|aug| {
        aug.mv(&format!("{HOSTS}/2"), &format!("{HOSTS}/3")).unwrap();
        assert_eq!(aug.count(&format!("{HOSTS}/2")).unwrap(), 0);
        assert_eq!(
            aug.get(&format!("{HOSTS}/3/canonical")).unwrap().as_deref(),
            Some("gateway")
        );
    });
}

#[test]
fn mv_into_descendant_fails() {
    with_hosts(|aug| {
        let err = aug.mv(&format!("{HOSTS}/1"), &format!("{HOSTS}/1/alias/nested")).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MoveIntoDescendant));
        assert_eq!(aug.error(), ErrorCode::MoveIntoDescendant);
        assert_eq!(aug.count(&format!("{HOSTS}/1/alias/nested")).unwrap(), 0);
    });
}

#[test]
fn mv_without_source_fails() {
    with_hosts(|aug| {
        let err = aug.mv(&format!("{HOSTS}/9"), &format!("{HOSTS}/10")).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NoMatch));
    });
}

#[test]
fn insert_places_siblings() {
    with_hosts(|aug| {
        let entry = format!("{HOSTS}/1");
        aug.insert_before(&format!("{entry}/alias"), "alias").unwrap();
        aug.set(&format!("{entry}/alias[1]"), Some("first")).unwrap();
        aug.insert(&format!("{entry}/ipaddr"), "#comment", Position::After).unwrap();

        let children: Vec<String> = aug.matches(&format!("{entry}/*")).unwrap();
        assert_eq!(
            children,
            vec![
                format!("{entry}/ipaddr"),
                format!("{entry}/#comment"),
                format!("{entry}/canonical"),
                format!("{entry}/alias[1]"),
                format!("{entry}/alias[2]"),
            ]
        );
        assert_eq!(
            aug.get(&format!("{entry}/alias[2]")).unwrap().as_deref(),
            Some("localhost.localdomain")
        );
    });
}

#[test]
fn insert_after_appends_behind_match() {
    with_hosts(|aug| {
        aug.insert_after(&format!("{HOSTS}/2"), "3").unwrap();
        let paths = aug.matches(&format!("{HOSTS}/*")).unwrap();
        assert_eq!(paths.last().map(String::as_str), Some("/files/etc/hosts/3"));
    });
}

#[test]
fn insert_needs_single_match() {
    with_hosts(|aug| {
        let err = aug.insert_before(&format!("{HOSTS}/*"), "x").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MultipleMatches));
    });
}

#[test]
fn defnode_creates_once() {
    with_session(|aug| {
        let mut reported = Vec::new();
        let first = aug
            .defnode_with("n", "/files/etc/motd", Some("hi"), |created| reported.push(created))
            .unwrap();
        let second = aug
            .defnode_with("n", "/files/etc/motd", Some("ignored"), |created| reported.push(created))
            .unwrap();

        assert_eq!(first, DefinedNode { count: 1, created: true });
        assert_eq!(second, DefinedNode { count: 1, created: false });
        assert_eq!(reported, vec![true, false]);
        assert_eq!(aug.get("$n").unwrap().as_deref(), Some("hi"));
    });
}

#[test]
fn defvar_tracks_nodeset() {
    with_hosts(|aug| {
        assert_eq!(aug.defvar("hosts", Some(HOSTS)).unwrap(), 1);
        assert_eq!(aug.count("$hosts/*").unwrap(), 2);
        assert_eq!(aug.get("$hosts/2/ipaddr").unwrap().as_deref(), Some("192.168.0.1"));

        aug.defvar("hosts", None).unwrap();
        let err = aug.count("$hosts/*").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PathExpression));
    });
}

#[test]
fn error_accessors_follow_last_call() {
    with_hosts(|aug| {
        assert!(aug.get(&format!("{HOSTS}/*/ipaddr")).is_err());
        assert_eq!(aug.error(), ErrorCode::MultipleMatches);
        let message = aug.error_message().unwrap();
        assert!(message.starts_with("Too many matches for path expression"), "{message}");
        let detail = aug.last_error().unwrap();
        assert_eq!(detail.minor.as_deref(), Some("2 nodes"));

        aug.get(&format!("{HOSTS}/1/ipaddr")).unwrap();
        assert_eq!(aug.error(), ErrorCode::NoError);
        assert_eq!(aug.error_message(), None);
        assert!(aug.last_error().is_none());
    });
}

#[test]
fn engine_error_text_is_composed() {
    with_session(|aug| {
        let err = aug.set("/files/*/x", Some("v")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "aug_set() failed: Invalid path expression: \
             cannot create node for wildcard or axis step: /files/*/x"
        );
    });
}

#[test]
fn nul_bytes_are_rejected_before_the_engine() {
    with_hosts(|aug| {
        let err = aug.set(&format!("{HOSTS}/1/ipaddr"), Some("10.0.0.1\0evil")).unwrap_err();
        assert!(matches!(err, AugError::InvalidArgument { .. }));
        assert_eq!(err.code(), None);
        assert_eq!(
            aug.get(&format!("{HOSTS}/1/ipaddr")).unwrap().as_deref(),
            Some("127.0.0.1")
        );
        assert!(aug.get("/files\0").is_err());
    });
}

#[test]
fn srun_reports_output() {
    with_hosts(|aug| {
        let output = aug
            .srun(&Script::from_lines([
                "set /files/etc/hosts/2/alias gw",
                "get /files/etc/hosts/2/alias",
                "match /files/etc/hosts/*/canonical gateway",
                "match /files/etc/nothing",
            ]))
            .unwrap();
        assert_eq!(output.executed, 4);
        assert_eq!(
            output.output,
            "/files/etc/hosts/2/alias = gw\n\
             /files/etc/hosts/2/canonical = gateway\n  \
             (no matches)\n"
        );
    });
}

#[test]
fn srun_save_and_load() {
    with_hosts(|aug| {
        aug.srun(&Script::new("set /files/etc/hosts/1/ipaddr 10.0.0.1\nload")).unwrap();
        assert_eq!(
            aug.get("/files/etc/hosts/1/ipaddr").unwrap().as_deref(),
            Some("127.0.0.1")
        );

        aug.srun(&Script::new("set /files/etc/hosts/1/ipaddr 10.0.0.1\nsave")).unwrap();
        assert_eq!(
            aug.engine().saved_value("/files/etc/hosts/1/ipaddr").as_deref(),
            Some("10.0.0.1")
        );
    });
}

#[test]
fn save_writes_snapshot() {
    with_hosts(|aug| {
        aug.set(&format!("{HOSTS}/1/ipaddr"), Some("10.1.1.1")).unwrap();
        aug.save().unwrap();
        assert_eq!(aug.engine().saves(), 1);
        assert_eq!(
            aug.engine().saved_value(&format!("{HOSTS}/1/ipaddr")).as_deref(),
            Some("10.1.1.1")
        );

        aug.engine_mut().fail_next_save("read-only file system");
        let err = aug.save().unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Internal));
        assert!(err.to_string().contains("read-only file system"));
    });
}
