//! Property-based test generators using proptest.
//!
//! Provides strategies for labels, values and paths the in-memory engine
//! accepts.

use proptest::prelude::*;

/// Strategy for generating tree labels.
pub fn label_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_.-]{0,15}")
        .expect("Invalid regex")
}

/// Strategy for generating node values, including empty ones.
pub fn value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~]{0,32}").expect("Invalid regex")
}

/// Strategy for generating paths below `/files` with 1 to 4 steps.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(label_strategy(), 1..=4)
        .prop_map(|labels| format!("/files/{}", labels.join("/")))
}

/// Strategy for generating distinct labels.
pub fn distinct_labels_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(label_strategy(), 1..=max).prop_map(|set| set.into_iter().collect())
}
