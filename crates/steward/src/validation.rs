//! Small named validators shared by every public entry point.
//!
//! Each reconciler validates its whole input before issuing a single network
//! call, so a bad specification never leaves the database half-modified.

use serde_json::{Map, Value};

/// Checks whether a name is empty or consists only of whitespace.
pub fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

/// Returns the first key of `map` that is not present in `whitelist`.
///
/// Whitelists are closed sets: anything outside them is a validation
/// failure, not silently ignored.
pub fn first_unknown_key<'a>(map: &'a Map<String, Value>, whitelist: &[&str]) -> Option<&'a str> {
    map.keys()
        .map(String::as_str)
        .find(|key| !whitelist.contains(key))
}

/// Checks whether every element of `values` is a JSON object.
pub fn all_objects(values: &[Value]) -> bool {
    values.iter().all(Value::is_object)
}
