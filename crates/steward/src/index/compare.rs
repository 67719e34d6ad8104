//! Pure index diffing between declared definitions and live descriptors.
//!
//! The interesting case is the text index: the server rewrites its key spec
//! into synthetic `_fts`/`_ftsx` fields, defaults the language fields, and
//! synthesizes per-field weights, so naive equality would report every text
//! index as changed and trigger a destructive drop/recreate on every run.
//! The comparison here normalizes both sides so that an index the server
//! built from the exact declared definition compares as unchanged.

use serde_json::{Value, json};

use crate::index::def::{
    INDEX_OPTIONS,
    IndexDef,
    LiveIndex,
    TEXT_KEY_FIELDS,
    is_text_direction,
};
use crate::spec::JsonMap;

/// Option keys that text comparison handles explicitly rather than through
/// the generic trailing comparison.
const TEXT_HANDLED_OPTIONS: &[&str] = &[
    "default_language",
    "language_override",
    "weights",
    "textIndexVersion",
];

/// Decides whether a declared index no longer matches its live descriptor.
///
/// Non-text indexes compare keys structurally (order-sensitive) and options
/// against the whitelisted projection of the live descriptor. Text indexes
/// go through [`text_index_has_changed`].
///
/// ```
/// use steward_mongo::index::{IndexDef, LiveIndex, index_has_changed};
///
/// let declared: IndexDef =
///     serde_json::from_str(r#"{ "name": "idx1", "keys": { "y": 1 } }"#).unwrap();
/// let live: LiveIndex =
///     serde_json::from_str(r#"{ "name": "idx1", "key": { "y": 1 }, "v": 2 }"#).unwrap();
/// assert!(!index_has_changed(&declared, &live));
/// ```
pub fn index_has_changed(declared: &IndexDef, live: &LiveIndex) -> bool {
    if declared.keys.has_text() {
        return text_index_has_changed(declared, live);
    }
    declared.keys != live.key
        || declared.options != project_options(&live.attributes, &[])
}

/// Text-index comparison with server-side normalization accounted for.
///
/// Steps, in order: non-text keys against the live key spec stripped of the
/// synthetic fields; effective languages (defaults "english"/"language");
/// effective weights (weight 1 per text field when the declaration provides
/// none); then the remaining whitelisted options with `textIndexVersion`
/// ignored on both sides, since the server assigns it.
pub fn text_index_has_changed(declared: &IndexDef, live: &LiveIndex) -> bool {
    if declared.keys.non_text() != live.key.without_fields(TEXT_KEY_FIELDS) {
        return true;
    }

    let default_language = declared
        .options
        .get("default_language")
        .cloned()
        .unwrap_or_else(|| json!("english"));
    let language_override = declared
        .options
        .get("language_override")
        .cloned()
        .unwrap_or_else(|| json!("language"));
    if live.attributes.get("default_language") != Some(&default_language)
        || live.attributes.get("language_override") != Some(&language_override)
    {
        return true;
    }

    if effective_weights(declared) != live_weights(live) {
        return true;
    }

    let declared_rest = project_declared(&declared.options, TEXT_HANDLED_OPTIONS);
    let live_rest = project_options(&live.attributes, TEXT_HANDLED_OPTIONS);
    declared_rest != live_rest
}

/// The weights the server is expected to report for a declared text index.
///
/// A declaration without weights (absent or an explicitly empty object)
/// gets weight 1 for every text-indexed field, matching the server default.
fn effective_weights(declared: &IndexDef) -> JsonMap {
    match declared.options.get("weights").and_then(Value::as_object) {
        Some(weights) if !weights.is_empty() => weights.clone(),
        _ => {
            let mut weights = JsonMap::new();
            for field in declared.keys.text_fields() {
                weights.insert(field.to_owned(), json!(1));
            }
            weights
        },
    }
}

fn live_weights(live: &LiveIndex) -> JsonMap {
    live.attributes
        .get("weights")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Projects live descriptor attributes onto the option whitelist, minus the
/// excluded keys.
fn project_options(attributes: &JsonMap, exclude: &[&str]) -> JsonMap {
    attributes
        .iter()
        .filter(|(key, _)| {
            INDEX_OPTIONS.contains(&key.as_str()) && !exclude.contains(&key.as_str())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Drops the excluded keys from a declared option map.
///
/// Declared options are already whitelist-validated, so no projection onto
/// the whitelist is needed here.
fn project_declared(options: &JsonMap, exclude: &[&str]) -> JsonMap {
    options
        .iter()
        .filter(|(key, _)| !exclude.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
