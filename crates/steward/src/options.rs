//! Collection options and the modifiable-subset comparison.
//!
//! The server only accepts a handful of option changes on an existing
//! collection (`collMod`); everything else is fixed at creation. The typed
//! [`CollectionOptions`] struct closes the accepted key set at the
//! deserialization boundary, and [`options_in_sync`] projects both sides
//! onto the modifiable subset so that creation-only options like
//! `capped`/`size` never trigger a modification attempt.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;
use crate::spec::JsonMap;

/// Options accepted when declaring a collection.
///
/// `capped`, `size`, `max`, `collation`, and `writeConcern` participate only
/// in initial creation and are immutable thereafter. Unknown keys fail
/// deserialization naming the offending field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CollectionOptions {
    /// Create a capped collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capped:                Option<bool>,
    /// Maximum size in bytes for a capped collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size:                  Option<i64>,
    /// Maximum document count for a capped collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max:                   Option<i64>,
    /// Document validation rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator:             Option<Value>,
    /// How strictly the validator is applied ("off", "moderate", "strict").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_level:      Option<String>,
    /// What happens on validation failure ("warn", "error").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_action:     Option<String>,
    /// Source collection when declaring a view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_on:               Option<String>,
    /// Aggregation pipeline when declaring a view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline:              Option<Vec<Value>>,
    /// Storage engine configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_engine:        Option<Value>,
    /// Default options applied to indexes created on the collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_option_defaults: Option<Value>,
    /// Collation, passed through at creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation:             Option<Value>,
    /// Write concern, passed through at creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_concern:         Option<Value>,
}

impl CollectionOptions {
    /// The projection of these options onto the modifiable subset.
    pub fn modifiable(&self) -> ModifiableOptions {
        ModifiableOptions {
            validator:             self.validator.clone(),
            validation_level:      self.validation_level.clone(),
            validation_action:     self.validation_action.clone(),
            view_on:               self.view_on.clone(),
            pipeline:              self.pipeline.clone(),
            storage_engine:        self.storage_engine.clone(),
            index_option_defaults: self.index_option_defaults.clone(),
        }
    }
}

/// The subset of collection options the server accepts through `collMod`.
///
/// Deserialization here is deliberately lenient: live collection metadata
/// carries fields outside the subset and they are simply ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModifiableOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator:             Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_level:      Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_action:     Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_on:               Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline:              Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_engine:        Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_option_defaults: Option<Value>,
}

impl ModifiableOptions {
    /// Projects server-reported collection options onto the modifiable
    /// subset. Absent or null metadata projects to the empty set.
    pub fn from_live(options: &Value) -> Result<Self> {
        if options.is_null() {
            return Ok(ModifiableOptions::default());
        }
        Ok(serde_json::from_value(options.clone())?)
    }

    /// Builds the `collMod` command document carrying only the fields that
    /// are actually set.
    pub(crate) fn coll_mod_command(&self, collection: &str) -> Result<Value> {
        let mut command = JsonMap::new();
        command.insert("collMod".to_owned(), json!(collection));
        if let Value::Object(fields) = serde_json::to_value(self)? {
            for (key, value) in fields {
                command.insert(key, value);
            }
        }
        Ok(Value::Object(command))
    }
}

/// Decides whether a declared option set matches live collection metadata.
///
/// Both sides are projected onto the modifiable subset before comparison;
/// fields outside it (notably `capped`/`size`) never cause a mismatch.
pub fn options_in_sync(declared: &CollectionOptions, live: &Value) -> Result<bool> {
    Ok(declared.modifiable() == ModifiableOptions::from_live(live)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_capped_options_never_trigger_modification() {
        let declared: CollectionOptions =
            serde_json::from_value(json!({ "capped": true, "size": 20 })).unwrap();
        // The live side reports nothing modifiable either.
        assert!(options_in_sync(&declared, &json!({ "capped": true, "size": 20 })).unwrap());
        assert!(options_in_sync(&declared, &json!({})).unwrap());
    }

    #[test]
    fn test_validation_level_drift_detected() {
        let declared: CollectionOptions =
            serde_json::from_value(json!({ "validationLevel": "strict" })).unwrap();
        assert!(!options_in_sync(&declared, &json!({ "validationLevel": "off" })).unwrap());
        assert!(options_in_sync(&declared, &json!({ "validationLevel": "strict" })).unwrap());
    }

    #[test]
    fn test_live_extras_are_ignored() {
        let declared: CollectionOptions =
            serde_json::from_value(json!({ "validator": { "x": { "$exists": true } } })).unwrap();
        let live = json!({
            "validator": { "x": { "$exists": true } },
            "uuid": "c2b8...",
            "readOnly": false
        });
        assert!(options_in_sync(&declared, &live).unwrap());
    }

    #[test]
    fn test_null_live_options_project_empty() {
        let declared = CollectionOptions::default();
        assert!(options_in_sync(&declared, &Value::Null).unwrap());
    }

    #[test]
    fn test_coll_mod_command_carries_only_set_fields() {
        let declared: CollectionOptions = serde_json::from_value(
            json!({ "capped": true, "size": 20, "validationAction": "warn" }),
        )
        .unwrap();
        let command = declared.modifiable().coll_mod_command("col1").unwrap();
        assert_eq!(
            command,
            json!({ "collMod": "col1", "validationAction": "warn" })
        );
    }

    #[test]
    fn test_unknown_option_rejected_by_type() {
        let result = serde_json::from_value::<CollectionOptions>(json!({ "autoIndexId": true }));
        assert!(result.is_err());
    }
}
