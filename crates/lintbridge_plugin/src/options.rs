//! Rule options table.
//!
//! The native side sends every rule-option blob across every active
//! configuration once, and afterwards refers to each blob by its position.

use serde_json::Value;

use crate::PluginError;

/// Flattened rule options, addressed by numeric options ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOptionsTable {
    options: Vec<Vec<Value>>,
}

impl RuleOptionsTable {
    /// Parses the table from its JSON form.
    ///
    /// The input must be a JSON array whose elements are themselves arrays
    /// (the options list handed to a rule). Options ID `n` is element `n`.
    pub fn from_json(json: &str) -> Result<Self, PluginError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| PluginError::invalid_options(format!("Invalid JSON: {}", e)))?;

        let Value::Array(blobs) = value else {
            return Err(PluginError::invalid_options(
                "Expected an array of rule options",
            ));
        };

        let options = blobs
            .into_iter()
            .enumerate()
            .map(|(id, blob)| match blob {
                Value::Array(list) => Ok(list),
                other => Err(PluginError::invalid_options(format!(
                    "Options ID {} must be an array, found {}",
                    id,
                    type_name(&other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { options })
    }

    /// Returns the options list for an options ID.
    pub fn get(&self, id: u32) -> Option<&[Value]> {
        self.options.get(id as usize).map(Vec::as_slice)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
