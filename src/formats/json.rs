/*!
 * JSON key/value adapter.
 *
 * Monolingual format: each key is the unit context and each value is both
 * source and target. Nested objects are flattened with `.` separated keys.
 */

use serde_json::Value;

use crate::errors::FormatError;

use super::TranslatableUnit;

/// Entry of a JSON translation file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonUnit {
    /// Flattened key
    pub key: String,
    /// String value
    pub value: String,
}

impl TranslatableUnit for JsonUnit {
    fn source(&self) -> &str {
        &self.value
    }

    fn target(&self) -> &str {
        &self.value
    }

    fn context(&self) -> &str {
        &self.key
    }

    fn is_translatable(&self) -> bool {
        true
    }

    fn is_translated(&self) -> bool {
        !self.value.is_empty()
    }
}

/// Parse JSON content
pub fn parse(content: &str) -> Result<Vec<JsonUnit>, FormatError> {
    let document: Value = serde_json::from_str(content)?;
    let Value::Object(_) = &document else {
        return Err(FormatError::Parse {
            line: 1,
            message: "top level JSON value must be an object".to_string(),
        });
    };

    let mut units = Vec::new();
    flatten("", &document, &mut units);
    Ok(units)
}

fn flatten(prefix: &str, value: &Value, units: &mut Vec<JsonUnit>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, child, units);
            }
        }
        Value::String(s) => units.push(JsonUnit {
            key: prefix.to_string(),
            value: s.clone(),
        }),
        Value::Number(n) => units.push(JsonUnit {
            key: prefix.to_string(),
            value: n.to_string(),
        }),
        // Arrays, booleans and nulls carry no translatable text
        _ => {}
    }
}
