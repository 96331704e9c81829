//! Template merge logic
//!
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (override wins)
//! - Scalars and null: override wins

use serde_json::{Map, Value};

use crate::Document;

/// Deep merge an override document onto a template document.
///
/// Every key present in `overrides` either replaces the template value
/// (scalars, null, arrays) or descends into it (objects). An object override
/// landing on a missing or non-object template value is merged onto an
/// empty object. Keys only present in `template` are kept as they are.
pub fn merge_template(mut template: Document, overrides: Document) -> Document {
    for (key, override_value) in overrides {
        let merged = match override_value {
            Value::Object(nested) => {
                let base = match template.remove(&key) {
                    Some(Value::Object(existing)) => existing,
                    _ => Map::new(),
                };
                Value::Object(merge_template(base, nested))
            }
            leaf => leaf,
        };
        template.insert(key, merged);
    }
    template
}

/// Merge multiple layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Document>) -> Document {
    layers.into_iter().fold(Document::new(), merge_template)
}
