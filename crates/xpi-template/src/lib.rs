//! Template merging and manifest derivation.
//!
//! Pure transformations over already-loaded JSON documents. Reading
//! templates from disk and writing the results is left to the caller.

mod manifest;
mod merge;

pub use manifest::{derive_manifest, ActionSlot, ActionTypePolicy, ManifestError, PluginId};
pub use merge::{merge_layers, merge_template};

use serde_json::{Map, Value};

/// A JSON object: string keys mapped to scalars, sequences or nested documents.
pub type Document = Map<String, Value>;

/// Evaluate a value the way a dynamic-language `if` would.
///
/// `null`, `false`, zero, and empty strings, arrays and objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
