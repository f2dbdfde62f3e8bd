//! core::schema
//!
//! Normalization of plugin settings schemas.
//!
//! # Rule
//!
//! A property that carries a `default` is never required: whoever reads the
//! configuration always gets a value for it. At every object node that has
//! both `properties` and `required`, names of defaulted properties are removed
//! from `required`; if nothing remains the `required` key is dropped.
//!
//! The walk visits every array element and every object value, whether or
//! not the current node matched, because schemas nest under `items`,
//! `oneOf`, `anyOf`, `definitions` and friends.
//!
//! # Invariants
//!
//! - Pure and deterministic; surviving `required` entries keep their order
//! - Idempotent: `normalize(normalize(x)) == normalize(x)`
//! - No node ends up with `required: []`
//!
//! # Example
//!
//! ```
//! use schemaship::core::schema::normalize;
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "port": { "type": "number", "default": 8080 },
//!         "host": { "type": "string" }
//!     },
//!     "required": ["port", "host"]
//! });
//!
//! let normalized = normalize(schema);
//! assert_eq!(normalized["required"], json!(["host"]));
//! ```

use serde_json::{Map, Value};

/// Normalize a schema tree, returning the rewritten tree.
pub fn normalize(mut node: Value) -> Value {
    normalize_in_place(&mut node);
    node
}

/// Normalize a schema tree in place.
pub fn normalize_in_place(node: &mut Value) {
    match node {
        Value::Object(map) => {
            prune_defaulted_required(map);
            for child in map.values_mut() {
                normalize_in_place(child);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                normalize_in_place(item);
            }
        }
        _ => {}
    }
}

/// Apply the pruning rule to a single object node.
///
/// Nodes lacking either `properties` (as an object) or `required` (as an
/// array) are left untouched.
fn prune_defaulted_required(map: &mut Map<String, Value>) {
    let defaulted: Vec<String> = match map.get("properties") {
        Some(Value::Object(properties)) => properties
            .iter()
            .filter(|(_, prop)| has_default(prop))
            .map(|(key, _)| key.clone())
            .collect(),
        _ => return,
    };

    let Some(Value::Array(required)) = map.get("required") else {
        return;
    };

    let mut remaining: Vec<Value> = Vec::with_capacity(required.len());
    for entry in required {
        let defaulted_name = entry
            .as_str()
            .is_some_and(|name| defaulted.iter().any(|d| d == name));
        if !defaulted_name && !remaining.contains(entry) {
            remaining.push(entry.clone());
        }
    }

    if remaining.len() != required.len() {
        tracing::trace!(
            before = required.len(),
            after = remaining.len(),
            "pruned required list"
        );
    }

    if remaining.is_empty() {
        map.remove("required");
    } else {
        map.insert("required".to_string(), Value::Array(remaining));
    }
}

fn has_default(prop: &Value) -> bool {
    matches!(prop, Value::Object(fields) if fields.contains_key("default"))
}
