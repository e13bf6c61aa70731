//! Recursive structural merge of raw preference documents.
//!
//! The merge is nested-mapping-aware and scalar-replacing: objects combine
//! key by key, everything else (arrays included) is replaced wholesale by
//! the patch. This is deliberately *not* a general JSON-merge-patch engine;
//! it serves a schema-validated preference tree a few levels deep.

use serde_json::{Map, Value};

/// Deep-merge `patch` into `base`, with `patch` taking precedence.
///
/// - Object + object: merged recursively, patch keys win.
/// - Any other pairing: the patch value replaces the base value wholesale.
///   Arrays are replaced, never merged element-wise.
/// - Keys absent from the patch are left untouched.
/// - `null` in the patch replaces literally. The schema layer treats a
///   stored `null` on a recognized field as "use the default", so patching
///   a typed field to `null` reads back as its default. Removing a key
///   outright is the reset operation's job, not the merge's.
///
/// Both inputs are consumed; the caller observes no shared mutable state.
/// The operation is associative: `merge(merge(t, a), b)` equals
/// `merge(t, merge(a, b))`, which is what makes sequential partial updates
/// safe to reason about independently.
pub fn deep_merge(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, patch_value),
                    None => patch_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, patch) => patch,
    }
}

/// [`deep_merge`] specialized to two raw documents.
pub fn deep_merge_maps(base: Map<String, Value>, patch: Map<String, Value>) -> Map<String, Value> {
    match deep_merge(Value::Object(base), Value::Object(patch)) {
        Value::Object(map) => map,
        // Unreachable: merging two objects always yields an object.
        _ => Map::new(),
    }
}
