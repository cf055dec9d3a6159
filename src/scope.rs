//! Scoped-identifier syntax and scope tokens
//!
//! A scoped id is `rawId@scope`. Two tokens are reserved: [`SCOPE_SHARED`]
//! (one pooled instance per id) and [`SCOPE_SINGLE`] (always construct
//! fresh). Any other token names a free-form pool partition, and a
//! `#serviceId` token ties sharing to one construction of that ancestor
//! service.

use std::collections::BTreeMap;

use crate::value::Value;

/// Reuse the pooled instance across all requests for the id
pub const SCOPE_SHARED: &str = "__SHARED__";

/// Always construct a new instance
pub const SCOPE_SINGLE: &str = "__SINGLE__";

/// Split `rawId@scope` into the raw id and the explicit scope, if any
pub fn split_scoped_id(id: &str) -> (&str, Option<&str>) {
    match id.split_once('@') {
        Some((raw, scope)) if !scope.is_empty() => (raw, Some(scope)),
        Some((raw, _)) => (raw, None),
        None => (id, None),
    }
}

/// The raw id with any scope suffix removed
#[inline]
pub fn raw_id(id: &str) -> &str {
    split_scoped_id(id).0
}

/// Append a scope to an id, replacing any existing scope
pub fn scoped_id(id: &str, scope: &str) -> String {
    format!("{}@{}", raw_id(id), scope)
}

/// Attach a scope to definition data stored via `set("id@scope", ..)`.
///
/// A full `{class: ..}` map gets a `scope` key; any other body is wrapped
/// into one first.
pub(crate) fn attach_scope(definition: Value, scope: &str) -> Value {
    let mut map = match definition {
        Value::Map(m) if m.contains_key("class") => m,
        other => {
            let mut m = BTreeMap::new();
            m.insert("class".to_owned(), other);
            m
        }
    };
    map.insert("scope".to_owned(), Value::from(scope));
    Value::Map(map)
}
