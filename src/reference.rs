//! Reference expansion: `${param.path}` and `${#service_id}` placeholders
//!
//! A pure function from (value, lookup sources) to value. Strings are
//! parsed once against a two-token grammar; lists and maps are walked
//! recursively; every other value passes through unchanged.
//!
//! Policy (applied uniformly): a parameter reference that cannot be
//! resolved keeps its literal placeholder text; a service reference that
//! cannot be resolved raises [`DiError::NotFound`]. Expansion of a
//! looked-up value recurses, capped at [`MAX_DEPTH`] to turn runaway
//! self-referential parameters into a cycle error instead of a hang.

use crate::value::Value;
use crate::{DiError, Result};

#[cfg(feature = "logging")]
use tracing::trace;

/// Maximum nesting of placeholder-within-placeholder expansion
pub const MAX_DEPTH: usize = 64;

/// Sources a placeholder body resolves against.
///
/// Service lookups may trigger full construction of the referenced
/// service, which is where expansion recurses into the container.
pub trait Lookup {
    /// Dotted-path parameter lookup; `None` leaves the placeholder as-is
    fn lookup_param(&self, path: &str) -> Option<Value>;

    /// Service lookup by raw id; a miss is a hard error
    fn lookup_service(&self, id: &str) -> Result<Value>;
}

/// Is this a `#service_id` key?
#[inline]
pub fn is_service_ref(body: &str) -> bool {
    body.starts_with('#')
}

/// `service_id` -> `#service_id`, the construction-chain key form
#[inline]
pub fn service_key(raw_id: &str) -> String {
    format!("#{}", raw_id)
}

/// Expand all placeholders in a value
pub fn expand(value: &Value, lookup: &dyn Lookup) -> Result<Value> {
    expand_at(value, lookup, 0)
}

fn expand_at(value: &Value, lookup: &dyn Lookup, depth: usize) -> Result<Value> {
    match value {
        Value::Str(s) => expand_str(s, lookup, depth),
        Value::List(items) => items
            .iter()
            .map(|item| expand_at(item, lookup, depth))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Value::Map(m) => m
            .iter()
            .map(|(k, v)| Ok((k.clone(), expand_at(v, lookup, depth)?)))
            .collect::<Result<_>>()
            .map(Value::Map),
        other => Ok(other.clone()),
    }
}

/// One parsed piece of a string: literal text or a placeholder body
enum Segment<'a> {
    Text(&'a str),
    Ref(&'a str),
}

fn parse(s: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = s;
    while let Some(open) = rest.find("${") {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        segments.push(Segment::Ref(&rest[open + 2..open + close]));
        rest = &rest[open + close + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

fn expand_str(s: &str, lookup: &dyn Lookup, depth: usize) -> Result<Value> {
    if !s.contains("${") {
        return Ok(Value::Str(s.to_owned()));
    }
    if depth >= MAX_DEPTH {
        return Err(DiError::circular(s));
    }

    let segments = parse(s);

    // a placeholder spanning the whole string keeps the value's type
    if let [Segment::Ref(body)] = segments.as_slice() {
        return match resolve_ref(body, lookup)? {
            Some(found) => expand_at(&found, lookup, depth + 1),
            None => Ok(Value::Str(s.to_owned())),
        };
    }

    // mixed text: stringify each resolved placeholder in place
    let mut out = String::with_capacity(s.len());
    for segment in &segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Ref(body) => match resolve_ref(body, lookup)? {
                Some(found) => {
                    let expanded = expand_at(&found, lookup, depth + 1)?;
                    out.push_str(&expanded.to_text());
                }
                None => {
                    out.push_str("${");
                    out.push_str(body);
                    out.push('}');
                }
            },
        }
    }
    Ok(Value::Str(out))
}

fn resolve_ref(body: &str, lookup: &dyn Lookup) -> Result<Option<Value>> {
    if is_service_ref(body) {
        #[cfg(feature = "logging")]
        trace!(target: "rigging", service = &body[1..], "Expanding service reference");

        lookup.lookup_service(&body[1..]).map(Some)
    } else {
        #[cfg(feature = "logging")]
        trace!(target: "rigging", param = body, "Expanding parameter reference");

        Ok(lookup.lookup_param(body))
    }
}
