//! Argument matcher: bind declared parameters to supplied values
//!
//! One ordered pass over the signature. Untyped parameters consume the
//! next supplied value positionally; typed parameters consume it only when
//! it is an instance of the declared type, otherwise the dependency is
//! auto-resolved (mapping table first, then the declared type as a service
//! id). Leftover supplied values are appended for variadic-style callables.

use std::collections::VecDeque;

use crate::registry::ParamSpec;
use crate::value::Value;
use crate::{DiError, Result};

#[cfg(feature = "logging")]
use tracing::trace;

/// What the matcher needs from its surroundings: type tests and
/// auto-resolution of declared types. Implemented by the container.
pub trait TypeSource {
    /// Is `value` an instance of class/interface `class`?
    fn is_instance_of(&self, value: &Value, class: &str) -> bool;

    /// Produce a value for an unsatisfied typed parameter
    fn resolve_dependency(&self, class: &str) -> Result<Value>;
}

/// Match a parameter signature against supplied arguments.
///
/// Errors with [`DiError::ParameterMismatch`] when a required untyped
/// parameter has nothing to consume, or with whatever auto-resolution
/// raises for an unsatisfiable declared type.
pub fn match_arguments(
    params: &[ParamSpec],
    supplied: Vec<Value>,
    source: &dyn TypeSource,
) -> Result<Vec<Value>> {
    let mut queue: VecDeque<Value> = supplied.into();
    let mut matched = Vec::with_capacity(params.len() + queue.len());

    for param in params {
        match param.class() {
            None => match queue.pop_front() {
                Some(value) => matched.push(value),
                None if param.is_optional() => break,
                None => return Err(DiError::parameter_mismatch(param.name())),
            },
            Some(class) => {
                let next_matches = queue
                    .front()
                    .map(|value| source.is_instance_of(value, class))
                    .unwrap_or(false);

                if next_matches {
                    // checked non-empty above
                    if let Some(value) = queue.pop_front() {
                        matched.push(value);
                    }
                } else if !param.is_optional() || !queue.is_empty() {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "rigging",
                        parameter = param.name(),
                        class = class,
                        "Auto-resolving typed parameter"
                    );
                    matched.push(source.resolve_dependency(class)?);
                } else {
                    // optional with nothing left: stop binding here
                    break;
                }
            }
        }
    }

    // variadic-style leftovers go at the end
    matched.extend(queue);
    Ok(matched)
}
