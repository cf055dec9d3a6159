//! Instantiator: turn resolved definitions into live instances
//!
//! Construction goes class-name → registry constructor, object → as-is,
//! callable → invocation result, anything else → passthrough. After
//! construction the definition's own method batch runs, then the common
//! hooks (unless the definition opts out with `skip`).
//!
//! All functions take the owning [`Container`] explicitly; recursion into
//! dependency construction happens through it.

use crate::definition::{Definition, ServiceClass};
use crate::matcher::match_arguments;
use crate::reference;
use crate::value::{Instance, Invocable, Value};
use crate::{Container, DiError, Result};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Build one instance for `raw_id`, honoring supplied constructor args
pub(crate) fn create_instance(
    container: &Container,
    raw_id: &str,
    args: Vec<Value>,
) -> Result<Value> {
    let raw = container
        .store()
        .service_definition(raw_id)
        .ok_or_else(|| DiError::not_found(raw_id))?;

    // expanding the definition may recursively construct dependencies
    let expanded = reference::expand(&raw, container)?;
    let mut def = Definition::parse(&expanded);
    if !args.is_empty() {
        def.args = args;
    }

    #[cfg(feature = "logging")]
    debug!(
        target: "rigging",
        service = raw_id,
        args = def.args.len(),
        "Creating instance"
    );

    let instance = match &def.class {
        ServiceClass::ClassRef(name) => construct_class(container, name, def.args.clone())?,
        ServiceClass::Object(inst) => Value::Instance(inst.clone()),
        ServiceClass::Invocable(f) => invoke(container, f, def.args.clone())?,
        ServiceClass::Literal(v) => execute_callable(container, v, def.args.clone())?,
    };

    after_creation(container, &instance, &def)?;
    Ok(instance)
}

/// Construct from a registry class name, matching constructor parameters
fn construct_class(container: &Container, name: &str, args: Vec<Value>) -> Result<Value> {
    let spec = container
        .registry()
        .spec(name)
        .filter(|s| s.is_constructible())
        .ok_or_else(|| DiError::unknown_dependency(name))?;

    let matched = match_arguments(spec.params(), args, container)?;
    Ok(Value::Instance(spec.construct(matched)?))
}

/// Invoke a callable; arguments are matched only when some were supplied
fn invoke(container: &Container, callable: &Invocable, args: Vec<Value>) -> Result<Value> {
    if args.is_empty() {
        callable.call(container, &[])
    } else {
        let matched = match_arguments(callable.params(), args, container)?;
        callable.call(container, &matched)
    }
}

/// Execute a callable-shaped value.
///
/// Genuine callables are invoked; `[instance, "method"]` pairs dispatch
/// through the instance's class spec; any other value is returned
/// unchanged (the literal-definition passthrough).
pub(crate) fn execute_callable(
    container: &Container,
    callable: &Value,
    args: Vec<Value>,
) -> Result<Value> {
    match callable {
        Value::Callable(f) => invoke(container, f, args),
        Value::List(items) => match (items.first(), items.get(1), items.len()) {
            (Some(Value::Instance(receiver)), Some(Value::Str(method)), 2) => {
                call_method(container, receiver, method, args)
            }
            _ => Ok(callable.clone()),
        },
        other => Ok(other.clone()),
    }
}

/// Dispatch a named method against an instance's class spec
fn call_method(
    container: &Container,
    receiver: &Instance,
    method: &str,
    args: Vec<Value>,
) -> Result<Value> {
    let spec = receiver
        .class()
        .and_then(|class| container.registry().spec(class))
        .ok_or_else(|| DiError::bad_callable(method))?;
    let method_spec = spec
        .method(method)
        .ok_or_else(|| DiError::bad_callable(format!("{}::{}", spec.name(), method)))?;

    let matched = if args.is_empty() {
        args
    } else {
        match_arguments(method_spec.params(), args, container)?
    };
    method_spec.invoke(receiver, &matched)
}

/// Run a list of method entries, each against `object` when given
pub(crate) fn execute_method_batch(
    container: &Container,
    entries: &[Value],
    object: Option<&Value>,
) -> Result<()> {
    for entry in entries {
        execute_method(container, entry, object)?;
    }
    Ok(())
}

/// One method entry: a bare callable, `[target]`, or `[target, args]`.
///
/// A string target names a method on `object`; a callable target (or
/// `[instance, "method"]` pair) is executed directly.
fn execute_method(container: &Container, entry: &Value, object: Option<&Value>) -> Result<()> {
    let (target, args) = match entry {
        Value::Callable(_) => (entry.clone(), Vec::new()),
        Value::List(items) if !items.is_empty() => {
            let args = match items.get(1) {
                Some(Value::List(args)) => args.clone(),
                Some(other) => vec![other.clone()],
                None => Vec::new(),
            };
            (items[0].clone(), args)
        }
        other => return Err(DiError::bad_callable(other.kind())),
    };

    match &target {
        Value::Str(method) => match object.and_then(Value::as_instance) {
            Some(receiver) => {
                call_method(container, receiver, method, args)?;
            }
            None => return Err(DiError::bad_callable(method)),
        },
        Value::Callable(_) | Value::List(_) => {
            execute_callable(container, &target, args)?;
        }
        other => return Err(DiError::bad_callable(other.kind())),
    }
    Ok(())
}

/// Post-construction: the definition's own methods, then common hooks
fn after_creation(container: &Container, object: &Value, def: &Definition) -> Result<()> {
    if !def.methods.is_empty() {
        execute_method_batch(container, &def.methods, Some(object))?;
    }
    if !def.skip {
        execute_common_batch(container, object)?;
    }
    Ok(())
}

/// Evaluate every `[tester, action]` pair in the common section against a
/// freshly built object
fn execute_common_batch(container: &Container, object: &Value) -> Result<()> {
    let Some(node) = container.store().section_node("common") else {
        return Ok(());
    };
    let node = reference::expand(&node, container)?;

    for pair in merge_methods(&node) {
        let Value::List(items) = &pair else {
            return Err(DiError::bad_callable(pair.kind()));
        };
        let (Some(tester), Some(action)) = (items.first(), items.get(1)) else {
            return Err(DiError::bad_callable(pair.kind()));
        };

        let hit = match tester {
            Value::Str(class) => container.registry().value_is_a(object, class),
            Value::Callable(test) => test
                .call(container, &[object.clone()])?
                .as_bool()
                .unwrap_or(false),
            other => return Err(DiError::bad_callable(other.kind())),
        };

        if hit {
            #[cfg(feature = "logging")]
            trace!(target: "rigging", "Common hook matched fresh instance");

            execute_method(container, action, Some(object))?;
        }
    }
    Ok(())
}

/// Flatten a batch node: either a flat entry list, or a map of named
/// sections whose entry lists are concatenated in order
pub(crate) fn merge_methods(node: &Value) -> Vec<Value> {
    match node {
        Value::List(items) => items.clone(),
        Value::Map(sections) => sections
            .values()
            .flat_map(|section| match section {
                Value::List(items) => items.clone(),
                other => vec![other.clone()],
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_merge_methods_flat_list() {
        let node = Value::List(vec![Value::from(1i64), Value::from(2i64)]);
        assert_eq!(
            merge_methods(&node),
            vec![Value::from(1i64), Value::from(2i64)]
        );
    }

    #[test]
    fn test_merge_methods_sections() {
        let mut sections = BTreeMap::new();
        sections.insert(
            "a".to_owned(),
            Value::List(vec![Value::from(1i64), Value::from(2i64)]),
        );
        sections.insert("b".to_owned(), Value::List(vec![Value::from(3i64)]));
        assert_eq!(
            merge_methods(&Value::Map(sections)),
            vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]
        );
    }

    #[test]
    fn test_merge_methods_other() {
        assert!(merge_methods(&Value::from("x")).is_empty());
    }
}
