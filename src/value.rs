//! Dynamic value model for definitions, parameters and call arguments
//!
//! Definitions are plain nested data (`Value::Map`/`Value::List`) whose
//! string leaves may carry `${...}` placeholders. Live objects travel as
//! [`Instance`] (a class-tagged `Arc<dyn Any>`), and factory/hook bodies as
//! [`Invocable`]. Instances clone by reference; identity is `Arc::ptr_eq`.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::registry::ParamSpec;
use crate::{Container, Result};

/// A constructed service object, type-erased and shared by reference.
///
/// The optional class tag ties the object back to its [`ClassSpec`] in the
/// class registry, which is what `instance-of` tests and typed parameter
/// matching run against. Instances created outside the registry are
/// anonymous: they satisfy untyped parameters but never a declared type.
///
/// [`ClassSpec`]: crate::registry::ClassSpec
#[derive(Clone)]
pub struct Instance {
    class: Option<Arc<str>>,
    object: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wrap an object without a class tag
    #[inline]
    pub fn new<T: Send + Sync + 'static>(object: T) -> Self {
        Self {
            class: None,
            object: Arc::new(object),
        }
    }

    /// Wrap an object tagged with a registry class name
    #[inline]
    pub fn of_class<T: Send + Sync + 'static>(class: impl Into<String>, object: T) -> Self {
        Self {
            class: Some(Arc::from(class.into().as_str())),
            object: Arc::new(object),
        }
    }

    /// Wrap an already-shared object without a class tag
    #[inline]
    pub fn from_arc<T: Send + Sync + 'static>(object: Arc<T>) -> Self {
        Self {
            class: None,
            object,
        }
    }

    /// The registry class name this instance was constructed as, if any
    #[inline]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Tag an anonymous instance with a class name; existing tags win
    pub(crate) fn tagged(mut self, class: &str) -> Self {
        if self.class.is_none() {
            self.class = Some(Arc::from(class));
        }
        self
    }

    /// Downcast to a concrete type, sharing the underlying allocation
    #[inline]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.object).downcast::<T>().ok()
    }

    /// Same underlying object?
    #[inline]
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.as_deref().unwrap_or("<anonymous>"))
            .finish()
    }
}

/// Signature of a callable body: the owning container plus bound arguments
pub type CallFn = Arc<dyn Fn(&Container, &[Value]) -> Result<Value> + Send + Sync>;

/// A callable value: a closure plus the parameter signature the argument
/// matcher binds against.
///
/// Used for factory-style definitions, post-construction methods given as
/// closures, common-hook predicates/actions, and [`Container::run`].
///
/// [`Container::run`]: crate::Container::run
#[derive(Clone)]
pub struct Invocable {
    params: Arc<[ParamSpec]>,
    call: CallFn,
}

impl Invocable {
    /// A callable with no declared parameters
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Container, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            params: Arc::from(Vec::new()),
            call: Arc::new(f),
        }
    }

    /// A callable with a declared parameter signature
    pub fn with_params<F>(params: Vec<ParamSpec>, f: F) -> Self
    where
        F: Fn(&Container, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            params: Arc::from(params),
            call: Arc::new(f),
        }
    }

    /// Declared parameters, in order
    #[inline]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Invoke with already-matched arguments
    #[inline]
    pub fn call(&self, container: &Container, args: &[Value]) -> Result<Value> {
        (self.call)(container, args)
    }

    #[inline]
    fn fn_ptr_eq(&self, other: &Invocable) -> bool {
        Arc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for Invocable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocable")
            .field("params", &self.params.len())
            .finish()
    }
}

/// A dynamic value: definition data, parameters, arguments or live objects
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Instance(Instance),
    Callable(Invocable),
}

impl Value {
    /// Short tag for error messages and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Instance(_) => "instance",
            Value::Callable(_) => "callable",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    #[inline]
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Downcast an `Instance` value to a concrete type
    #[inline]
    pub fn instance_of<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.as_instance().and_then(Instance::downcast)
    }

    /// Stringified form used when splicing a placeholder into text.
    ///
    /// Scalars render naturally; containers and objects fall back to their
    /// kind tag, which keeps mixed-text expansion total.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            other => format!("<{}>", other.kind()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // live objects and callables compare by identity
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            (Value::Callable(a), Value::Callable(b)) => a.fn_ptr_eq(b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl From<Instance> for Value {
    fn from(i: Instance) -> Self {
        Value::Instance(i)
    }
}

impl From<Invocable> for Value {
    fn from(f: Invocable) -> Self {
        Value::Callable(f)
    }
}
