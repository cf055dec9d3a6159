//! Class registry: declared parameter descriptors per registrable type
//!
//! The engine never reflects over concrete Rust types. Instead every
//! constructible class name carries a [`ClassSpec`] built once at
//! registration: its ordered constructor parameters, its constructor
//! closure, the interface names it implements, and any named methods that
//! post-construction batches may call. Autowiring a bare id means "the
//! registry has a constructible spec under that name".

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;

use crate::value::{Instance, Value};
use crate::{DiError, Result};

#[cfg(feature = "logging")]
use tracing::debug;

/// One declared constructor or method parameter
#[derive(Clone, Debug)]
pub struct ParamSpec {
    name: String,
    class: Option<String>,
    optional: bool,
}

impl ParamSpec {
    /// A parameter with no declared type; accepts any supplied value
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: None,
            optional: false,
        }
    }

    /// A parameter declared as a class or interface name
    pub fn typed(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: Some(class.into()),
            optional: false,
        }
    }

    /// Mark the parameter optional (a default exists at the call target)
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Constructor body: matched arguments in, fresh instance out
pub type ConstructFn = Arc<dyn Fn(Vec<Value>) -> Result<Instance> + Send + Sync>;

/// Method body: receiver plus matched arguments
pub type MethodFn = Arc<dyn Fn(&Instance, &[Value]) -> Result<Value> + Send + Sync>;

/// A named method on a registered class
#[derive(Clone)]
pub struct MethodSpec {
    params: Vec<ParamSpec>,
    invoke: MethodFn,
}

impl MethodSpec {
    #[inline]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    #[inline]
    pub fn invoke(&self, receiver: &Instance, args: &[Value]) -> Result<Value> {
        (self.invoke)(receiver, args)
    }
}

/// Everything the engine knows about one registrable class name
pub struct ClassSpec {
    name: Arc<str>,
    implements: Vec<String>,
    params: Vec<ParamSpec>,
    construct: Option<ConstructFn>,
    methods: HashMap<String, MethodSpec>,
}

impl ClassSpec {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn implements(&self) -> &[String] {
        &self.implements
    }

    /// Declared constructor parameters, in order
    #[inline]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Can this spec produce instances?
    #[inline]
    pub fn is_constructible(&self) -> bool {
        self.construct.is_some()
    }

    /// Construct an instance from matched arguments, tagging it with the
    /// class name when the constructor left it anonymous
    pub fn construct(&self, args: Vec<Value>) -> Result<Instance> {
        match &self.construct {
            Some(f) => Ok(f(args)?.tagged(&self.name)),
            None => Err(DiError::unknown_dependency(self.name.as_ref())),
        }
    }

    /// Look up a declared method by name
    #[inline]
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.get(name)
    }
}

impl fmt::Debug for ClassSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassSpec")
            .field("name", &self.name)
            .field("implements", &self.implements)
            .field("params", &self.params.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Fluent builder returned by [`ClassRegistry::define`]
pub struct ClassBuilder<'a> {
    registry: &'a ClassRegistry,
    spec: ClassSpec,
}

impl<'a> ClassBuilder<'a> {
    /// Declare an implemented interface (or parent class) name
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.spec.implements.push(interface.into());
        self
    }

    /// Append a constructor parameter
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.spec.params.push(param);
        self
    }

    /// Set the constructor body
    pub fn construct<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Instance> + Send + Sync + 'static,
    {
        self.spec.construct = Some(Arc::new(f));
        self
    }

    /// Set a constructor that returns the concrete type directly
    pub fn constructs<T, F>(self, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Vec<Value>) -> Result<T> + Send + Sync + 'static,
    {
        self.construct(move |args| Ok(Instance::new(f(args)?)))
    }

    /// Declare a named method callable from post-construction batches
    pub fn method<F>(mut self, name: impl Into<String>, params: Vec<ParamSpec>, f: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.spec.methods.insert(
            name.into(),
            MethodSpec {
                params,
                invoke: Arc::new(f),
            },
        );
        self
    }

    /// Insert the finished spec into the registry
    pub fn register(self) {
        self.registry.insert(self.spec);
    }
}

/// Registry of class specs, keyed by class name
pub struct ClassRegistry {
    specs: DashMap<String, Arc<ClassSpec>, RandomState>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            specs: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Start defining a class spec
    pub fn define(&self, name: impl Into<String>) -> ClassBuilder<'_> {
        let name = name.into();
        ClassBuilder {
            registry: self,
            spec: ClassSpec {
                name: Arc::from(name.as_str()),
                implements: Vec::new(),
                params: Vec::new(),
                construct: None,
                methods: HashMap::new(),
            },
        }
    }

    /// Insert a finished spec
    pub fn insert(&self, spec: ClassSpec) {
        #[cfg(feature = "logging")]
        debug!(
            target: "rigging",
            class = spec.name(),
            params = spec.params().len(),
            constructible = spec.is_constructible(),
            "Registering class spec"
        );

        self.specs.insert(spec.name.to_string(), Arc::new(spec));
    }

    /// Spec lookup by class name
    #[inline]
    pub fn spec(&self, name: &str) -> Option<Arc<ClassSpec>> {
        self.specs.get(name).map(|r| Arc::clone(r.value()))
    }

    /// Does a constructible spec exist under this name?
    #[inline]
    pub fn is_constructible(&self, name: &str) -> bool {
        self.specs
            .get(name)
            .map(|r| r.is_constructible())
            .unwrap_or(false)
    }

    /// Is `class` the same as, or a declared implementor of, `wanted`?
    ///
    /// Walks `implements` chains through the registry, so an interface that
    /// itself extends another interface still matches.
    pub fn is_a(&self, class: &str, wanted: &str) -> bool {
        if class == wanted {
            return true;
        }
        let Some(spec) = self.spec(class) else {
            return false;
        };
        spec.implements
            .iter()
            .any(|parent| self.is_a(parent, wanted))
    }

    /// Is this value an instance of `wanted` (by class tag or interface)?
    pub fn value_is_a(&self, value: &Value, wanted: &str) -> bool {
        match value.as_instance().and_then(Instance::class) {
            Some(class) => self.is_a(class, wanted),
            None => false,
        }
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("count", &self.specs.len())
            .finish()
    }
}
