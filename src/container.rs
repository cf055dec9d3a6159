//! The container: scoped instance pooling, cycle detection, and the
//! public facade over the resolution pipeline
//!
//! A `Container` is a cheap-to-clone handle over shared state; clones see
//! the same definitions, pool and construction chain. Resolution is
//! synchronous and recursive: constructing a dependency is a direct call
//! back into the same container, which is why the construction chain map
//! doubles as the cycle guard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use ahash::RandomState;
use dashmap::DashMap;

use crate::config::{ConfigStore, MemoryConfig};
use crate::definition::DefinitionStore;
use crate::delegator::{Delegator, DelegatorInner};
use crate::factory;
use crate::matcher::TypeSource;
use crate::reference::{self, Lookup};
use crate::registry::{ClassBuilder, ClassRegistry};
use crate::scope::{self, SCOPE_SHARED, SCOPE_SINGLE};
use crate::value::{Instance, Value};
use crate::{DiError, Result};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

struct ContainerInner {
    store: DefinitionStore,
    registry: Arc<ClassRegistry>,
    /// pooled instances, keyed `rawId@effectiveScope`
    pool: DashMap<String, Value, RandomState>,
    /// services currently under construction: `#rawId` -> sequence number
    chain: DashMap<String, u64, RandomState>,
    counter: AtomicU64,
    default_scope: RwLock<String>,
    delegator: RwLock<Option<Weak<DelegatorInner>>>,
}

/// Service container: definitions in, wired instances out
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// An empty, writable container with its own config tree and registry
    pub fn new() -> Self {
        Self::assemble(Arc::new(MemoryConfig::new()), Arc::new(ClassRegistry::new()), "di")
    }

    /// A container over an existing config tree, definitions under `di.*`.
    ///
    /// Runs the `di.init` method batch if one is present, so a config
    /// error or malformed init entry surfaces here.
    pub fn with_config(config: Arc<dyn ConfigStore>) -> Result<Self> {
        Self::with_config_at(config, "di", Arc::new(ClassRegistry::new()))
    }

    /// A container over an existing config tree and class registry, with
    /// definitions under `<base>.*`
    pub fn with_config_at(
        config: Arc<dyn ConfigStore>,
        base: &str,
        registry: Arc<ClassRegistry>,
    ) -> Result<Self> {
        let container = Self::assemble(config, registry, base);
        container.run_init_batch()?;
        Ok(container)
    }

    fn assemble(config: Arc<dyn ConfigStore>, registry: Arc<ClassRegistry>, base: &str) -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "rigging", base = base, "Creating container");

        Self {
            inner: Arc::new(ContainerInner {
                store: DefinitionStore::new(config, Arc::clone(&registry), base),
                registry,
                pool: DashMap::with_hasher(RandomState::new()),
                chain: DashMap::with_hasher(RandomState::new()),
                counter: AtomicU64::new(0),
                default_scope: RwLock::new(SCOPE_SHARED.to_owned()),
                delegator: RwLock::new(None),
            }),
        }
    }

    fn run_init_batch(&self) -> Result<()> {
        let Some(node) = self.store().section_node("init") else {
            return Ok(());
        };
        let node = reference::expand(&node, self)?;
        factory::execute_method_batch(self, &factory::merge_methods(&node), None)
    }

    // registration surface

    /// The class registry backing autowiring and typed matching
    #[inline]
    pub fn registry(&self) -> &ClassRegistry {
        &self.inner.registry
    }

    /// Start defining a class spec (sugar for `registry().define(..)`)
    pub fn define(&self, name: impl Into<String>) -> ClassBuilder<'_> {
        self.inner.registry.define(name)
    }

    pub(crate) fn store(&self) -> &DefinitionStore {
        &self.inner.store
    }

    // container facade

    /// Resolve a service by id (optionally `id@scope`)
    pub fn get(&self, id: &str) -> Result<Value> {
        self.get_with(id, Vec::new())
    }

    /// Resolve with explicit constructor arguments.
    ///
    /// Explicit arguments always construct fresh and never touch the pool.
    pub fn get_with(&self, id: &str, args: Vec<Value>) -> Result<Value> {
        if !self.has(id) {
            return Err(DiError::not_found(id));
        }
        let args = args
            .into_iter()
            .map(|arg| reference::expand(&arg, self))
            .collect::<Result<Vec<_>>>()?;
        self.instance(id, args)
    }

    /// Is a definition available (directly or via autowiring)?
    pub fn has(&self, id: &str) -> bool {
        self.store().has_service(scope::raw_id(id))
    }

    /// Store a definition under an id (optionally `id@scope`)
    pub fn set(&self, id: &str, definition: impl Into<Value>) -> Result<()> {
        if !self.is_writable() {
            return Err(DiError::readonly(id));
        }
        let (raw, explicit) = scope::split_scoped_id(id);
        let definition = match explicit {
            Some(scope) => scope::attach_scope(definition.into(), scope),
            None => definition.into(),
        };
        self.store().set_service(raw, definition, Vec::new())
    }

    /// Always construct a fresh instance, regardless of scope
    pub fn one(&self, id: &str) -> Result<Value> {
        self.one_with(id, Vec::new())
    }

    /// Fresh instance with explicit constructor arguments
    pub fn one_with(&self, id: &str, args: Vec<Value>) -> Result<Value> {
        self.get_with(&scope::scoped_id(id, SCOPE_SINGLE), args)
    }

    /// Expand references in a callable and its arguments, then invoke.
    ///
    /// The callable may be an [`Invocable`](crate::Invocable) value or a
    /// `["${#service}", "method"]`-style pair.
    pub fn run(&self, callable: &Value, args: Vec<Value>) -> Result<Value> {
        let callable = reference::expand(callable, self)?;
        let args = args
            .into_iter()
            .map(|arg| reference::expand(&arg, self))
            .collect::<Result<Vec<_>>>()?;
        factory::execute_callable(self, &callable, args)
    }

    /// Write a parameter at a dotted path in the backing config tree
    pub fn param(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.store().set_param(name, value.into())
    }

    /// Register an interface/class mapping used by typed auto-resolution
    pub fn map(&self, from: &str, to: impl Into<Value>) -> Result<()> {
        self.store().set_mapping(from, to.into())
    }

    /// Append a common hook: `tester` is a class/interface name or a
    /// predicate callable; `action` is a method entry run on every
    /// matching fresh instance
    pub fn common(&self, tester: impl Into<Value>, action: impl Into<Value>) -> Result<()> {
        let mut entries = self
            .store()
            .section_node("common")
            .map(|node| factory::merge_methods(&node))
            .unwrap_or_default();
        entries.push(Value::List(vec![tester.into(), action.into()]));
        self.store().set_section_node("common", Value::List(entries))
    }

    /// Toggle autowiring of bare class names
    pub fn auto(&self, flag: bool) {
        self.store().set_auto(flag);
    }

    pub fn is_auto(&self) -> bool {
        self.store().is_auto()
    }

    /// Toggle the container default scope: `true` = SHARED, `false` = SINGLE
    pub fn share(&self, flag: bool) {
        let scope = if flag { SCOPE_SHARED } else { SCOPE_SINGLE };
        *self
            .inner
            .default_scope
            .write()
            .unwrap_or_else(|e| e.into_inner()) = scope.to_owned();
    }

    pub fn default_scope(&self) -> String {
        self.inner
            .default_scope
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_writable(&self) -> bool {
        self.store().is_writable()
    }

    pub fn set_writable(&self, flag: bool) {
        self.store().set_writable(flag);
    }

    // delegation

    pub(crate) fn attach_delegator(&self, delegator: Weak<DelegatorInner>) {
        *self
            .inner
            .delegator
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(delegator);
    }

    /// The delegator this container was added to, if still alive
    pub fn delegator(&self) -> Option<Delegator> {
        self.inner
            .delegator
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Delegator::from_inner)
    }

    // lifecycle/scope manager

    /// Pooled fetch or fresh construction, per the effective scope
    fn instance(&self, id: &str, args: Vec<Value>) -> Result<Value> {
        let (raw, scoped, effective) = self.real_scope_info(id);

        // explicit args or SINGLE scope: always fresh, never pooled
        if !args.is_empty() || effective == SCOPE_SINGLE {
            return self.construct(&raw, args);
        }

        if let Some(pooled) = self.inner.pool.get(&scoped).map(|r| r.value().clone()) {
            #[cfg(feature = "logging")]
            trace!(target: "rigging", service = %scoped, "Instance resolved from pool");
            return Ok(pooled);
        }

        let instance = self.construct(&raw, Vec::new())?;
        self.inner.pool.insert(scoped, instance.clone());
        Ok(instance)
    }

    /// Raw id, pool key and effective scope for a request.
    ///
    /// Scope precedence: explicit `@scope` suffix, then the definition's
    /// `scope` field, then the container default. A scope naming a service
    /// currently under construction (`#owner`) is suffixed with that
    /// construction's sequence number, making it unique per owner build.
    fn real_scope_info(&self, id: &str) -> (String, String, String) {
        let (raw, explicit) = scope::split_scoped_id(id);

        let mut effective = match explicit {
            Some(scope) => scope.to_owned(),
            None => self
                .store()
                .service_definition(raw)
                .as_ref()
                .and_then(Value::as_map)
                .and_then(|m| m.get("scope"))
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| self.default_scope()),
        };

        if let Some(seq) = self.inner.chain.get(&effective).map(|r| *r.value()) {
            effective = format!("{}_{}", effective, seq);
        }

        (raw.to_owned(), scope::scoped_id(raw, &effective), effective)
    }

    /// Construct with cycle detection around the recursive build
    fn construct(&self, raw_id: &str, args: Vec<Value>) -> Result<Value> {
        let key = reference::service_key(raw_id);
        if self.inner.chain.contains_key(&key) {
            #[cfg(feature = "logging")]
            debug!(target: "rigging", service = raw_id, "Construction cycle detected");
            return Err(DiError::circular(raw_id));
        }

        let seq = self.inner.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.chain.insert(key.clone(), seq);
        let _guard = ChainGuard {
            chain: &self.inner.chain,
            key,
        };
        factory::create_instance(self, raw_id, args)
    }
}

/// Removes the construction-chain marker on success and failure alike
struct ChainGuard<'a> {
    chain: &'a DashMap<String, u64, RandomState>,
    key: String,
}

impl Drop for ChainGuard<'_> {
    fn drop(&mut self) {
        self.chain.remove(&self.key);
    }
}

impl Lookup for Container {
    fn lookup_param(&self, path: &str) -> Option<Value> {
        self.store().param(path)
    }

    fn lookup_service(&self, id: &str) -> Result<Value> {
        // a joined delegator sees sibling containers' services too
        match self.delegator() {
            Some(delegator) => delegator.get(id),
            None => self.get(id),
        }
    }
}

impl TypeSource for Container {
    fn is_instance_of(&self, value: &Value, class: &str) -> bool {
        self.registry().value_is_a(value, class)
    }

    /// Mapping table first; otherwise the declared type doubles as a
    /// service id (autowiring by type)
    fn resolve_dependency(&self, class: &str) -> Result<Value> {
        let resolved = match self.store().mapping(class) {
            Some(mapped) => {
                // the mapping itself may be a `${...}` placeholder
                match reference::expand(&mapped, self)? {
                    Value::Callable(f) => f.call(self, &[])?,
                    Value::Str(id) => self.dependency_service(&id, class)?,
                    other => other,
                }
            }
            None => self.dependency_service(class, class)?,
        };

        // reject a known-incompatible instance; anonymous instances and
        // plain values pass through
        if let Some(instance_class) = resolved.as_instance().and_then(Instance::class) {
            if !self.registry().is_a(instance_class, class) {
                return Err(DiError::unknown_dependency(class));
            }
        }
        Ok(resolved)
    }
}

impl Container {
    fn dependency_service(&self, id: &str, wanted: &str) -> Result<Value> {
        match self.lookup_service(id) {
            Ok(value) => Ok(value),
            Err(DiError::NotFound { .. }) => Err(DiError::unknown_dependency(wanted)),
            Err(other) => Err(other),
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("pooled", &self.inner.pool.len())
            .field("under_construction", &self.inner.chain.len())
            .field("default_scope", &self.default_scope())
            .field("auto", &self.is_auto())
            .field("writable", &self.is_writable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParamSpec;
    use crate::value::Invocable;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicU32;

    struct Driver;

    struct Cache {
        driver: Arc<Driver>,
    }

    fn cache_container() -> Container {
        let container = Container::new();
        container
            .define("MyCacheDriver")
            .implements("DriverInterface")
            .constructs(|_| Ok(Driver))
            .register();
        container
            .define("MyCache")
            .param(ParamSpec::typed("driver", "MyCacheDriver"))
            .construct(|mut args| {
                let driver = args
                    .remove(0)
                    .instance_of::<Driver>()
                    .ok_or_else(|| DiError::unknown_dependency("MyCacheDriver"))?;
                Ok(crate::Instance::new(Cache { driver }))
            })
            .register();

        container.set("driver", "MyCacheDriver").unwrap();
        container
            .set(
                "cache",
                Value::Map(BTreeMap::from([
                    ("class".to_owned(), Value::from("MyCache")),
                    (
                        "args".to_owned(),
                        Value::List(vec![Value::from("${#driver}")]),
                    ),
                ])),
            )
            .unwrap();
        container
    }

    #[test]
    fn test_get_wires_dependencies() {
        let container = cache_container();
        let cache = container.get("cache").unwrap();
        let cache = cache.instance_of::<Cache>().unwrap();

        let driver = container.get("driver").unwrap();
        let driver = driver.instance_of::<Driver>().unwrap();

        // the cache holds the single shared driver
        assert!(Arc::ptr_eq(&cache.driver, &driver));
    }

    #[test]
    fn test_shared_scope_pools() {
        let container = cache_container();
        let a = container.get("cache").unwrap();
        let b = container.get("cache").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_one_always_fresh() {
        let container = cache_container();
        let a = container.get("driver").unwrap();
        let b = container.one("driver").unwrap();
        let c = container.one("driver").unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        // pooled instance unaffected
        assert_eq!(a, container.get("driver").unwrap());
    }

    #[test]
    fn test_explicit_args_bypass_pool() {
        let container = Container::new();
        container
            .define("Tagged")
            .param(ParamSpec::untyped("tag"))
            .construct(|args| {
                let tag = args[0].as_str().unwrap_or_default().to_owned();
                Ok(crate::Instance::new(tag))
            })
            .register();
        container.set("tagged", "Tagged").unwrap();

        let pooled = container.get_with("tagged", vec![Value::from("x")]).unwrap();
        let again = container.get_with("tagged", vec![Value::from("x")]).unwrap();
        assert_ne!(pooled, again);
    }

    #[test]
    fn test_explicit_scope_suffix() {
        let container = cache_container();
        let session = container.get("driver@session").unwrap();
        let session_again = container.get("driver@session").unwrap();
        let default = container.get("driver").unwrap();

        assert_eq!(session, session_again);
        assert_ne!(session, default);
    }

    #[test]
    fn test_definition_scope_single() {
        let container = cache_container();
        container
            .set(
                "fresh",
                Value::Map(BTreeMap::from([
                    ("class".to_owned(), Value::from("MyCacheDriver")),
                    ("scope".to_owned(), Value::from(SCOPE_SINGLE)),
                ])),
            )
            .unwrap();

        let a = container.get("fresh").unwrap();
        let b = container.get("fresh").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_share_toggles_default_scope() {
        let container = cache_container();
        container.share(false);
        let a = container.get("driver").unwrap();
        let b = container.get("driver").unwrap();
        assert_ne!(a, b);

        container.share(true);
        let c = container.get("driver").unwrap();
        assert_eq!(c, container.get("driver").unwrap());
    }

    #[test]
    fn test_not_found() {
        let container = Container::new();
        assert!(matches!(
            container.get("ghost"),
            Err(DiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_autowiring_toggle() {
        let container = Container::new();
        container
            .define("Standalone")
            .constructs(|_| Ok(Driver))
            .register();

        assert!(container.has("Standalone"));
        let value = container.get("Standalone").unwrap();
        assert!(value.instance_of::<Driver>().is_some());

        container.auto(false);
        assert!(!container.has("Ghostly"));
        // existing autowired definition persists; an unseen one does not
        assert!(matches!(
            container.get("Ghostly"),
            Err(DiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_autowiring_disabled_before_first_use() {
        let container = Container::new();
        container
            .define("Standalone")
            .constructs(|_| Ok(Driver))
            .register();
        container.auto(false);

        assert!(!container.has("Standalone"));
        assert!(matches!(
            container.get("Standalone"),
            Err(DiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_readonly_container_rejects_set() {
        let container = cache_container();
        container.set_writable(false);
        assert!(matches!(
            container.set("x", "MyCacheDriver"),
            Err(DiError::Readonly { .. })
        ));
        // reads unaffected
        assert!(container.get("cache").is_ok());
    }

    #[test]
    fn test_self_dependency_detected() {
        let container = Container::new();
        container.set("narcissus", "${#narcissus}").unwrap();
        assert!(matches!(
            container.get("narcissus"),
            Err(DiError::CircularDependency { .. })
        ));
        // the chain marker was removed on failure
        assert!(container.inner.chain.is_empty());
    }

    #[test]
    fn test_mutual_dependency_detected() {
        let container = Container::new();
        container.set("ping", "${#pong}").unwrap();
        container.set("pong", "${#ping}").unwrap();
        assert!(matches!(
            container.get("ping"),
            Err(DiError::CircularDependency { .. })
        ));
        assert!(container.inner.chain.is_empty());
    }

    #[test]
    fn test_literal_definition_round_trip() {
        let container = Container::new();
        let original = crate::Instance::new(Driver);
        container.set("prebuilt", original.clone()).unwrap();

        let fetched = container.get("prebuilt").unwrap();
        assert!(fetched.as_instance().unwrap().ptr_eq(&original));

        container.set("answer", Value::from(42i64)).unwrap();
        assert_eq!(container.get("answer").unwrap(), Value::from(42i64));
    }

    #[test]
    fn test_owner_scoped_sharing() {
        // A depends on B and C; B depends on C; C is scoped to "#A":
        // one C per construction of A, shared between A and B
        static BUILT: AtomicU32 = AtomicU32::new(0);

        struct C;
        struct B {
            c: Arc<C>,
        }
        struct A {
            b: Arc<B>,
            c: Arc<C>,
        }

        let container = Container::new();
        container
            .define("CClass")
            .constructs(|_| {
                BUILT.fetch_add(1, Ordering::SeqCst);
                Ok(C)
            })
            .register();
        container
            .define("BClass")
            .param(ParamSpec::untyped("c"))
            .construct(|args| {
                let c = args[0].instance_of::<C>().unwrap();
                Ok(crate::Instance::new(B { c }))
            })
            .register();
        container
            .define("AClass")
            .param(ParamSpec::untyped("b"))
            .param(ParamSpec::untyped("c"))
            .construct(|args| {
                let b = args[0].instance_of::<B>().unwrap();
                let c = args[1].instance_of::<C>().unwrap();
                Ok(crate::Instance::new(A { b, c }))
            })
            .register();

        container
            .set(
                "C",
                Value::Map(BTreeMap::from([
                    ("class".to_owned(), Value::from("CClass")),
                    ("scope".to_owned(), Value::from("#A")),
                ])),
            )
            .unwrap();
        container
            .set(
                "B",
                Value::Map(BTreeMap::from([
                    ("class".to_owned(), Value::from("BClass")),
                    ("scope".to_owned(), Value::from("#A")),
                    (
                        "args".to_owned(),
                        Value::List(vec![Value::from("${#C}")]),
                    ),
                ])),
            )
            .unwrap();
        container
            .set(
                "A",
                Value::Map(BTreeMap::from([
                    ("class".to_owned(), Value::from("AClass")),
                    (
                        "args".to_owned(),
                        Value::List(vec![Value::from("${#B}"), Value::from("${#C}")]),
                    ),
                ])),
            )
            .unwrap();

        let first = container.one("A").unwrap().instance_of::<A>().unwrap();
        // within one A build, B's C and A's C are the same instance
        assert!(Arc::ptr_eq(&first.b.c, &first.c));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);

        let second = container.one("A").unwrap().instance_of::<A>().unwrap();
        assert!(Arc::ptr_eq(&second.b.c, &second.c));
        // a new top-level A build got its own C
        assert!(!Arc::ptr_eq(&first.c, &second.c));
        assert_eq!(BUILT.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_run_expands_arguments() {
        let container = cache_container();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_by_callable = Arc::clone(&seen);

        let callable = Invocable::with_params(
            vec![ParamSpec::untyped("message")],
            move |_, args| {
                let message = args[0].as_str().unwrap_or_default().to_owned();
                seen_by_callable.lock().unwrap().push(message);
                Ok(Value::Null)
            },
        );
        container.param("user", "alice").unwrap();
        container
            .run(
                &Value::Callable(callable),
                vec![Value::from("hello ${user}")],
            )
            .unwrap();

        assert_eq!(seen.lock().unwrap().as_slice(), ["hello alice"]);
    }

    #[test]
    fn test_mapped_interface_resolution() {
        // constructor parameter typed DriverInterface, no argument
        // supplied; the mapping table routes it to the concrete service
        struct YourCache {
            driver: Arc<Driver>,
        }

        let container = cache_container();
        container
            .define("YourCache")
            .param(ParamSpec::typed("driver", "DriverInterface"))
            .construct(|args| {
                let driver = args[0].instance_of::<Driver>().unwrap();
                Ok(crate::Instance::new(YourCache { driver }))
            })
            .register();
        container.set("your_cache", "YourCache").unwrap();
        container.map("DriverInterface", "MyCacheDriver").unwrap();

        let cache = container.get("your_cache").unwrap();
        let cache = cache.instance_of::<YourCache>().unwrap();
        let driver = container.get("MyCacheDriver").unwrap();
        assert!(Arc::ptr_eq(&cache.driver, &driver.instance_of::<Driver>().unwrap()));
    }

    #[test]
    fn test_unmapped_interface_autowires_by_type() {
        let container = cache_container();
        // parameter typed by the concrete class name, no mapping needed
        let cache = container.get("cache").unwrap();
        assert!(cache.instance_of::<Cache>().is_some());

        // an unknown declared type fails loudly
        container
            .define("Broken")
            .param(ParamSpec::typed("dep", "NoSuchThing"))
            .constructs(|_| Ok(Driver))
            .register();
        container.set("broken", "Broken").unwrap();
        assert!(matches!(
            container.get("broken"),
            Err(DiError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_common_hooks_in_order() {
        let container = cache_container();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let log_a = Arc::clone(&log);
        let log_b = Arc::clone(&log);

        container
            .common(
                "DriverInterface",
                Value::List(vec![Value::Callable(Invocable::new(move |_, _| {
                    log_a.lock().unwrap().push("driver-hook");
                    Ok(Value::Null)
                }))]),
            )
            .unwrap();
        container
            .common(
                Value::Callable(Invocable::new(|_, _| Ok(Value::Bool(true)))),
                Value::List(vec![Value::Callable(Invocable::new(move |_, _| {
                    log_b.lock().unwrap().push("always-hook");
                    Ok(Value::Null)
                }))]),
            )
            .unwrap();

        let _ = container.one("driver").unwrap();
        assert_eq!(
            log.lock().unwrap().as_slice(),
            ["driver-hook", "always-hook"]
        );
    }

    #[test]
    fn test_skip_suppresses_common_hooks() {
        let container = cache_container();
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);

        container
            .common(
                Value::Callable(Invocable::new(|_, _| Ok(Value::Bool(true)))),
                Value::List(vec![Value::Callable(Invocable::new(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }))]),
            )
            .unwrap();

        container
            .set(
                "quiet",
                Value::Map(BTreeMap::from([
                    ("class".to_owned(), Value::from("MyCacheDriver")),
                    ("skip".to_owned(), Value::from(true)),
                ])),
            )
            .unwrap();

        let _ = container.one("quiet").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let _ = container.one("driver").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_post_construction_methods() {
        struct Gauge {
            readings: std::sync::Mutex<Vec<i64>>,
        }

        let container = Container::new();
        container
            .define("Gauge")
            .constructs(|_| {
                Ok(Gauge {
                    readings: std::sync::Mutex::new(Vec::new()),
                })
            })
            .method("record", vec![ParamSpec::untyped("value")], |receiver, args| {
                let gauge = receiver.downcast::<Gauge>().unwrap();
                gauge
                    .readings
                    .lock()
                    .unwrap()
                    .push(args[0].as_int().unwrap_or_default());
                Ok(Value::Null)
            })
            .register();

        container
            .set(
                "gauge",
                Value::Map(BTreeMap::from([
                    ("class".to_owned(), Value::from("Gauge")),
                    (
                        "methods".to_owned(),
                        Value::List(vec![
                            Value::List(vec![
                                Value::from("record"),
                                Value::List(vec![Value::from(1i64)]),
                            ]),
                            Value::List(vec![
                                Value::from("record"),
                                Value::List(vec![Value::from(2i64)]),
                            ]),
                        ]),
                    ),
                ])),
            )
            .unwrap();

        let gauge = container.get("gauge").unwrap();
        let gauge = gauge.instance_of::<Gauge>().unwrap();
        assert_eq!(gauge.readings.lock().unwrap().as_slice(), [1, 2]);
    }

    #[test]
    fn test_malformed_method_entry() {
        let container = cache_container();
        container
            .set(
                "bad",
                Value::Map(BTreeMap::from([
                    ("class".to_owned(), Value::from("MyCacheDriver")),
                    (
                        "methods".to_owned(),
                        Value::List(vec![Value::List(vec![Value::from("no_such_method")])]),
                    ),
                ])),
            )
            .unwrap();
        assert!(matches!(
            container.get("bad"),
            Err(DiError::BadCallable { .. })
        ));
        // a failed construction leaves nothing pooled
        assert!(container.inner.pool.is_empty());
    }
}
