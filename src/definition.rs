//! Service definition store: a view over the config tree's service section
//!
//! Definitions live under `<base>.service.<id>`, interface mappings under
//! `<base>.mapping.<from>`, common hooks under `<base>.common`, init
//! batches under `<base>.init`, and plain parameters at the tree root.
//! `has`/`get` fall back to autowiring: a bare id naming a constructible
//! registry class synthesizes a trivial `{class: id}` definition, exactly
//! once per id.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;

use crate::config::ConfigStore;
use crate::registry::ClassRegistry;
use crate::value::{Instance, Invocable, Value};
use crate::Result;

#[cfg(feature = "logging")]
use tracing::debug;

/// The tagged `class` slot of a parsed definition
#[derive(Clone, Debug)]
pub enum ServiceClass {
    /// A registry class name to construct
    ClassRef(String),
    /// An already-built object, used as-is
    Object(Instance),
    /// A callable whose return value is the instance
    Invocable(Invocable),
    /// Anything else: passed through unchanged at build time
    Literal(Value),
}

/// A parsed, reference-expanded service definition
#[derive(Clone, Debug)]
pub struct Definition {
    pub class: ServiceClass,
    pub args: Vec<Value>,
    pub methods: Vec<Value>,
    pub scope: Option<String>,
    pub skip: bool,
}

impl Definition {
    /// Parse a raw definition value.
    ///
    /// A map carrying a `class` key is the full form; any other value is
    /// shorthand for `{class: value}`.
    pub fn parse(raw: &Value) -> Self {
        let (class_slot, map) = match raw {
            Value::Map(m) => match m.get("class") {
                Some(class) => (class.clone(), Some(m)),
                None => (raw.clone(), None),
            },
            other => (other.clone(), None),
        };

        let class = match class_slot {
            Value::Str(name) => ServiceClass::ClassRef(name),
            Value::Instance(inst) => ServiceClass::Object(inst),
            Value::Callable(f) => ServiceClass::Invocable(f),
            other => ServiceClass::Literal(other),
        };

        let args = map
            .and_then(|m| m.get("args"))
            .and_then(Value::as_list)
            .map(<[Value]>::to_vec)
            .unwrap_or_default();
        let methods = map
            .and_then(|m| m.get("methods"))
            .and_then(Value::as_list)
            .map(<[Value]>::to_vec)
            .unwrap_or_default();
        let scope = map
            .and_then(|m| m.get("scope"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        let skip = map
            .and_then(|m| m.get("skip"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Self {
            class,
            args,
            methods,
            scope,
            skip,
        }
    }
}

/// Store of raw definitions, mappings and parameters over one config tree
pub struct DefinitionStore {
    config: Arc<dyn ConfigStore>,
    registry: Arc<ClassRegistry>,
    base: String,
    auto: AtomicBool,
    /// autowired definitions recorded here when the config tree is
    /// read-only, keeping `has` idempotent either way
    synthesized: DashMap<String, Value, RandomState>,
}

impl DefinitionStore {
    pub fn new(config: Arc<dyn ConfigStore>, registry: Arc<ClassRegistry>, base: &str) -> Self {
        Self {
            config,
            registry,
            base: base.to_owned(),
            auto: AtomicBool::new(true),
            synthesized: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// `<base>.<section>` or `<base>.<section>.<id>`
    pub fn section_id(&self, id: &str, section: &str) -> String {
        if id.is_empty() {
            format!("{}.{}", self.base, section)
        } else {
            format!("{}.{}.{}", self.base, section, id)
        }
    }

    // service section

    /// Raw definition for an id, with autowiring fallback
    pub fn service_definition(&self, id: &str) -> Option<Value> {
        if let Some(def) = self.config.get(&self.section_id(id, "service")) {
            return Some(def);
        }
        if self.is_auto() && self.registry.is_constructible(id) {
            return Some(self.autowired(id));
        }
        None
    }

    /// Does a definition exist (literally or via autowiring)?
    pub fn has_service(&self, id: &str) -> bool {
        self.config.has(&self.section_id(id, "service"))
            || (self.is_auto() && self.registry.is_constructible(id))
    }

    /// Store a definition, normalizing shorthand.
    ///
    /// A bare value becomes `{class: value}`; non-empty `args` are folded
    /// in as `{class: value, args: args}`.
    pub fn set_service(&self, id: &str, definition: Value, args: Vec<Value>) -> Result<()> {
        let definition = if args.is_empty() {
            definition
        } else {
            let mut m = BTreeMap::new();
            m.insert("class".to_owned(), definition);
            m.insert("args".to_owned(), Value::List(args));
            Value::Map(m)
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "rigging",
            service = id,
            kind = definition.kind(),
            "Storing service definition"
        );

        self.config.set(&self.section_id(id, "service"), definition)?;
        self.synthesized.remove(id);
        Ok(())
    }

    /// Synthesize (once) the trivial definition for an autowired class
    fn autowired(&self, id: &str) -> Value {
        let mut m = BTreeMap::new();
        m.insert("class".to_owned(), Value::from(id));
        let def = Value::Map(m);

        if self.config.is_writable() {
            if !self.config.has(&self.section_id(id, "service")) {
                #[cfg(feature = "logging")]
                debug!(target: "rigging", service = id, "Autowiring class name as service");

                // just checked writable
                let _ = self.config.set(&self.section_id(id, "service"), def.clone());
            }
            def
        } else {
            self.synthesized
                .entry(id.to_owned())
                .or_insert(def)
                .clone()
        }
    }

    // mapping section

    /// Replacement for a class/interface name, if mapped
    pub fn mapping(&self, from: &str) -> Option<Value> {
        self.config.get(&self.section_id(from, "mapping"))
    }

    pub fn has_mapping(&self, from: &str) -> bool {
        self.config.has(&self.section_id(from, "mapping"))
    }

    pub fn set_mapping(&self, from: &str, to: Value) -> Result<()> {
        self.config.set(&self.section_id(from, "mapping"), to)
    }

    // other sections and parameters

    /// Whole section node (`common`, `init`, ...), if present
    pub fn section_node(&self, section: &str) -> Option<Value> {
        self.config.get(&self.section_id("", section))
    }

    pub fn set_section_node(&self, section: &str, value: Value) -> Result<()> {
        self.config.set(&self.section_id("", section), value)
    }

    /// Parameter lookup at the tree root
    pub fn param(&self, path: &str) -> Option<Value> {
        self.config.get(path)
    }

    pub fn set_param(&self, path: &str, value: Value) -> Result<()> {
        self.config.set(path, value)
    }

    // flags

    pub fn is_auto(&self) -> bool {
        self.auto.load(Ordering::Acquire)
    }

    pub fn set_auto(&self, flag: bool) {
        self.auto.store(flag, Ordering::Release);
    }

    pub fn is_writable(&self) -> bool {
        self.config.is_writable()
    }

    pub fn set_writable(&self, flag: bool) {
        self.config.set_writable(flag);
    }
}
