//! # Rigging - Declarative Service Resolution for Rust
//!
//! A runtime service-resolution engine: feed it a declarative tree of
//! service definitions, parameters and interface mappings, and it produces
//! live, fully wired instances on demand.
//!
//! ## Features
//!
//! - **Reference expansion** - `${param.path}` and `${#service_id}`
//!   placeholders anywhere in definitions or call arguments
//! - **Type-directed matching** - constructor parameters resolve from
//!   supplied arguments, the mapping table, or autowiring by type
//! - **Lifecycle scopes** - shared, always-new, free-form, and
//!   owner-scoped (`#service`) instance pooling
//! - **Cycle detection** - a service that transitively needs itself fails
//!   fast with the offending id
//! - **Post-construction hooks** - per-definition method batches plus
//!   predicate-matched common hooks
//! - **Delegation** - `${#id}` lookups resolve across a prioritized chain
//!   of sibling containers
//! - **Observable** - optional tracing integration with JSON or pretty
//!   output
//!
//! ## Quick Start
//!
//! ```rust
//! use rigging::{Container, Instance, ParamSpec};
//! use std::sync::Arc;
//!
//! struct Driver;
//! struct Cache {
//!     driver: Arc<Driver>,
//! }
//!
//! let container = Container::new();
//!
//! // describe the constructible classes once, at registration time
//! container.define("Driver").constructs(|_| Ok(Driver)).register();
//! container
//!     .define("Cache")
//!     .param(ParamSpec::typed("driver", "Driver"))
//!     .construct(|args| {
//!         let driver = args[0].instance_of::<Driver>().unwrap();
//!         Ok(Instance::new(Cache { driver }))
//!     })
//!     .register();
//!
//! // declare the service; its typed dependency wires itself
//! container.set("cache", "Cache").unwrap();
//!
//! let cache = container.get("cache").unwrap();
//! assert!(cache.instance_of::<Cache>().is_some());
//!
//! // shared scope: the same instance comes back
//! assert_eq!(container.get("cache").unwrap(), cache);
//!
//! // forced-new scope: a fresh one every time
//! assert_ne!(container.one("cache").unwrap(), cache);
//! ```
//!
//! ## Definitions
//!
//! A definition is plain nested data with the reserved keys `class`,
//! `args`, `methods`, `scope` and `skip`; a bare value is shorthand for
//! `{class: value}`. String leaves may reference parameters
//! (`"${redis.host}"`) or other services (`"${#driver}"`).
//!
//! ## Scopes
//!
//! Ids accept an `@scope` suffix: `get("cache@__SINGLE__")` forces a fresh
//! build, any other token partitions the pool, and a `#owner` scope ties
//! an instance's lifetime to one construction of that owner service.

mod config;
mod container;
mod definition;
mod delegator;
mod error;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod matcher;
mod reference;
mod registry;
mod scope;
mod value;

pub use config::{ConfigStore, MemoryConfig};
pub use container::Container;
pub use definition::{Definition, DefinitionStore, ServiceClass};
pub use delegator::Delegator;
pub use error::{DiError, Result};
pub use matcher::{match_arguments, TypeSource};
pub use reference::{expand, Lookup};
pub use registry::{ClassBuilder, ClassRegistry, ClassSpec, MethodSpec, ParamSpec};
pub use scope::{raw_id, scoped_id, split_scoped_id, SCOPE_SHARED, SCOPE_SINGLE};
pub use value::{Instance, Invocable, Value};

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ClassRegistry, Container, Delegator, DiError, Instance, Invocable, MemoryConfig,
        ParamSpec, Result, Value, SCOPE_SHARED, SCOPE_SINGLE,
    };
    pub use std::sync::Arc;
}
