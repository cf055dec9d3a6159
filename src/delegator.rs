//! Delegation registry: a prioritized lookup chain of sibling containers
//!
//! `has`/`get` consult each registered container in order. A container
//! added to a delegator routes its reference-expander service lookups
//! through the delegator first, so `${#id}` placeholders resolve across
//! container boundaries transparently.

use std::sync::{Arc, RwLock};

use crate::value::Value;
use crate::{Container, DiError, Result};

#[cfg(feature = "logging")]
use tracing::debug;

pub(crate) struct DelegatorInner {
    containers: RwLock<Vec<Container>>,
}

/// Prioritized registry of sibling containers
#[derive(Clone)]
pub struct Delegator {
    inner: Arc<DelegatorInner>,
}

impl Delegator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DelegatorInner {
                containers: RwLock::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<DelegatorInner>) -> Self {
        Self { inner }
    }

    /// Register a container at the end of the lookup chain and point its
    /// service lookups back through this delegator
    pub fn add_container(&self, container: &Container) {
        #[cfg(feature = "logging")]
        debug!(target: "rigging", "Adding container to delegation chain");

        container.attach_delegator(Arc::downgrade(&self.inner));
        self.inner
            .containers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(container.clone());
    }

    /// Number of registered containers
    pub fn len(&self) -> usize {
        self.inner
            .containers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Does any registered container know this id?
    pub fn has(&self, id: &str) -> bool {
        self.inner
            .containers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|c| c.has(id))
    }

    /// Resolve from the first container that knows the id
    pub fn get(&self, id: &str) -> Result<Value> {
        let owner = self
            .inner
            .containers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|c| c.has(id))
            .cloned();
        match owner {
            Some(container) => container.get(id),
            None => Err(DiError::not_found(id)),
        }
    }

    /// Store a definition in the first writable container
    pub fn set(&self, id: &str, definition: impl Into<Value>) -> Result<()> {
        let target = self
            .inner
            .containers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|c| c.is_writable())
            .cloned();
        match target {
            Some(container) => container.set(id, definition),
            None => Err(DiError::readonly(id)),
        }
    }
}

impl Default for Delegator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Delegator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delegator")
            .field("containers", &self.len())
            .finish()
    }
}
