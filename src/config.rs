//! Hierarchical configuration store consumed by the resolution engine
//!
//! The engine only needs raw dotted-path reads and writes; placeholder
//! dereferencing is layered on top by [`reference`](crate::reference). File
//! loading and locale catalogs live outside this crate.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::value::Value;
use crate::{DiError, Result};

/// Raw get/has/set over dotted paths into a tree of maps and scalars
pub trait ConfigStore: Send + Sync {
    /// Read the value at a dotted path, if present
    fn get(&self, path: &str) -> Option<Value>;

    /// Is there a value at the dotted path?
    fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Write a value at a dotted path, creating intermediate maps
    fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Writes currently allowed?
    fn is_writable(&self) -> bool;

    /// Toggle write protection
    fn set_writable(&self, flag: bool);
}

/// In-memory configuration tree
pub struct MemoryConfig {
    root: RwLock<BTreeMap<String, Value>>,
    writable: AtomicBool,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(BTreeMap::new()),
            writable: AtomicBool::new(true),
        }
    }

    /// Build from `(dotted path, value)` entries
    pub fn from_entries<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, Value)>,
        P: AsRef<str>,
    {
        let config = Self::new();
        for (path, value) in entries {
            // fresh writable tree, cannot fail
            let _ = config.set(path.as_ref(), value);
        }
        config
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for MemoryConfig {
    fn get(&self, path: &str) -> Option<Value> {
        let root = self.root.read().unwrap_or_else(|e| e.into_inner());
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = root.get(first)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current.clone())
    }

    fn set(&self, path: &str, value: Value) -> Result<()> {
        if !self.is_writable() {
            return Err(DiError::readonly(path));
        }

        let mut root = self.root.write().unwrap_or_else(|e| e.into_inner());
        let mut segments: Vec<&str> = path.split('.').collect();
        let leaf = segments.pop().unwrap_or(path);

        if segments.is_empty() {
            root.insert(leaf.to_owned(), value);
            return Ok(());
        }

        let mut current = root
            .entry(segments[0].to_owned())
            .or_insert_with(|| Value::Map(BTreeMap::new()));
        for segment in &segments[1..] {
            // a scalar in the middle of the path is replaced by a map
            if current.as_map().is_none() {
                *current = Value::Map(BTreeMap::new());
            }
            let Value::Map(m) = current else { unreachable!() };
            current = m
                .entry((*segment).to_owned())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
        }
        if current.as_map().is_none() {
            *current = Value::Map(BTreeMap::new());
        }
        let Value::Map(m) = current else { unreachable!() };
        m.insert(leaf.to_owned(), value);
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.writable.load(Ordering::Acquire)
    }

    fn set_writable(&self, flag: bool) {
        self.writable.store(flag, Ordering::Release);
    }
}
