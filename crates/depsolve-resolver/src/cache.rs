//! Memo tables for a single resolve call.
//!
//! Keys are built from pure inputs (dependency, specifier, version), so a
//! value never changes once stored and the tables can be shared by every
//! branch of the search.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use depsolve_core::dependency::Dependency;

use crate::version::{PinnedVersion, VersionSpecifier};

/// Key of the version-set table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionedDependency {
    pub dependency: Dependency,
    pub specifier: VersionSpecifier,
    pub is_updatable: bool,
}

/// Key of the transitive-dependency table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinnedDependency {
    pub dependency: Dependency,
    pub version: PinnedVersion,
}

/// Key of the known-conflict table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstrainedDependency {
    pub dependency: Dependency,
    pub specifier: VersionSpecifier,
}

/// A map whose values are computed at most once per key.
#[derive(Debug)]
pub struct MemoTable<K, V> {
    entries: HashMap<K, V>,
    hits: usize,
}

impl<K, V> Default for MemoTable<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
        }
    }
}

impl<K: Hash + Eq, V> MemoTable<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Return the stored value, computing and storing it first if absent.
    ///
    /// A failed computation stores nothing.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(compute()?)),
        }
    }

    /// How many lookups were answered from the table.
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_once() {
        let mut table: MemoTable<&str, usize> = MemoTable::new();
        let mut calls = 0;
        for _ in 0..3 {
            let v = table
                .get_or_try_insert_with("a", || {
                    calls += 1;
                    Ok::<_, ()>(42)
                })
                .unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(calls, 1);
        assert_eq!(table.hits(), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn failure_is_not_stored() {
        let mut table: MemoTable<&str, usize> = MemoTable::new();
        assert!(table.get_or_try_insert_with("a", || Err("down")).is_err());
        assert!(table.is_empty());
        assert_eq!(*table.get_or_try_insert_with("a", || Ok::<_, &str>(7)).unwrap(), 7);
    }

    #[test]
    fn keys_distinguish_updatability() {
        let dep = Dependency::github("test/Lib");
        let spec: VersionSpecifier = "~> 1.0".parse().unwrap();
        let mut table = MemoTable::new();
        table.insert(
            VersionedDependency {
                dependency: dep.clone(),
                specifier: spec.clone(),
                is_updatable: true,
            },
            1,
        );
        let pinned_key = VersionedDependency {
            dependency: dep,
            specifier: spec,
            is_updatable: false,
        };
        assert!(table.get(&pinned_key).is_none());
    }
}
