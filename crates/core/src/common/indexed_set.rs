//! Canonicalizing stores keyed by a derived function.
//!
//! The loader (see [`crate::loader`]) must deduplicate case-variant
//! spellings of unit and capability names while keeping the *first*
//! spelling encountered as canonical. Both [`IndexedSet`] and
//! [`SelfIndexSet`] implement the same `get` / `add` / `get_or_insert`
//! contract; `IndexedSet` takes an external indexing function while
//! `SelfIndexSet` derives the key directly from the stored value.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// A store of values keyed by `f(value)`, where `f` is supplied by the
/// caller rather than derived from the value's own type.
#[derive(Debug, Default)]
pub struct IndexedSet<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> IndexedSet<K, V>
where
    K: Eq + Hash,
{
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the canonical value stored under `key`, if any.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.get(key)
    }

    /// Inserts `value` under `key`, overwriting any previous entry, and
    /// returns the entry that was displaced (if any).
    pub fn add(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    /// Returns `true` if `key` has a stored entry.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Number of distinct keys stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

/// A store whose key for a value `v` is derived by a fixed projection
/// `T -> K`, making `get_or_insert` the single canonicalization point:
/// the first spelling of an element wins, and later case-variants resolve
/// back to it.
#[derive(Debug)]
pub struct SelfIndexSet<T, K, F> {
    inner: IndexedSet<K, T>,
    key_of: F,
}

impl<T, K, F> SelfIndexSet<T, K, F>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    /// Creates an empty store using `key_of` to derive a key from a value.
    pub fn new(key_of: F) -> Self {
        Self {
            inner: IndexedSet::new(),
            key_of,
        }
    }

    /// Returns the canonical stored value whose key matches `value`'s key.
    pub fn get(&self, value: &T) -> Option<&T> {
        self.inner.get(&(self.key_of)(value))
    }

    /// Returns `true` if an entry with `value`'s key already exists.
    pub fn contains(&self, value: &T) -> bool {
        self.inner.contains(&(self.key_of)(value))
    }

    /// Inserts `value`, replacing any prior entry under the same key.
    pub fn add(&mut self, value: T) {
        let key = (self.key_of)(&value);
        let _ = self.inner.add(key, value);
    }

    /// Returns the existing canonical value for `value`'s key, inserting
    /// `value` itself as canonical if no such entry yet exists.
    pub fn get_or_insert(&mut self, value: T) -> &T {
        let key = (self.key_of)(&value);
        self.inner.entries.entry(key).or_insert(value)
    }

    /// Number of distinct keys stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{IndexedSet, SelfIndexSet};

    #[test]
    fn indexed_set_add_and_get() {
        let mut set: IndexedSet<&str, u32> = IndexedSet::new();
        assert!(set.add("a", 1).is_none());
        assert_eq!(set.get("a"), Some(&1));
        assert_eq!(set.add("a", 2), Some(1));
        assert_eq!(set.get("a"), Some(&2));
    }

    #[test]
    fn self_index_set_first_spelling_wins() {
        let mut set: SelfIndexSet<String, String, _> =
            SelfIndexSet::new(|s: &String| s.to_lowercase());
        assert_eq!(set.get_or_insert("ALU".to_string()), "ALU");
        // A later case-variant resolves back to the first spelling.
        assert_eq!(set.get_or_insert("alu".to_string()), "ALU");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn self_index_set_contains_and_overwrite() {
        let mut set: SelfIndexSet<String, String, _> =
            SelfIndexSet::new(|s: &String| s.to_lowercase());
        set.add("Mem".to_string());
        assert!(set.contains(&"MEM".to_string()));
        set.add("MEM".to_string());
        assert_eq!(set.get(&"mem".to_string()), Some(&"MEM".to_string()));
    }
}
