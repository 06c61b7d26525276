//! String interner backing [`Name`] handles.
//!
//! Provides O(1) interning and lookup. Interned strings are leaked so that
//! `lookup` can hand out `&'static str` without holding the lock; the
//! interner lives for the whole process, so the leak is bounded by the set
//! of distinct identifiers and literals ever seen.

// Arc is required so the interner can be shared between the runtime and
// any embedding code that keeps Name handles around.
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

struct Inner {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for interned contents, indexed by `Name::raw()`.
    strings: Vec<&'static str>,
}

/// String interner for identifiers and literal texts.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let mut map = FxHashMap::default();
        map.insert("", 0);
        StringInterner {
            inner: RwLock::new(Inner {
                map,
                strings: vec![""],
            }),
        }
    }

    /// Intern a string, returning its [`Name`].
    ///
    /// Interning the same content twice returns the same handle.
    pub fn intern(&self, s: &str) -> Name {
        if let Some(&idx) = self.inner.read().map.get(s) {
            return Name::from_raw(idx);
        }
        let mut inner = self.inner.write();
        // Re-check under the write lock in case of a racing intern.
        if let Some(&idx) = inner.map.get(s) {
            return Name::from_raw(idx);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(inner.strings.len()).expect("interner capacity exceeded");
        inner.strings.push(leaked);
        inner.map.insert(leaked, idx);
        Name::from_raw(idx)
    }

    /// Look up the content of an interned name.
    ///
    /// # Panics
    /// Panics if `name` was not produced by this interner.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.inner.read().strings[name.raw() as usize]
    }

    /// Number of interned strings (including the empty string).
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Check whether only the empty string has been interned.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        StringInterner::new()
    }
}

/// Shared handle to a [`StringInterner`].
#[derive(Clone)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    /// Create a fresh interner behind a shared handle.
    pub fn new() -> Self {
        SharedInterner(Arc::new(StringInterner::new()))
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        SharedInterner::new()
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_same_content_same_name() {
        let interner = StringInterner::new();
        let a = interner.intern("model");
        let b = interner.intern("model");
        assert_eq!(a, b);
    }

    #[test]
    fn test_intern_distinct_content_distinct_names() {
        let interner = StringInterner::new();
        let a = interner.intern("cow");
        let b = interner.intern("sheep");
        assert_ne!(a, b);
    }

    #[test]
    fn test_lookup_roundtrip() {
        let interner = StringInterner::new();
        let name = interner.intern("perceptron");
        assert_eq!(interner.lookup(name), "perceptron");
    }

    #[test]
    fn test_empty_preinterned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
        assert!(interner.is_empty());
    }

    #[test]
    fn test_shared_interner_clones_share_storage() {
        let shared = SharedInterner::new();
        let other = shared.clone();
        let name = shared.intern("alias");
        assert_eq!(other.lookup(name), "alias");
    }
}
