//! Typed variable stores.
//!
//! The environment keeps one store per canonical type tag. Each store is a
//! [`VarMap`] over a single value type, reached through the type-erased
//! [`VarStore`] trait; narrowing back to the typed map is a checked `Any`
//! downcast that yields `None` on a type mismatch rather than failing.

use std::any::Any;
use std::fmt;

use rustc_hash::FxHashMap;
use vela_ir::{Name, StringInterner, TypeTag};

use crate::cursor::Cursor;
use crate::environment::Environment;
use crate::errors::{self, EvalResult};
use crate::value::ScriptValue;

/// Type-erased store interface used by the environment.
pub(crate) trait VarStore {
    /// The canonical tag of the values in this store.
    fn tag(&self) -> &TypeTag;

    /// Whether this store holds primitive values (as opposed to
    /// factory-constructed objects or vectors of them).
    fn is_primitive(&self) -> bool;

    /// Deep-copy this store (object handles are shared, not cloned).
    fn clone_store(&self) -> Box<dyn VarStore>;

    /// Parse one value of this store's type from the token stream.
    ///
    /// Reading only borrows the environment; the write back into the store
    /// happens separately via [`VarStore::set_boxed`], so variable
    /// references resolve against the pre-assignment state.
    fn read_value(&self, cursor: &mut Cursor<'_>, env: &Environment)
        -> EvalResult<Box<dyn Any>>;

    /// Store a value previously produced by [`VarStore::read_value`].
    fn set_boxed(&mut self, name: Name, value: Box<dyn Any>) -> EvalResult<()>;

    /// Narrowing hook for [`Environment::get`].
    fn as_any(&self) -> &dyn Any;

    /// Dump this store's bindings, one line per variable.
    fn print(&self, interner: &StringInterner, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// Typed store mapping variable names to values of one type.
pub(crate) struct VarMap<T: ScriptValue> {
    tag: TypeTag,
    primitive: bool,
    values: FxHashMap<Name, T>,
}

impl<T: ScriptValue> VarMap<T> {
    pub(crate) fn new(tag: TypeTag, primitive: bool) -> Self {
        VarMap {
            tag,
            primitive,
            values: FxHashMap::default(),
        }
    }

    pub(crate) fn get(&self, name: Name) -> Option<T> {
        self.values.get(&name).cloned()
    }
}

impl<T: ScriptValue> VarStore for VarMap<T> {
    fn tag(&self) -> &TypeTag {
        &self.tag
    }

    fn is_primitive(&self) -> bool {
        self.primitive
    }

    fn clone_store(&self) -> Box<dyn VarStore> {
        Box::new(VarMap {
            tag: self.tag.clone(),
            primitive: self.primitive,
            values: self.values.clone(),
        })
    }

    fn read_value(
        &self,
        cursor: &mut Cursor<'_>,
        env: &Environment,
    ) -> EvalResult<Box<dyn Any>> {
        let value = T::read(cursor, env)?;
        Ok(Box::new(value))
    }

    fn set_boxed(&mut self, name: Name, value: Box<dyn Any>) -> EvalResult<()> {
        match value.downcast::<T>() {
            Ok(value) => {
                self.values.insert(name, *value);
                Ok(())
            }
            Err(_) => Err(errors::inconsistency(format!(
                "store for type {} was handed a value of a different type",
                self.tag
            ))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn print(&self, interner: &StringInterner, out: &mut dyn fmt::Write) -> fmt::Result {
        let mut entries: Vec<(&str, &T)> = self
            .values
            .iter()
            .map(|(name, value)| (interner.lookup(*name), value))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        for (name, value) in entries {
            if self.primitive {
                writeln!(out, "{} {} = {};", self.tag, name, value.literal())?;
            } else {
                writeln!(out, "// {} {} = {}", self.tag, name, value.literal())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::INT;

    #[test]
    fn test_set_and_get() {
        let interner = StringInterner::new();
        let n = interner.intern("n");
        let mut store = VarMap::<i64>::new(TypeTag::new(INT), true);

        store.set_boxed(n, Box::new(42_i64)).unwrap();
        assert_eq!(store.get(n), Some(42));
        assert!(store.get(interner.intern("other")).is_none());
    }

    #[test]
    fn test_set_boxed_wrong_type_is_inconsistency() {
        let interner = StringInterner::new();
        let n = interner.intern("n");
        let mut store = VarMap::<i64>::new(TypeTag::new(INT), true);

        let err = store.set_boxed(n, Box::new("nope".to_owned())).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Inconsistency);
    }

    #[test]
    fn test_clone_store_is_independent() {
        let interner = StringInterner::new();
        let n = interner.intern("n");
        let mut store = VarMap::<i64>::new(TypeTag::new(INT), true);
        store.set_boxed(n, Box::new(1_i64)).unwrap();

        let copy = store.clone_store();
        store.set_boxed(n, Box::new(2_i64)).unwrap();

        let copy = copy.as_any().downcast_ref::<VarMap<i64>>().unwrap();
        assert_eq!(copy.get(n), Some(1));
        assert_eq!(store.get(n), Some(2));
    }

    #[test]
    fn test_print_primitive_store() {
        let interner = StringInterner::new();
        let mut store = VarMap::<i64>::new(TypeTag::new(INT), true);
        store
            .set_boxed(interner.intern("b"), Box::new(2_i64))
            .unwrap();
        store
            .set_boxed(interner.intern("a"), Box::new(1_i64))
            .unwrap();

        let mut out = String::new();
        store.print(&interner, &mut out).unwrap();
        assert_eq!(out, "int a = 1;\nint b = 2;\n");
    }
}
