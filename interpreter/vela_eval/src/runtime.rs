//! Runtime registry container.
//!
//! The [`Runtime`] owns one [`Factory`] per abstract base type plus the
//! shared string interner. Embedding code registers concrete types against
//! it while it is still mutable, then hands it to
//! [`Interpreter::new`](crate::Interpreter::new), which wraps it in `Rc`.
//! That handoff is the initialization barrier: registries are append-only
//! during init and read-only during evaluation.

use std::any::TypeId;
use std::fmt;

use rustc_hash::FxHashMap;
use vela_ir::{SharedInterner, StringInterner, TypeTag};

use crate::errors::{self, EvalResult};
use crate::factory::{Constructible, Factory, FactoryOps};

/// Owns every factory and the interner for one interpreter instance.
pub struct Runtime {
    interner: SharedInterner,
    factories: FxHashMap<TypeId, Box<dyn FactoryOps>>,
    /// Registration order of base type ids, for deterministic enumeration.
    order: Vec<TypeId>,
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Runtime {
            interner: SharedInterner::new(),
            factories: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// The string interner shared with the lexer and environment.
    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    /// Get (creating on first use) the factory for base type `B`.
    ///
    /// `base_name` is the name under which `B` appears as a type specifier
    /// in scripts; it is fixed by the first call for a given `B`.
    pub fn factory<B: Constructible + ?Sized + 'static>(
        &mut self,
        base_name: &str,
    ) -> &mut Factory<B> {
        let id = TypeId::of::<B>();
        if !self.factories.contains_key(&id) {
            self.factories
                .insert(id, Box::new(Factory::<B>::new(base_name)));
            self.order.push(id);
        }
        self.factories
            .get_mut(&id)
            .and_then(|ops| ops.as_any_mut().downcast_mut::<Factory<B>>())
            .expect("factory stored under its own TypeId")
    }

    /// The factory for base type `B`, or an error naming the missing base.
    pub(crate) fn factory_of<B: Constructible + ?Sized + 'static>(
        &self,
    ) -> EvalResult<&Factory<B>> {
        self.factories
            .get(&TypeId::of::<B>())
            .and_then(|ops| ops.as_any().downcast_ref::<Factory<B>>())
            .ok_or_else(|| errors::base_not_registered(std::any::type_name::<B>()))
    }

    /// The canonical tag for base type `B`.
    pub(crate) fn base_tag<B: Constructible + ?Sized + 'static>(&self) -> EvalResult<TypeTag> {
        Ok(TypeTag::new(self.factory_of::<B>()?.base_name()))
    }

    /// Whether a factory exists for the given base name.
    pub fn has_base(&self, name: &str) -> bool {
        self.ops().any(|ops| ops.base_name() == name)
    }

    /// Whether any factory has a concrete type registered under `name`.
    pub fn is_concrete(&self, name: &str) -> bool {
        self.ops().any(|ops| ops.is_registered(name))
    }

    /// Resolve a concrete type name to its abstract base name.
    ///
    /// `Ok(None)` when no factory knows the name; an ambiguity error when
    /// more than one does.
    pub(crate) fn base_for_concrete(&self, concrete: &str) -> EvalResult<Option<&str>> {
        let mut matches = self.ops().filter(|ops| ops.is_registered(concrete));
        let Some(first) = matches.next() else {
            return Ok(None);
        };
        let rest: Vec<String> = matches.map(|ops| ops.base_name().to_owned()).collect();
        if rest.is_empty() {
            Ok(Some(first.base_name()))
        } else {
            let mut bases = vec![first.base_name().to_owned()];
            bases.extend(rest);
            Err(errors::ambiguous_concrete(concrete, &bases))
        }
    }

    /// Map every unambiguous concrete name to its base name.
    ///
    /// Used by the environment to redirect store lookups for variables
    /// declared with a concrete type specifier. Ambiguous names are left
    /// out; using one as a specifier fails at inference instead.
    pub(crate) fn concrete_map(&self) -> FxHashMap<String, String> {
        let mut map: FxHashMap<String, Option<String>> = FxHashMap::default();
        for ops in self.ops() {
            for concrete in ops.registered() {
                map.entry(concrete)
                    .and_modify(|base| *base = None)
                    .or_insert_with(|| Some(ops.base_name().to_owned()));
            }
        }
        map.into_iter()
            .filter_map(|(concrete, base)| base.map(|base| (concrete, base)))
            .collect()
    }

    /// Iterate the type-erased factories in registration order.
    pub(crate) fn ops(&self) -> impl Iterator<Item = &dyn FactoryOps> {
        self.order
            .iter()
            .filter_map(|id| self.factories.get(id).map(Box::as_ref))
    }

    /// Print every factory's base name and registered concrete types.
    pub fn print_factories(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "Number of factories: {}.", self.order.len())?;
        for ops in self.ops() {
            writeln!(out, "Factory<{}> can construct:", ops.base_name())?;
            for concrete in ops.registered() {
                writeln!(out, "\t{concrete}")?;
            }
        }
        Ok(())
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared;

    trait Pet: Constructible {}
    #[derive(Default)]
    struct Dog;
    impl Constructible for Dog {}
    impl Pet for Dog {}

    trait Tool: Constructible {}
    #[derive(Default)]
    struct Hammer;
    impl Constructible for Hammer {}
    impl Tool for Hammer {}

    #[test]
    fn test_factory_created_once_per_base() {
        let mut runtime = Runtime::new();
        runtime
            .factory::<dyn Pet>("Pet")
            .register("Dog", || shared(Dog));
        runtime.factory::<dyn Pet>("Pet"); // second call reuses

        assert!(runtime.has_base("Pet"));
        assert!(runtime.is_concrete("Dog"));
        assert_eq!(runtime.factory_of::<dyn Pet>().unwrap().registered(), ["Dog"]);
    }

    #[test]
    fn test_missing_base_is_an_error() {
        let runtime = Runtime::new();
        assert!(runtime.factory_of::<dyn Pet>().is_err());
        assert!(runtime.base_tag::<dyn Pet>().is_err());
    }

    #[test]
    fn test_base_for_concrete() {
        let mut runtime = Runtime::new();
        runtime
            .factory::<dyn Pet>("Pet")
            .register("Dog", || shared(Dog));
        runtime
            .factory::<dyn Tool>("Tool")
            .register("Hammer", || shared(Hammer));

        assert_eq!(runtime.base_for_concrete("Dog").unwrap(), Some("Pet"));
        assert_eq!(runtime.base_for_concrete("Cat").unwrap(), None);
    }

    #[test]
    fn test_ambiguous_concrete_name() {
        let mut runtime = Runtime::new();
        runtime
            .factory::<dyn Pet>("Pet")
            .register("Robot", || shared(Dog));
        runtime
            .factory::<dyn Tool>("Tool")
            .register("Robot", || shared(Hammer));

        let err = runtime.base_for_concrete("Robot").unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::UnknownType);
        // Ambiguous names are omitted from the concrete specifier map.
        assert!(!runtime.concrete_map().contains_key("Robot"));
    }

    #[test]
    fn test_print_factories() {
        let mut runtime = Runtime::new();
        runtime
            .factory::<dyn Pet>("Pet")
            .register("Dog", || shared(Dog));

        let mut out = String::new();
        runtime.print_factories(&mut out).unwrap();
        assert_eq!(out, "Number of factories: 1.\nFactory<Pet> can construct:\n\tDog\n");
    }
}
