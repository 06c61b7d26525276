//! The typed object factory.
//!
//! Each abstract base trait `B` gets one [`Factory<B>`] holding the
//! concrete constructors registered for it. [`Factory::create`] is the
//! specification-expression parser: it consumes
//! `TypeName(member(value), …)` from the token stream, builds the fresh
//! instance, drives schema-directed member initialization inside a scoped
//! environment copy, and finishes with the instance's `post_init` hook.
//!
//! # Writing a constructible type
//!
//! ```ignore
//! trait Animal: Constructible {}
//!
//! #[derive(Default)]
//! struct Cow {
//!     name: String,
//!     age: i64,
//! }
//!
//! impl Constructible for Cow {
//!     fn register_initializers(&mut self, slots: &mut Initializers<'_>) {
//!         slots.add_required("name", |c: &mut Cow, v| c.name = v);
//!         slots.add("age", |c: &mut Cow, v| c.age = v);
//!     }
//! }
//! impl Animal for Cow {}
//!
//! runtime
//!     .factory::<dyn Animal>("Animal")
//!     .register("Cow", || shared(Cow::default()));
//! ```

use std::any::Any;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};
use vela_ir::{Name, Span, TokenKind, TypeTag};

use crate::cursor::Cursor;
use crate::environment::Environment;
use crate::errors::{self, EvalError, EvalResult};
use crate::store::{VarMap, VarStore};
use crate::value::{Shared, ScriptValue, SharedObject};
use crate::runtime::Runtime;

/// Checked-narrowing hook available on every constructible object.
///
/// The blanket impl covers all sized types, so implementing
/// [`Constructible`] is the only thing a concrete type has to do.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Interface every factory-constructible type implements.
///
/// Abstract base traits extend this trait (`trait Animal: Constructible`),
/// which makes both hooks dynamically dispatchable on the shared handles
/// the factory produces. Both hooks have do-nothing defaults.
pub trait Constructible: AsAny {
    /// Declare the named parameter slots of this type.
    ///
    /// Called on a fresh instance at the start of every construction.
    fn register_initializers(&mut self, slots: &mut Initializers<'_>) {
        let _ = slots;
    }

    /// Post-construction hook, invoked after all members are initialized.
    ///
    /// `env` is the scoped environment used during construction (it holds
    /// the temporaries); `init_str` is the literal source text of the
    /// specification that built this instance.
    fn post_init(&mut self, env: &Environment, init_str: &str) -> EvalResult<()> {
        let _ = (env, init_str);
        Ok(())
    }
}

type ApplyFn = Box<dyn Fn(&mut dyn Any, &Environment, Name) -> EvalResult<()>>;

/// One named parameter slot of a schema.
struct Slot {
    name: Name,
    tag: TypeTag,
    required: bool,
    init_count: u32,
    /// Copies the environment-bound value into the instance; absent for
    /// temporaries, which only write into the scoped environment.
    apply: Option<ApplyFn>,
}

/// The parameter schema of one construction.
///
/// Built once per construction by the instance's
/// [`Constructible::register_initializers`] hook through a small builder
/// DSL: [`add`](Initializers::add), [`add_required`](Initializers::add_required),
/// [`add_temporary`](Initializers::add_temporary), and
/// [`add_required_temporary`](Initializers::add_required_temporary).
/// Slot names must be unique; insertion order is preserved.
pub struct Initializers<'rt> {
    runtime: &'rt Runtime,
    slots: Vec<Slot>,
    index: FxHashMap<Name, usize>,
    /// First schema-definition error, surfaced when construction begins.
    error: Option<EvalError>,
}

impl<'rt> Initializers<'rt> {
    pub(crate) fn new(runtime: &'rt Runtime) -> Self {
        Initializers {
            runtime,
            slots: Vec::new(),
            index: FxHashMap::default(),
            error: None,
        }
    }

    /// Register an optional member with a setter writing into the instance.
    pub fn add<C, T>(&mut self, name: &str, set: impl Fn(&mut C, T) + 'static)
    where
        C: Constructible,
        T: ScriptValue,
    {
        self.add_slot::<C, T>(name, false, Some(Box::new(set)));
    }

    /// Register a required member with a setter writing into the instance.
    pub fn add_required<C, T>(&mut self, name: &str, set: impl Fn(&mut C, T) + 'static)
    where
        C: Constructible,
        T: ScriptValue,
    {
        self.add_slot::<C, T>(name, true, Some(Box::new(set)));
    }

    /// Register a temporary: a slot with no in-object target that only
    /// writes into the scoped environment for consumption by `post_init`.
    pub fn add_temporary<T: ScriptValue>(&mut self, name: &str) {
        self.add_slot::<Unused, T>(name, false, None);
    }

    /// Register a temporary that must nevertheless be specified.
    pub fn add_required_temporary<T: ScriptValue>(&mut self, name: &str) {
        self.add_slot::<Unused, T>(name, true, None);
    }

    fn add_slot<C, T>(&mut self, name: &str, required: bool, set: Option<Box<dyn Fn(&mut C, T) + 'static>>)
    where
        C: Constructible,
        T: ScriptValue,
    {
        let tag = match T::type_tag(self.runtime) {
            Ok(tag) => tag,
            Err(err) => {
                self.error.get_or_insert(err);
                return;
            }
        };
        let interned = self.runtime.interner().intern(name);
        if self.index.contains_key(&interned) {
            self.error.get_or_insert(errors::duplicate_member(name));
            return;
        }

        let apply = set.map(|set| -> ApplyFn {
            Box::new(move |instance, env, slot_name| {
                let Some(value) = env.get_named::<T>(slot_name) else {
                    return Err(errors::inconsistency(
                        "member value missing from the scoped environment after read",
                    ));
                };
                let Some(concrete) = instance.downcast_mut::<C>() else {
                    return Err(errors::inconsistency(
                        "constructed instance is not the type its schema was registered for",
                    ));
                };
                set(concrete, value);
                Ok(())
            })
        });

        self.index.insert(interned, self.slots.len());
        self.slots.push(Slot {
            name: interned,
            tag,
            required,
            init_count: 0,
            apply,
        });
    }

    fn take_error(&mut self) -> Option<EvalError> {
        self.error.take()
    }

    fn index_of(&self, name: Name) -> Option<usize> {
        self.index.get(&name).copied()
    }

    fn tag_of(&self, idx: usize) -> &TypeTag {
        &self.slots[idx].tag
    }

    /// Run the slot's setter (if any) and count the initialization.
    fn apply(&mut self, idx: usize, instance: &mut dyn Any, env: &Environment) -> EvalResult<()> {
        let slot = &mut self.slots[idx];
        if let Some(apply) = &slot.apply {
            apply(instance, env, slot.name)?;
        }
        slot.init_count += 1;
        Ok(())
    }

    /// Verify every required slot was initialized at least once.
    fn check_required(&self, base: &str, concrete: &str, span: Span) -> EvalResult<()> {
        for slot in &self.slots {
            if slot.required && slot.init_count == 0 {
                let member = self.runtime.interner().lookup(slot.name);
                return Err(errors::missing_required(base, concrete, member, span));
            }
        }
        Ok(())
    }
}

/// Placeholder concrete type for temporaries, which have no setter.
struct Unused;
impl Constructible for Unused {}

type Ctor<B> = Box<dyn Fn() -> Shared<B>>;

/// Registry and spec parser for one abstract base type.
pub struct Factory<B: Constructible + ?Sized + 'static> {
    base_name: String,
    ctors: FxHashMap<String, Ctor<B>>,
}

impl<B: Constructible + ?Sized + 'static> Factory<B> {
    pub(crate) fn new(base_name: &str) -> Self {
        Factory {
            base_name: base_name.to_owned(),
            ctors: FxHashMap::default(),
        }
    }

    /// The name of the base type this factory constructs.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Register a concrete type under `name`.
    ///
    /// Registration is idempotent: the first registration of a name wins
    /// and later ones are silently ignored, so enumeration never changes
    /// behind an embedder's back.
    pub fn register(&mut self, name: &str, ctor: impl Fn() -> Shared<B> + 'static) {
        if self.ctors.contains_key(name) {
            debug!(base = %self.base_name, concrete = name, "ignoring duplicate registration");
            return;
        }
        debug!(base = %self.base_name, concrete = name, "registered concrete type");
        self.ctors.insert(name.to_owned(), Box::new(ctor));
    }

    /// Whether `name` is registered with this factory.
    pub fn is_registered(&self, name: &str) -> bool {
        self.ctors.contains_key(name)
    }

    /// The registered concrete names, sorted.
    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ctors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Parse a specification expression and construct the object.
    ///
    /// Grammar:
    ///
    /// ```text
    /// spec_or_null := 'NULL' | 'nullptr' | spec
    /// spec         := IDENT '(' [ slot_init (',' slot_init)* [','] ] ')'
    /// slot_init    := IDENT '(' value ')'
    /// ```
    ///
    /// Member initializers run in source order inside a scoped copy of
    /// `env`, so earlier members' temporaries are visible to later ones
    /// but nothing written during construction leaks into the caller.
    pub fn create(
        &self,
        cursor: &mut Cursor<'_>,
        env: &Environment,
    ) -> EvalResult<SharedObject<B>> {
        let start = cursor.current_span().start;
        if cursor.current_kind().is_null() {
            cursor.advance()?;
            return Ok(SharedObject::null());
        }

        let (type_name, type_span) = cursor.expect_ident("a type name")?;
        let type_str = cursor.interner().lookup(type_name);
        let ctor = self
            .ctors
            .get(type_str)
            .ok_or_else(|| errors::unknown_type(&self.base_name, type_str, type_span))?;
        cursor.expect(TokenKind::LParen, "'('")?;

        debug!(base = %self.base_name, concrete = type_str, "constructing instance");
        let instance = ctor();
        let mut slots = Initializers::new(env.runtime());
        instance.borrow_mut().register_initializers(&mut slots);
        if let Some(err) = slots.take_error() {
            return Err(err);
        }

        // Temporaries defined during construction stay in this copy.
        let mut scoped = env.copy();

        while cursor.current_kind() != TokenKind::RParen {
            let (member, member_span) = cursor.expect_ident("a member name")?;
            let member_str = cursor.interner().lookup(member);
            let idx = slots.index_of(member).ok_or_else(|| {
                errors::unknown_member(&self.base_name, type_str, member_str, member_span)
            })?;
            trace!(member = member_str, "initializing member");

            cursor.expect(TokenKind::LParen, "'('")?;
            let tag = slots.tag_of(idx).clone();
            scoped.read_and_set(member, cursor, tag)?;
            {
                let mut guard = instance.borrow_mut();
                let any_mut: &mut dyn Any = (&mut *guard).as_any_mut();
                slots.apply(idx, any_mut, &scoped)?;
            }
            cursor.expect(TokenKind::RParen, "')'")?;

            match cursor.current_kind() {
                TokenKind::Comma => {
                    cursor.advance()?;
                }
                TokenKind::RParen => {}
                _ => return Err(cursor.unexpected("',' or ')'")),
            }
        }
        let close = cursor.expect(TokenKind::RParen, "')'")?;

        slots.check_required(&self.base_name, type_str, close.span)?;

        let init_str = cursor.slice(Span::new(start, close.span.end));
        instance.borrow_mut().post_init(&scoped, init_str)?;

        Ok(SharedObject::new(instance))
    }
}

/// Type-erased factory interface for the runtime's registry container.
pub(crate) trait FactoryOps {
    fn base_name(&self) -> &str;
    fn registered(&self) -> Vec<String>;
    fn is_registered(&self, name: &str) -> bool;
    /// The environment's store for values of this base.
    fn make_store(&self) -> Box<dyn VarStore>;
    /// The environment's store for vectors of this base.
    fn make_vector_store(&self) -> Box<dyn VarStore>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<B: Constructible + ?Sized + 'static> FactoryOps for Factory<B> {
    fn base_name(&self) -> &str {
        &self.base_name
    }

    fn registered(&self) -> Vec<String> {
        Factory::registered(self)
    }

    fn is_registered(&self, name: &str) -> bool {
        Factory::is_registered(self, name)
    }

    fn make_store(&self) -> Box<dyn VarStore> {
        let tag = TypeTag::new(&self.base_name);
        Box::new(VarMap::<SharedObject<B>>::new(tag, false))
    }

    fn make_vector_store(&self) -> Box<dyn VarStore> {
        let tag = TypeTag::new(&self.base_name).vector_of();
        Box::new(VarMap::<Vec<SharedObject<B>>>::new(tag, false))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Widget {
        label: String,
    }

    impl Constructible for Widget {
        fn register_initializers(&mut self, slots: &mut Initializers<'_>) {
            slots.add_required("label", |w: &mut Widget, v| w.label = v);
            slots.add_temporary::<i64>("scratch");
        }
    }

    #[test]
    fn test_schema_records_slots_in_order() {
        let runtime = Runtime::new();
        let mut slots = Initializers::new(&runtime);
        Widget::default().register_initializers(&mut slots);

        assert!(slots.take_error().is_none());
        assert_eq!(slots.slots.len(), 2);
        assert!(slots.slots[0].required);
        assert!(slots.slots[0].apply.is_some());
        assert!(!slots.slots[1].required);
        assert!(slots.slots[1].apply.is_none());
    }

    #[test]
    fn test_duplicate_slot_name_is_fatal() {
        let runtime = Runtime::new();
        let mut slots = Initializers::new(&runtime);
        slots.add("x", |w: &mut Widget, v: i64| w.label = v.to_string());
        slots.add_temporary::<bool>("x");

        let err = slots.take_error().unwrap();
        assert_eq!(err.kind, crate::ErrorKind::DuplicateMember);
    }

    #[test]
    fn test_object_slot_without_factory_is_fatal() {
        trait Missing: Constructible {}
        let runtime = Runtime::new();
        let mut slots = Initializers::new(&runtime);
        slots.add_temporary::<SharedObject<dyn Missing>>("gadget");

        let err = slots.take_error().unwrap();
        assert_eq!(err.kind, crate::ErrorKind::UnknownType);
    }

    #[test]
    fn test_first_registration_wins() {
        trait Base: Constructible {}
        #[derive(Default)]
        struct First;
        impl Constructible for First {}
        impl Base for First {}

        let mut factory = Factory::<dyn Base>::new("Base");
        factory.register("Only", || crate::shared(First));
        factory.register("Only", || panic!("second registration must be ignored"));

        assert_eq!(factory.registered(), ["Only"]);
        let ctor = factory.ctors.get("Only").unwrap();
        let _ = ctor(); // does not panic
    }
}
