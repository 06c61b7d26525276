//! Typed variable environment.
//!
//! The environment pairs a map from variable names to canonical type tags
//! with one typed store per tag. All stores are created up front: the four
//! primitives and their vectors always exist, and each registered factory
//! contributes an object store and an object-vector store. A third map
//! redirects lookups for variables declared with a *concrete* registered
//! type name to their abstract base's store.
//!
//! Nested construction copies the environment (copy-on-entry scoping):
//! reads inside the copy see everything the original had, while writes —
//! in particular schema temporaries — stay in the copy.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, error};
use vela_ir::{Name, TokenKind, TypeTag, BOOL, DOUBLE, INT, STRING};

use crate::cursor::Cursor;
use crate::errors::{self, EvalResult};
use crate::runtime::Runtime;
use crate::store::{VarMap, VarStore};
use crate::value::ScriptValue;

/// A set of named variables with their types and values.
pub struct Environment {
    runtime: Rc<Runtime>,
    /// Declared or inferred canonical type of each variable.
    types: FxHashMap<Name, TypeTag>,
    /// One typed store per canonical type tag.
    stores: FxHashMap<TypeTag, Box<dyn VarStore>>,
    /// Concrete registered type name -> abstract base name.
    concrete_to_abstract: FxHashMap<String, String>,
}

fn insert_primitive<T: ScriptValue>(
    stores: &mut FxHashMap<TypeTag, Box<dyn VarStore>>,
    name: &str,
) {
    let tag = TypeTag::new(name);
    let vector = tag.vector_of();
    stores.insert(
        vector.clone(),
        Box::new(VarMap::<Vec<T>>::new(vector, true)),
    );
    stores.insert(tag.clone(), Box::new(VarMap::<T>::new(tag, true)));
}

impl Environment {
    /// Create an empty environment with stores for every primitive type
    /// and every base registered with the runtime.
    pub fn new(runtime: Rc<Runtime>) -> Self {
        let mut stores: FxHashMap<TypeTag, Box<dyn VarStore>> = FxHashMap::default();
        insert_primitive::<bool>(&mut stores, BOOL);
        insert_primitive::<i64>(&mut stores, INT);
        insert_primitive::<f64>(&mut stores, DOUBLE);
        insert_primitive::<String>(&mut stores, STRING);
        for ops in runtime.ops() {
            let store = ops.make_store();
            stores.insert(store.tag().clone(), store);
            let vector_store = ops.make_vector_store();
            stores.insert(vector_store.tag().clone(), vector_store);
        }
        let concrete_to_abstract = runtime.concrete_map();
        Environment {
            runtime,
            types: FxHashMap::default(),
            stores,
            concrete_to_abstract,
        }
    }

    /// The runtime this environment resolves factories against.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Whether the variable is defined.
    pub fn defined(&self, name: Name) -> bool {
        self.types.contains_key(&name)
    }

    /// The declared or inferred type of a variable, if defined.
    pub fn type_of(&self, name: Name) -> Option<&TypeTag> {
        self.types.get(&name)
    }

    /// Map a declared tag to the tag its store lives under: concrete
    /// registered type names resolve to their abstract base (vector
    /// suffixes are preserved).
    fn resolve(&self, tag: &TypeTag) -> TypeTag {
        if self.stores.contains_key(tag) {
            return tag.clone();
        }
        if let Some(base) = self.concrete_to_abstract.get(tag.base()) {
            let resolved = TypeTag::new(base);
            return if tag.is_vector() {
                resolved.vector_of()
            } else {
                resolved
            };
        }
        tag.clone()
    }

    /// Parse one value of type `tag` from the token stream and bind it to
    /// `name`, recording the tag as the variable's type.
    ///
    /// Parsing borrows this environment immutably, so variable references
    /// on the right-hand side resolve against the pre-assignment state;
    /// the store write happens once the value is fully built.
    pub fn read_and_set(
        &mut self,
        name: Name,
        cursor: &mut Cursor<'_>,
        tag: TypeTag,
    ) -> EvalResult<()> {
        let varname = self.runtime.interner().lookup(name);
        if let Some(existing) = self.types.get(&name) {
            if self.resolve(existing) != self.resolve(&tag) {
                return Err(errors::reassignment_type_mismatch(
                    varname,
                    existing,
                    &tag,
                    cursor.current_span(),
                ));
            }
        }
        debug!(var = varname, %tag, "read_and_set");

        let lookup = self.resolve(&tag);
        let Some(store) = self.stores.get(&lookup) else {
            return Err(errors::unknown_type_name(&tag, cursor.current_span()));
        };
        let value = store.read_value(cursor, self)?;

        match self.stores.get_mut(&lookup) {
            Some(store) => store.set_boxed(name, value)?,
            None => return Err(errors::inconsistency("store vanished during read")),
        }
        self.types.insert(name, tag);
        Ok(())
    }

    /// Typed retrieval by interned name.
    ///
    /// `None` when the variable is undefined or `T` does not match its
    /// stored type. The narrowing is a checked downcast; it never aborts.
    pub fn get_named<T: ScriptValue>(&self, name: Name) -> Option<T> {
        let tag = self.types.get(&name)?;
        let lookup = self.resolve(tag);
        let Some(store) = self.stores.get(&lookup) else {
            error!(%tag, "environment types and stores disagree");
            debug_assert!(false, "no store for declared type {tag}");
            return None;
        };
        let typed = store.as_any().downcast_ref::<VarMap<T>>()?;
        let value = typed.get(name);
        if value.is_none() {
            error!(
                var = self.runtime.interner().lookup(name),
                %tag,
                "variable typed but missing from its store"
            );
            debug_assert!(false, "types and stores disagree");
        }
        value
    }

    /// Typed retrieval by name text.
    pub fn get<T: ScriptValue>(&self, name: &str) -> Option<T> {
        self.get_named(self.runtime.interner().intern(name))
    }

    /// Deep-copy this environment.
    ///
    /// The copy sees every variable the original had; subsequent writes on
    /// either side are invisible to the other. Object values stay shared.
    pub fn copy(&self) -> Environment {
        Environment {
            runtime: Rc::clone(&self.runtime),
            types: self.types.clone(),
            stores: self
                .stores
                .iter()
                .map(|(tag, store)| (tag.clone(), store.clone_store()))
                .collect(),
            concrete_to_abstract: self.concrete_to_abstract.clone(),
        }
    }

    /// Infer the type of the value starting at the cursor, without
    /// consuming anything.
    ///
    /// Returns the tag and whether it denotes factory-constructed objects.
    /// `varname` is the variable being assigned, used in diagnostics.
    pub fn infer_type(&self, varname: &str, cursor: &Cursor<'_>) -> EvalResult<(TypeTag, bool)> {
        let tag = self.infer_at(varname, cursor, 0)?;
        let is_object = !tag.is_primitive();
        Ok((tag, is_object))
    }

    fn infer_at(&self, varname: &str, cursor: &Cursor<'_>, offset: usize) -> EvalResult<TypeTag> {
        let token = cursor.peek_token_at(offset);
        match token.kind {
            TokenKind::True | TokenKind::False => Ok(TypeTag::new(BOOL)),
            TokenKind::Str(_) => Ok(TypeTag::new(STRING)),
            TokenKind::Number(name) => {
                let text = cursor.interner().lookup(name);
                if vela_lexer::is_double_literal(text) {
                    Ok(TypeTag::new(DOUBLE))
                } else {
                    Ok(TypeTag::new(INT))
                }
            }
            TokenKind::Ident(name) => {
                let text = cursor.interner().lookup(name);
                if cursor.peek_kind_at(offset + 1) == TokenKind::LParen {
                    // A spec: the tag is the concrete type's abstract base.
                    match self.runtime.base_for_concrete(text)? {
                        Some(base) => Ok(TypeTag::new(base)),
                        None => Err(errors::unknown_concrete(text, token.span)),
                    }
                } else {
                    match self.type_of(name) {
                        Some(tag) => Ok(tag.clone()),
                        None => Err(errors::undefined_variable(text, token.span)),
                    }
                }
            }
            TokenKind::LBrace => {
                if cursor.peek_kind_at(offset + 1) == TokenKind::RBrace {
                    return Err(errors::uninferrable_empty_vector(varname, token.span));
                }
                Ok(self.infer_at(varname, cursor, offset + 1)?.vector_of())
            }
            TokenKind::Nullptr | TokenKind::Null => Err(errors::unexpected_token(
                "a value with an inferrable type",
                "a null spec",
                token.span,
            )),
            TokenKind::Error => Err(errors::lex_error(cursor.slice(token.span), token.span)),
            TokenKind::Eof => Err(errors::unexpected_eof("a value", token.span)),
            _ => Err(errors::unexpected_token(
                "a value",
                token.kind.category(),
                token.span,
            )),
        }
    }

    /// Dump every binding, grouped by store.
    ///
    /// Primitive bindings print first as re-parseable statements; object
    /// bindings follow as comments. Stores are ordered by tag so the
    /// output is deterministic.
    pub fn print(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let mut stores: Vec<&dyn VarStore> = self.stores.values().map(|s| s.as_ref()).collect();
        stores.sort_by_key(|store| (!store.is_primitive(), store.tag().as_str()));
        for store in stores {
            store.print(self.runtime.interner(), out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_lexer::lex;

    fn new_env() -> (Rc<Runtime>, Environment) {
        let runtime = Rc::new(Runtime::new());
        (Rc::clone(&runtime), Environment::new(runtime))
    }

    /// Bind `name` to the first value in `source`, with type `tag`.
    ///
    /// The runtime handle is passed separately so the cursor's interner
    /// borrow does not pin `env` while `read_and_set` mutates it.
    fn bind(
        runtime: &Runtime,
        env: &mut Environment,
        name: &str,
        tag: &str,
        source: &str,
    ) -> EvalResult<()> {
        let tokens = lex(source, runtime.interner());
        let name = runtime.interner().intern(name);
        let mut cursor = Cursor::new(&tokens, source, runtime.interner());
        env.read_and_set(name, &mut cursor, TypeTag::new(tag))
    }

    #[test]
    fn test_read_and_set_then_get() {
        let (rt, mut env) = new_env();
        bind(&rt, &mut env, "n", INT, "42").unwrap();

        assert_eq!(env.get::<i64>("n"), Some(42));
        let name = rt.interner().intern("n");
        assert!(env.defined(name));
        assert_eq!(env.type_of(name), Some(&TypeTag::new(INT)));
    }

    #[test]
    fn test_get_with_wrong_type_returns_none() {
        let (rt, mut env) = new_env();
        bind(&rt, &mut env, "n", INT, "42").unwrap();

        assert_eq!(env.get::<bool>("n"), None);
        assert_eq!(env.get::<String>("n"), None);
        assert_eq!(env.get::<i64>("missing"), None);
    }

    #[test]
    fn test_variable_reference_on_rhs() {
        let (rt, mut env) = new_env();
        bind(&rt, &mut env, "n", INT, "42").unwrap();
        bind(&rt, &mut env, "m", INT, "n").unwrap();

        assert_eq!(env.get::<i64>("m"), Some(42));
    }

    #[test]
    fn test_undefined_reference_is_fatal() {
        let (rt, mut env) = new_env();
        let err = bind(&rt, &mut env, "m", INT, "nope").unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Undefined);
    }

    #[test]
    fn test_reference_with_wrong_type_is_fatal() {
        let (rt, mut env) = new_env();
        bind(&rt, &mut env, "s", STRING, "\"hi\"").unwrap();
        let err = bind(&rt, &mut env, "n", INT, "s").unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_same_type_reassignment_overwrites() {
        let (rt, mut env) = new_env();
        bind(&rt, &mut env, "n", INT, "1").unwrap();
        bind(&rt, &mut env, "n", INT, "2").unwrap();
        assert_eq!(env.get::<i64>("n"), Some(2));
    }

    #[test]
    fn test_changing_type_on_reassignment_is_fatal() {
        let (rt, mut env) = new_env();
        bind(&rt, &mut env, "n", INT, "1").unwrap();
        let err = bind(&rt, &mut env, "n", STRING, "\"two\"").unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_copy_is_independent_both_ways() {
        let (rt, mut env) = new_env();
        bind(&rt, &mut env, "n", INT, "1").unwrap();

        let mut copy = env.copy();
        assert_eq!(copy.get::<i64>("n"), Some(1));

        bind(&rt, &mut copy, "m", INT, "2").unwrap();
        bind(&rt, &mut env, "n", INT, "3").unwrap();

        assert_eq!(env.get::<i64>("m"), None);
        assert_eq!(copy.get::<i64>("n"), Some(1));
        assert_eq!(env.get::<i64>("n"), Some(3));
    }

    #[test]
    fn test_vector_read() {
        let (rt, mut env) = new_env();
        bind(&rt, &mut env, "xs", "int[]", "{1, 2, 3,}").unwrap();
        assert_eq!(env.get::<Vec<i64>>("xs"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_infer_primitives() {
        let (rt, env) = new_env();

        for (source, expected) in [
            ("true", BOOL),
            ("false", BOOL),
            ("\"hi\"", STRING),
            ("42", INT),
            ("-7", INT),
            ("2.5", DOUBLE),
            ("2e1", DOUBLE),
        ] {
            let tokens = lex(source, rt.interner());
            let cursor = Cursor::new(&tokens, source, rt.interner());
            let (tag, is_object) = env.infer_type("v", &cursor).unwrap();
            assert_eq!(tag, TypeTag::new(expected), "source: {source}");
            assert!(!is_object);
        }
    }

    #[test]
    fn test_infer_vector_elementwise() {
        let (rt, env) = new_env();
        let source = "{1.5, 2.5}";
        let tokens = lex(source, rt.interner());
        let cursor = Cursor::new(&tokens, source, rt.interner());

        let (tag, _) = env.infer_type("v", &cursor).unwrap();
        assert_eq!(tag.as_str(), "double[]");
        // Inference does not consume.
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_infer_empty_vector_fails() {
        let (rt, env) = new_env();
        let source = "{}";
        let tokens = lex(source, rt.interner());
        let cursor = Cursor::new(&tokens, source, rt.interner());

        let err = env.infer_type("v", &cursor).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Syntax);
    }

    #[test]
    fn test_infer_variable_reference() {
        let (rt, mut env) = new_env();
        bind(&rt, &mut env, "d", DOUBLE, "2.5").unwrap();

        let source = "d";
        let tokens = lex(source, rt.interner());
        let cursor = Cursor::new(&tokens, source, rt.interner());

        let (tag, _) = env.infer_type("v", &cursor).unwrap();
        assert_eq!(tag, TypeTag::new(DOUBLE));
    }

    #[test]
    fn test_infer_unknown_spec_type() {
        let (rt, env) = new_env();
        let source = "Mystery(x(1))";
        let tokens = lex(source, rt.interner());
        let cursor = Cursor::new(&tokens, source, rt.interner());

        let err = env.infer_type("v", &cursor).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::UnknownType);
    }

    #[test]
    fn test_print_round_trips_primitives() {
        let (rt, mut env) = new_env();
        bind(&rt, &mut env, "b", BOOL, "true").unwrap();
        bind(&rt, &mut env, "n", INT, "42").unwrap();
        bind(&rt, &mut env, "d", DOUBLE, "2.5e1").unwrap();
        bind(&rt, &mut env, "s", STRING, "\"hi\"").unwrap();
        bind(&rt, &mut env, "xs", "int[]", "{1, 2}").unwrap();

        let mut dump = String::new();
        env.print(&mut dump).unwrap();
        assert!(dump.contains("bool b = true;"));
        assert!(dump.contains("int n = 42;"));
        assert!(dump.contains("double d = 25.0;"));
        assert!(dump.contains("string s = \"hi\";"));
        assert!(dump.contains("int[] xs = {1, 2};"));
    }
}
