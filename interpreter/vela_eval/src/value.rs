//! Script value types and conversions.
//!
//! [`ScriptValue`] is the bridge between script-level values and Rust
//! types: it names the canonical type tag for a Rust type, knows how to
//! read one value of that type from the token stream, and can render the
//! value back as a literal for environment dumps. It is implemented for
//! the four primitives, for [`SharedObject`] handles to factory bases, and
//! for vectors of all of those.

use std::cell::RefCell;
use std::rc::Rc;

use vela_ir::{TokenKind, TypeTag, BOOL, DOUBLE, INT, STRING};

use crate::cursor::Cursor;
use crate::environment::Environment;
use crate::errors::{self, EvalResult};
use crate::factory::Constructible;
use crate::runtime::Runtime;

/// Shared mutable handle to a constructed object.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wrap a value in a [`Shared`] handle.
///
/// The usual way to write a constructor closure for registration:
/// `factory.register("Cow", || shared(Cow::default()))`.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Nullable shared-ownership handle to an object of abstract base `B`.
///
/// Objects constructed from specs are shared: the same instance may be a
/// member of several constructed objects and bound to a variable at the
/// same time; its lifetime equals the longest-living holder. `nullptr` and
/// `NULL` in scripts produce the null handle.
pub struct SharedObject<B: ?Sized>(Option<Shared<B>>);

impl<B: ?Sized> SharedObject<B> {
    /// Wrap a live object.
    pub fn new(inner: Shared<B>) -> Self {
        SharedObject(Some(inner))
    }

    /// The null handle.
    pub fn null() -> Self {
        SharedObject(None)
    }

    /// Check whether this handle is null.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// The underlying shared handle, unless null.
    #[inline]
    pub fn get(&self) -> Option<&Shared<B>> {
        self.0.as_ref()
    }

    /// Immutably borrow the object, unless null.
    pub fn borrow(&self) -> Option<std::cell::Ref<'_, B>> {
        self.0.as_ref().map(|inner| inner.borrow())
    }

    /// Check whether two handles point at the same object (null handles
    /// compare equal to each other).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<B: ?Sized> Clone for SharedObject<B> {
    fn clone(&self) -> Self {
        SharedObject(self.0.clone())
    }
}

/// The default handle is null, so object-valued members need no explicit
/// initialization in their type's `Default`.
impl<B: ?Sized> Default for SharedObject<B> {
    fn default() -> Self {
        SharedObject::null()
    }
}

impl<B: ?Sized> From<Shared<B>> for SharedObject<B> {
    fn from(inner: Shared<B>) -> Self {
        SharedObject::new(inner)
    }
}

/// A Rust type that can hold a script value.
pub trait ScriptValue: Clone + 'static {
    /// The canonical type tag for this type.
    ///
    /// Primitives have fixed tags; object handles ask the runtime for the
    /// base name their factory was created with, which fails if no factory
    /// exists for `B`.
    fn type_tag(runtime: &Runtime) -> EvalResult<TypeTag>;

    /// Read one value of this type from the token stream.
    ///
    /// In any value position an identifier *not* followed by `(` is a
    /// variable reference, resolved against `env` with an exact type
    /// match.
    fn read(cursor: &mut Cursor<'_>, env: &Environment) -> EvalResult<Self>;

    /// Render this value as a script literal (used by environment dumps;
    /// object handles render as opaque placeholders).
    fn literal(&self) -> String;
}

/// Resolve an identifier in value position as a variable reference.
fn read_variable<T: ScriptValue>(cursor: &mut Cursor<'_>, env: &Environment) -> EvalResult<T> {
    let (name, span) = cursor.expect_ident("a variable name")?;
    let text = cursor.interner().lookup(name);
    if !env.defined(name) {
        return Err(errors::undefined_variable(text, span));
    }
    if let Some(value) = env.get_named::<T>(name) {
        return Ok(value);
    }
    let expected = T::type_tag(env.runtime())?;
    Err(errors::variable_type_mismatch(
        text,
        &expected,
        env.type_of(name),
        span,
    ))
}

impl ScriptValue for bool {
    fn type_tag(_runtime: &Runtime) -> EvalResult<TypeTag> {
        Ok(TypeTag::new(BOOL))
    }

    fn read(cursor: &mut Cursor<'_>, env: &Environment) -> EvalResult<Self> {
        match cursor.current_kind() {
            TokenKind::True => {
                cursor.advance()?;
                Ok(true)
            }
            TokenKind::False => {
                cursor.advance()?;
                Ok(false)
            }
            TokenKind::Ident(_) => read_variable(cursor, env),
            _ => Err(errors::unexpected_value(
                BOOL,
                &cursor.describe_current(),
                cursor.current_span(),
            )),
        }
    }

    fn literal(&self) -> String {
        self.to_string()
    }
}

impl ScriptValue for i64 {
    fn type_tag(_runtime: &Runtime) -> EvalResult<TypeTag> {
        Ok(TypeTag::new(INT))
    }

    fn read(cursor: &mut Cursor<'_>, env: &Environment) -> EvalResult<Self> {
        match cursor.current_kind() {
            TokenKind::Number(name) => {
                let token = cursor.advance()?;
                let text = cursor.interner().lookup(name);
                if vela_lexer::is_double_literal(text) {
                    return Err(errors::unexpected_value(
                        INT,
                        &format!("double literal \"{text}\""),
                        token.span,
                    ));
                }
                vela_lexer::parse_int(text)
                    .ok_or_else(|| errors::invalid_number(text, INT, token.span))
            }
            TokenKind::Ident(_) => read_variable(cursor, env),
            _ => Err(errors::unexpected_value(
                INT,
                &cursor.describe_current(),
                cursor.current_span(),
            )),
        }
    }

    fn literal(&self) -> String {
        self.to_string()
    }
}

impl ScriptValue for f64 {
    fn type_tag(_runtime: &Runtime) -> EvalResult<TypeTag> {
        Ok(TypeTag::new(DOUBLE))
    }

    fn read(cursor: &mut Cursor<'_>, env: &Environment) -> EvalResult<Self> {
        match cursor.current_kind() {
            // An integer literal is a fine double.
            TokenKind::Number(name) => {
                let token = cursor.advance()?;
                let text = cursor.interner().lookup(name);
                vela_lexer::parse_double(text)
                    .ok_or_else(|| errors::invalid_number(text, DOUBLE, token.span))
            }
            TokenKind::Ident(_) => read_variable(cursor, env),
            _ => Err(errors::unexpected_value(
                DOUBLE,
                &cursor.describe_current(),
                cursor.current_span(),
            )),
        }
    }

    fn literal(&self) -> String {
        // `{:?}` keeps a `.0` on round values so the text re-infers as
        // double rather than int.
        format!("{self:?}")
    }
}

impl ScriptValue for String {
    fn type_tag(_runtime: &Runtime) -> EvalResult<TypeTag> {
        Ok(TypeTag::new(STRING))
    }

    fn read(cursor: &mut Cursor<'_>, env: &Environment) -> EvalResult<Self> {
        match cursor.current_kind() {
            TokenKind::Str(name) => {
                cursor.advance()?;
                Ok(cursor.interner().lookup(name).to_owned())
            }
            TokenKind::Ident(_) => read_variable(cursor, env),
            _ => Err(errors::unexpected_value(
                STRING,
                &cursor.describe_current(),
                cursor.current_span(),
            )),
        }
    }

    fn literal(&self) -> String {
        vela_lexer::quote(self)
    }
}

impl<T: ScriptValue> ScriptValue for Vec<T> {
    fn type_tag(runtime: &Runtime) -> EvalResult<TypeTag> {
        Ok(T::type_tag(runtime)?.vector_of())
    }

    fn read(cursor: &mut Cursor<'_>, env: &Environment) -> EvalResult<Self> {
        match cursor.current_kind() {
            TokenKind::LBrace => {
                cursor.advance()?;
                let mut items = Vec::new();
                loop {
                    if cursor.current_kind() == TokenKind::RBrace {
                        cursor.advance()?;
                        break;
                    }
                    items.push(T::read(cursor, env)?);
                    match cursor.current_kind() {
                        // Trailing commas are allowed.
                        TokenKind::Comma => {
                            cursor.advance()?;
                        }
                        TokenKind::RBrace => {
                            cursor.advance()?;
                            break;
                        }
                        _ => return Err(cursor.unexpected("',' or '}'")),
                    }
                }
                Ok(items)
            }
            TokenKind::Ident(_) if cursor.peek_next_kind() != TokenKind::LParen => {
                read_variable(cursor, env)
            }
            _ => Err(errors::unexpected_value(
                "a vector (starting with '{')",
                &cursor.describe_current(),
                cursor.current_span(),
            )),
        }
    }

    fn literal(&self) -> String {
        let items: Vec<String> = self.iter().map(ScriptValue::literal).collect();
        format!("{{{}}}", items.join(", "))
    }
}

impl<B> ScriptValue for SharedObject<B>
where
    B: Constructible + ?Sized + 'static,
{
    fn type_tag(runtime: &Runtime) -> EvalResult<TypeTag> {
        runtime.base_tag::<B>()
    }

    fn read(cursor: &mut Cursor<'_>, env: &Environment) -> EvalResult<Self> {
        match cursor.current_kind() {
            kind if kind.is_null() => {
                cursor.advance()?;
                Ok(SharedObject::null())
            }
            TokenKind::Ident(_) if cursor.peek_next_kind() == TokenKind::LParen => {
                env.runtime().factory_of::<B>()?.create(cursor, env)
            }
            TokenKind::Ident(_) => read_variable(cursor, env),
            _ => Err(errors::unexpected_value(
                "a specification or nullptr",
                &cursor.describe_current(),
                cursor.current_span(),
            )),
        }
    }

    fn literal(&self) -> String {
        if self.is_null() {
            "nullptr".to_owned()
        } else {
            "<object>".to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_object_null() {
        trait Thing: Constructible {}
        let null = SharedObject::<dyn Thing>::null();
        assert!(null.is_null());
        assert!(null.get().is_none());
        assert!(null.ptr_eq(&SharedObject::null()));
        assert_eq!(null.literal(), "nullptr");
    }

    #[test]
    fn test_shared_object_ptr_eq() {
        struct Plain(i64);
        impl Constructible for Plain {}

        let a = SharedObject::new(shared(Plain(1)));
        let b = a.clone();
        let c = SharedObject::new(shared(Plain(1)));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert!(!a.ptr_eq(&SharedObject::null()));
    }

    #[test]
    fn test_primitive_literals() {
        assert_eq!(true.literal(), "true");
        assert_eq!(42_i64.literal(), "42");
        assert_eq!(25.0_f64.literal(), "25.0");
        assert_eq!("hi \"there\"".to_owned().literal(), r#""hi \"there\"""#);
        assert_eq!(vec![1_i64, 2, 3].literal(), "{1, 2, 3}");
    }
}
