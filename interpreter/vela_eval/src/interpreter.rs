//! Top-level statement interpreter.
//!
//! Statements bind values to named variables:
//!
//! ```text
//! statement_list := statement*
//! statement      := [ type_specifier ] IDENT '=' value ';'
//! type_specifier := 'bool' | 'int' | 'double' | 'string'
//!                 | abstract_base_name | concrete_type_name
//!                 | any of the above followed by '[]'
//! ```
//!
//! The type specifier is optional; without one the interpreter infers the
//! type from the shape of the value. Previously bound variables are
//! visible while the right-hand side evaluates:
//!
//! ```text
//! // Build a model and reuse it inside a vector.
//! s = "shared name";
//! Model m1 = PerceptronModel(name(s));
//! m_vec = {m1, PerceptronModel(name("second"))};
//! ```

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use tracing::debug;
use vela_ir::{TokenKind, TypeTag, BOOL, DOUBLE, INT, STRING};
use vela_lexer::lex;

use crate::cursor::Cursor;
use crate::environment::Environment;
use crate::errors::{self, EvalResult};
use crate::runtime::Runtime;
use crate::value::ScriptValue;

/// Evaluates statements against an environment.
///
/// Construction consumes the [`Runtime`], fixing the set of registered
/// factories: register every concrete type before creating the
/// interpreter.
pub struct Interpreter {
    runtime: Rc<Runtime>,
    env: Environment,
    debug: u8,
}

impl Interpreter {
    /// Create an interpreter over the given runtime.
    pub fn new(runtime: Runtime) -> Self {
        Interpreter::with_debug(runtime, 0)
    }

    /// Create an interpreter that additionally emits per-statement
    /// `tracing` debug events when `debug` is greater than zero.
    pub fn with_debug(runtime: Runtime, debug: u8) -> Self {
        let runtime = Rc::new(runtime);
        let env = Environment::new(Rc::clone(&runtime));
        Interpreter {
            runtime,
            env,
            debug,
        }
    }

    /// The runtime backing this interpreter.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The interpreter's environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Evaluate all statements in a string.
    ///
    /// The first error aborts evaluation; bindings made by earlier
    /// statements remain in the environment.
    pub fn eval_str(&mut self, source: &str) -> EvalResult<()> {
        let runtime = Rc::clone(&self.runtime);
        let tokens = lex(source, runtime.interner());
        let mut cursor = Cursor::new(&tokens, source, runtime.interner());
        while cursor.current_kind() != TokenKind::Eof {
            statement(&mut self.env, &mut cursor, self.debug)?;
        }
        Ok(())
    }

    /// Evaluate all statements in a file.
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> EvalResult<()> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|err| errors::io_error(&path.display().to_string(), &err))?;
        self.eval_str(&source)
    }

    /// Evaluate all statements from a reader.
    pub fn eval_reader(&mut self, mut reader: impl Read) -> EvalResult<()> {
        let mut source = String::new();
        reader
            .read_to_string(&mut source)
            .map_err(|err| errors::io_error("input stream", &err))?;
        self.eval_str(&source)
    }

    /// Typed retrieval of a bound variable.
    ///
    /// `None` when the variable is undefined or `T` does not match its
    /// type in the environment.
    pub fn get<T: ScriptValue>(&self, name: &str) -> Option<T> {
        self.env.get(name)
    }

    /// Dump the environment (see [`Environment::print`]).
    pub fn print_env(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.env.print(out)
    }

    /// Dump every factory and its registered concrete types.
    pub fn print_factories(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.runtime.print_factories(out)
    }
}

/// Parse and execute one statement.
fn statement(env: &mut Environment, cursor: &mut Cursor<'_>, debug: u8) -> EvalResult<()> {
    let explicit = type_specifier(env, cursor)?;
    let (var_name, _) = cursor.expect_ident("a variable name")?;
    let var_text = cursor.interner().lookup(var_name);
    cursor.expect(TokenKind::Eq, "'='")?;

    let tag = match explicit {
        Some(tag) => tag,
        None => env.infer_type(var_text, cursor)?.0,
    };
    if debug > 0 {
        debug!(var = var_text, %tag, "evaluating statement");
    }

    env.read_and_set(var_name, cursor, tag)?;
    cursor.expect(TokenKind::Semi, "';'")?;
    Ok(())
}

/// Consume an explicit type specifier, if one is present.
///
/// A leading identifier is a specifier when it names a known type
/// (primitive, registered base, or registered concrete name), optionally
/// carries `[]`, and is followed by another identifier — otherwise it is
/// the variable name of an inferred statement and nothing is consumed.
fn type_specifier(env: &Environment, cursor: &mut Cursor<'_>) -> EvalResult<Option<TypeTag>> {
    let TokenKind::Ident(name) = cursor.current_kind() else {
        return Ok(None);
    };
    let text = cursor.interner().lookup(name);
    if !is_type_name(env.runtime(), text) {
        return Ok(None);
    }
    match cursor.peek_next_kind() {
        TokenKind::Ident(_) => {
            cursor.advance()?;
            Ok(Some(TypeTag::new(text)))
        }
        TokenKind::LBracket
            if cursor.peek_kind_at(2) == TokenKind::RBracket
                && matches!(cursor.peek_kind_at(3), TokenKind::Ident(_)) =>
        {
            cursor.advance()?;
            cursor.advance()?;
            cursor.advance()?;
            Ok(Some(TypeTag::new(text).vector_of()))
        }
        _ => Ok(None),
    }
}

fn is_type_name(runtime: &Runtime, text: &str) -> bool {
    matches!(text, BOOL | INT | DOUBLE | STRING)
        || runtime.has_base(text)
        || runtime.is_concrete(text)
}
