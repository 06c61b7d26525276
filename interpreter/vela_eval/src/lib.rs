//! Vela Eval - Evaluator and object factory runtime for Vela.
//!
//! Vela is a small declarative configuration language for instantiating
//! trees of user-defined objects and binding them to named variables.
//! This crate provides everything above the lexer:
//!
//! - [`Runtime`]: the registry container holding one [`Factory`] per
//!   abstract base type
//! - [`Factory`] / [`Constructible`] / [`Initializers`]: the typed object
//!   factory, its per-type parameter schemas, and the
//!   specification-expression parser
//! - [`Environment`]: typed variable bindings with copy-on-entry scoping
//!   and type inference
//! - [`Interpreter`]: the top-level statement loop and host retrieval API
//! - [`errors`]: the fatal-error taxonomy shared by all of the above
//!
//! # Embedding
//!
//! ```ignore
//! let mut runtime = Runtime::new();
//! runtime
//!     .factory::<dyn Model>("Model")
//!     .register("PerceptronModel", || shared(PerceptronModel::default()));
//!
//! let mut interp = Interpreter::new(runtime);
//! interp.eval_str(r#"Model m = PerceptronModel(name("demo"));"#)?;
//! let model: SharedObject<dyn Model> = interp.get("m").unwrap();
//! ```

mod cursor;
mod environment;
pub mod errors;
mod factory;
mod interpreter;
mod runtime;
mod store;
mod value;

pub use cursor::Cursor;
pub use environment::Environment;
pub use errors::{ErrorKind, EvalError, EvalResult};
pub use factory::{AsAny, Constructible, Factory, Initializers};
pub use interpreter::Interpreter;
pub use runtime::Runtime;
pub use value::{shared, ScriptValue, Shared, SharedObject};
