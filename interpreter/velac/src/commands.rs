//! CLI command implementations.

use vela_eval::{Interpreter, Runtime};
use vela_ir::TokenKind;
use vela_lexer::lex;

/// Evaluate a script file; optionally dump the resulting environment.
pub fn run_file(path: &str, dump_env: bool) {
    let mut interp = Interpreter::new(Runtime::new());
    if let Err(err) = interp.eval_file(path) {
        eprintln!("{path}: {err}");
        std::process::exit(1);
    }
    if dump_env {
        let mut out = String::new();
        if interp.print_env(&mut out).is_ok() {
            print!("{out}");
        }
    }
}

/// Tokenize a script file and list the tokens.
pub fn lex_file(path: &str) {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{path}: cannot read: {err}");
            std::process::exit(1);
        }
    };

    let runtime = Runtime::new();
    let tokens = lex(&source, runtime.interner());
    for token in &tokens {
        if token.kind == TokenKind::Eof {
            break;
        }
        println!(
            "token: \"{}\"; type={}; start={}",
            token.text(runtime.interner()),
            token.kind.category(),
            token.span.start
        );
    }
    println!("{} tokens", tokens.len() - 1);
}

/// Print the registered factories.
///
/// The stock binary registers no object types, so this lists none; it is
/// here for embedders who build their own driver on top of this one.
pub fn print_factories() {
    let interp = Interpreter::new(Runtime::new());
    let mut out = String::new();
    if interp.print_factories(&mut out).is_ok() {
        print!("{out}");
    }
}
