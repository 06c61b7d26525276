//! Error types for evaluation.
//!
//! Every failure during lexing, parsing, construction, or retrieval is an
//! [`EvalError`] carrying a kind from the fixed taxonomy, a message, and
//! (where known) the byte offset the tokenizer was at. Errors are fatal to
//! the current eval: nothing recovers locally, the first error surfaces to
//! the top-level caller, and bindings made by earlier statements remain.
//!
//! Constructors live here so messages stay in one place.

use std::fmt;

use vela_ir::{Span, TypeTag};

/// Result of an evaluation step.
pub type EvalResult<T> = Result<T, EvalError>;

/// Classification of evaluation failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unterminated string, unexpected character, or malformed number.
    Lex,
    /// Token does not match the grammar at the current position.
    Syntax,
    /// A spec names a concrete type not registered for the expected base,
    /// or a concrete name cannot be resolved to a single base.
    UnknownType,
    /// An initializer list names a slot not in the schema.
    UnknownMember,
    /// A schema defines two slots with the same name.
    DuplicateMember,
    /// A required slot was not initialized.
    MissingRequired,
    /// A stored type is incompatible with the expected type.
    TypeMismatch,
    /// Reference to a variable not in scope.
    Undefined,
    /// The environment's type map and stores disagree (indicates a bug).
    Inconsistency,
    /// Source input could not be read.
    Io,
}

impl ErrorKind {
    /// Human-readable label used in rendered diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Lex => "lex error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::UnknownType => "unknown type",
            ErrorKind::UnknownMember => "unknown member",
            ErrorKind::DuplicateMember => "duplicate member",
            ErrorKind::MissingRequired => "missing required member",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Undefined => "undefined variable",
            ErrorKind::Inconsistency => "internal inconsistency",
            ErrorKind::Io => "io error",
        }
    }
}

/// A fatal evaluation error.
#[derive(Clone, Debug)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    /// Source location, when the failure maps to a token.
    pub span: Option<Span>,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EvalError {
            kind,
            message: message.into(),
            span: None,
        }
    }

    /// Attach a source span to this error.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Byte offset of the failure, if known.
    pub fn offset(&self) -> Option<u32> {
        self.span.map(|s| s.start)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)?;
        if let Some(span) = self.span {
            write!(f, " (at byte {})", span.start)?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

// Lexing

/// Invalid input reached the evaluator (the lexer marked it and moved on).
#[cold]
pub fn lex_error(text: &str, span: Span) -> EvalError {
    EvalError::new(ErrorKind::Lex, format!("invalid input {text:?}")).with_span(span)
}

/// A number literal could not be parsed as its expected primitive type.
#[cold]
pub fn invalid_number(text: &str, expected: &str, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::Lex,
        format!("cannot parse number literal \"{text}\" as {expected}"),
    )
    .with_span(span)
}

// Grammar

/// The current token does not match the grammar.
#[cold]
pub fn unexpected_token(expected: &str, found: &str, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::Syntax,
        format!("expected {expected} but found {found}"),
    )
    .with_span(span)
}

/// Input ended in the middle of a statement.
#[cold]
pub fn unexpected_eof(expected: &str, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::Syntax,
        format!("expected {expected} but reached end of input"),
    )
    .with_span(span)
}

/// An empty vector literal gives inference nothing to work with.
#[cold]
pub fn uninferrable_empty_vector(varname: &str, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::Syntax,
        format!("cannot infer the element type of the empty vector assigned to \"{varname}\""),
    )
    .with_span(span)
}

// Types and registries

/// A spec named a concrete type the factory does not know.
#[cold]
pub fn unknown_type(base: &str, concrete: &str, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::UnknownType,
        format!("no type \"{concrete}\" is registered for base {base}"),
    )
    .with_span(span)
}

/// A concrete name is not registered with any factory.
#[cold]
pub fn unknown_concrete(concrete: &str, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::UnknownType,
        format!("\"{concrete}\" is not registered with any factory"),
    )
    .with_span(span)
}

/// A concrete name is registered with more than one factory.
#[cold]
pub fn ambiguous_concrete(concrete: &str, bases: &[String]) -> EvalError {
    EvalError::new(
        ErrorKind::UnknownType,
        format!(
            "\"{concrete}\" is registered with more than one factory: {}",
            bases.join(", ")
        ),
    )
}

/// A tag reached the environment that no store was built for.
#[cold]
pub fn unknown_type_name(tag: &TypeTag, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::UnknownType,
        format!("\"{tag}\" names no primitive or registered base type"),
    )
    .with_span(span)
}

/// A base trait was used before any factory was created for it.
#[cold]
pub fn base_not_registered(detail: &str) -> EvalError {
    EvalError::new(
        ErrorKind::UnknownType,
        format!("no factory exists for base type {detail}"),
    )
}

// Schemas

/// An initializer list named a slot the schema does not have.
#[cold]
pub fn unknown_member(base: &str, concrete: &str, member: &str, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::UnknownMember,
        format!("unknown member name \"{member}\" in initializer list for {base} type {concrete}"),
    )
    .with_span(span)
}

/// A schema registered two slots with the same name.
#[cold]
pub fn duplicate_member(member: &str) -> EvalError {
    EvalError::new(
        ErrorKind::DuplicateMember,
        format!("two members are registered with the same name \"{member}\""),
    )
}

/// A required slot was never initialized.
#[cold]
pub fn missing_required(base: &str, concrete: &str, member: &str, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::MissingRequired,
        format!(
            "initialization for member \"{member}\" of {base} type {concrete} \
             is required but was not found"
        ),
    )
    .with_span(span)
}

// Variables

/// Reference to a variable that is not in scope.
#[cold]
pub fn undefined_variable(varname: &str, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::Undefined,
        format!("variable \"{varname}\" is not defined"),
    )
    .with_span(span)
}

/// A variable reference resolved to a value of the wrong type.
#[cold]
pub fn variable_type_mismatch(
    varname: &str,
    expected: &TypeTag,
    found: Option<&TypeTag>,
    span: Span,
) -> EvalError {
    let found = found.map_or_else(|| "an unknown type".to_owned(), |tag| format!("{tag}"));
    EvalError::new(
        ErrorKind::TypeMismatch,
        format!("variable \"{varname}\" has type {found}, expected {expected}"),
    )
    .with_span(span)
}

/// Re-assignment attempted to change a variable's type.
#[cold]
pub fn reassignment_type_mismatch(
    varname: &str,
    declared: &TypeTag,
    new: &TypeTag,
    span: Span,
) -> EvalError {
    EvalError::new(
        ErrorKind::TypeMismatch,
        format!("variable \"{varname}\" was defined as {declared} and cannot be re-assigned as {new}"),
    )
    .with_span(span)
}

/// A literal of the wrong shape appeared where a typed value was expected.
#[cold]
pub fn unexpected_value(expected: &str, found: &str, span: Span) -> EvalError {
    EvalError::new(
        ErrorKind::TypeMismatch,
        format!("expected a value of type {expected} but found {found}"),
    )
    .with_span(span)
}

// Internal

/// The environment's type map and stores disagree.
#[cold]
pub fn inconsistency(detail: impl Into<String>) -> EvalError {
    EvalError::new(ErrorKind::Inconsistency, detail)
}

/// Source input could not be read.
#[cold]
pub fn io_error(what: &str, err: &std::io::Error) -> EvalError {
    EvalError::new(ErrorKind::Io, format!("cannot read {what}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_span() {
        let err = unexpected_token("';'", "identifier \"x\"", Span::new(12, 13));
        assert_eq!(
            err.to_string(),
            "syntax error: expected ';' but found identifier \"x\" (at byte 12)"
        );
        assert_eq!(err.offset(), Some(12));
    }

    #[test]
    fn test_display_without_span() {
        let err = duplicate_member("name");
        assert_eq!(
            err.to_string(),
            "duplicate member: two members are registered with the same name \"name\""
        );
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            missing_required("Animal", "Cow", "name", Span::DUMMY).kind,
            ErrorKind::MissingRequired
        );
        assert_eq!(
            undefined_variable("m", Span::DUMMY).kind,
            ErrorKind::Undefined
        );
    }
}
