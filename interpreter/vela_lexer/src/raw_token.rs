//! Raw token definition.
//!
//! The `RawToken` enum is the logos-derived scanner output before escape
//! cooking and string interning.

use logos::Logos;

/// Raw token from logos (before interning).
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub(crate) enum RawToken {
    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nullptr")]
    Nullptr,
    #[token("NULL")]
    Null,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token("=")]
    Eq,

    /// Optional sign, digits, optional fraction, optional exponent.
    /// The int/double classification is deferred to read time.
    #[regex(r"-?[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?")]
    Number,

    /// Double-quoted string; `\"` and `\\` are the only escapes that may
    /// hide a quote from the scanner.
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}
