//! Vela Lexer - Tokenizer for the Vela configuration language.
//!
//! The main entry point is [`lex()`], which converts source text into a
//! [`TokenList`].
//!
//! # Token Types
//!
//! - **Literals**: strings (with `\"` and `\\` escapes), numbers (raw text,
//!   int/double classification deferred to read time)
//! - **Reserved words**: `true`, `false`, `nullptr`, `NULL`
//! - **Identifiers**: `[A-Za-z_][A-Za-z0-9_]*` (interned); the primitive
//!   type names are ordinary identifiers recognized positionally
//! - **Punctuation**: `( ) { } [ ] , ; =`
//!
//! # Comments
//!
//! `// …` line comments are skipped; there are no block comments.
//!
//! # Error Handling
//!
//! Invalid input (an unexpected character, an unterminated string) produces
//! a `TokenKind::Error` token and the lexer continues, so callers decide
//! where lexing trouble becomes fatal.

mod escape;
mod parse_helpers;
mod raw_token;

pub use escape::{cook, quote};
pub use parse_helpers::{is_double_literal, parse_double, parse_int};

use logos::Logos;
use raw_token::RawToken;
use vela_ir::{Span, StringInterner, Token, TokenKind, TokenList};

/// Lex source text into a [`TokenList`].
///
/// The returned stream always ends with a single `Eof` token whose span
/// points one past the last byte of input. Comments and whitespace are
/// skipped; invalid input becomes `Error` tokens rather than failing the
/// whole scan.
pub fn lex(source: &str, interner: &StringInterner) -> TokenList {
    let mut tokens = TokenList::new();
    let mut logos = RawToken::lexer(source);

    while let Some(result) = logos.next() {
        let span = Span::from_range(logos.span());
        match result {
            Ok(RawToken::LineComment) => {}
            Ok(raw) => tokens.push(Token::new(convert(raw, logos.slice(), interner), span)),
            Err(()) => tokens.push(Token::new(TokenKind::Error, span)),
        }
    }

    let eof = u32::try_from(source.len()).unwrap_or(u32::MAX);
    tokens.push(Token::new(TokenKind::Eof, Span::point(eof)));
    tokens
}

/// Convert a raw token into its final kind, interning texts as needed.
fn convert(raw: RawToken, slice: &str, interner: &StringInterner) -> TokenKind {
    match raw {
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::Nullptr => TokenKind::Nullptr,
        RawToken::Null => TokenKind::Null,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Semi => TokenKind::Semi,
        RawToken::Eq => TokenKind::Eq,
        RawToken::Number => TokenKind::Number(interner.intern(slice)),
        RawToken::Str => {
            // Strip the quotes, then process escapes.
            let body = &slice[1..slice.len() - 1];
            TokenKind::Str(interner.intern(&escape::cook(body)))
        }
        RawToken::Ident => TokenKind::Ident(interner.intern(slice)),
        RawToken::LineComment => unreachable!("comments are skipped by the caller"),
    }
}
