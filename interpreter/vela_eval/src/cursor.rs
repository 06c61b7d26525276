//! Token cursor for navigating the token stream.
//!
//! Wraps a [`TokenList`] together with the source text and the interner, so
//! parsing code can look ahead, consume tokens, and recover the literal
//! source text of any span (used to hand specification strings to
//! `post_init`). The cursor can be repositioned to any previously observed
//! position, which makes the stream restartable.

use vela_ir::{Name, Span, StringInterner, Token, TokenKind, TokenList};

use crate::errors::{self, EvalResult};

/// Cursor over a lexed token stream.
pub struct Cursor<'a> {
    tokens: &'a TokenList,
    source: &'a str,
    interner: &'a StringInterner,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a new cursor at the start of the token stream.
    ///
    /// The token list must end with an `Eof` token (as produced by
    /// `vela_lexer::lex`).
    pub fn new(tokens: &'a TokenList, source: &'a str, interner: &'a StringInterner) -> Self {
        debug_assert!(
            matches!(tokens.get(tokens.len().wrapping_sub(1)).map(|t| t.kind), Some(TokenKind::Eof)),
            "token stream must end with Eof"
        );
        Cursor {
            tokens,
            source,
            interner,
            pos: 0,
        }
    }

    /// Get a reference to the string interner.
    #[inline]
    pub fn interner(&self) -> &'a StringInterner {
        self.interner
    }

    /// Current position in the token stream.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Reposition the cursor to a previously observed position.
    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(pos < self.tokens.len(), "cursor position out of bounds");
        self.pos = pos;
    }

    /// The current token. The trailing `Eof` token is never advanced past,
    /// so the position is always in bounds.
    #[inline]
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// The current token's kind.
    #[inline]
    pub fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    /// The current token's span.
    #[inline]
    pub fn current_span(&self) -> Span {
        self.current().span
    }

    /// The token `offset` positions ahead, clamped to the trailing `Eof`.
    #[inline]
    pub fn peek_token_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .unwrap_or(&self.tokens[self.tokens.len() - 1])
    }

    /// Kind of the token `offset` positions ahead, clamped to `Eof`.
    #[inline]
    pub fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.peek_token_at(offset).kind
    }

    /// Kind of the next token (one-token lookahead).
    #[inline]
    pub fn peek_next_kind(&self) -> TokenKind {
        self.peek_kind_at(1)
    }

    /// Consume and return the current token.
    ///
    /// Advancing over `Eof` is a syntax error; advancing over an `Error`
    /// token surfaces the lexer's complaint as a fatal lex error.
    pub fn advance(&mut self) -> EvalResult<Token> {
        let token = *self.current();
        match token.kind {
            TokenKind::Eof => Err(errors::unexpected_eof("a token", token.span)),
            TokenKind::Error => Err(errors::lex_error(self.slice(token.span), token.span)),
            _ => {
                self.pos += 1;
                Ok(token)
            }
        }
    }

    /// Consume the current token if it has the given kind, or fail with a
    /// syntax error naming `expected`.
    pub fn expect(&mut self, kind: TokenKind, expected: &str) -> EvalResult<Token> {
        if self.current_kind() == kind {
            self.advance()
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Consume an identifier token, returning its interned name and span.
    pub fn expect_ident(&mut self, expected: &str) -> EvalResult<(Name, Span)> {
        match self.current_kind() {
            TokenKind::Ident(name) => {
                let token = self.advance()?;
                Ok((name, token.span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Build the syntax (or lex) error for an unexpected current token.
    pub fn unexpected(&self, expected: &str) -> crate::errors::EvalError {
        let token = self.current();
        match token.kind {
            TokenKind::Eof => errors::unexpected_eof(expected, token.span),
            TokenKind::Error => errors::lex_error(self.slice(token.span), token.span),
            _ => errors::unexpected_token(expected, &self.describe_current(), token.span),
        }
    }

    /// Describe the current token for diagnostics, e.g. `identifier "cow"`.
    pub fn describe_current(&self) -> String {
        let token = self.current();
        match token.kind {
            TokenKind::Eof => "end of input".to_owned(),
            _ => format!("{} \"{}\"", token.kind.category(), token.text(self.interner)),
        }
    }

    /// Literal source text covered by a span.
    #[inline]
    pub fn slice(&self, span: Span) -> &'a str {
        &self.source[span.start as usize..span.end as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::StringInterner;
    use vela_lexer::lex;

    fn cursor_over<'a>(
        source: &'a str,
        interner: &'a StringInterner,
        tokens: &'a TokenList,
    ) -> Cursor<'a> {
        Cursor::new(tokens, source, interner)
    }

    #[test]
    fn test_advance_and_position() {
        let interner = StringInterner::new();
        let source = "a = 1;";
        let tokens = lex(source, &interner);
        let mut cursor = cursor_over(source, &interner, &tokens);

        assert_eq!(cursor.position(), 0);
        cursor.advance().unwrap();
        cursor.advance().unwrap();
        assert_eq!(cursor.position(), 2);
        assert!(matches!(cursor.current_kind(), TokenKind::Number(_)));

        cursor.set_position(0);
        assert!(matches!(cursor.current_kind(), TokenKind::Ident(_)));
    }

    #[test]
    fn test_advance_past_eof_is_error() {
        let interner = StringInterner::new();
        let source = "a";
        let tokens = lex(source, &interner);
        let mut cursor = cursor_over(source, &interner, &tokens);

        cursor.advance().unwrap();
        let err = cursor.advance().unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Syntax);
    }

    #[test]
    fn test_error_token_is_fatal() {
        let interner = StringInterner::new();
        let source = "@";
        let tokens = lex(source, &interner);
        let mut cursor = cursor_over(source, &interner, &tokens);

        let err = cursor.advance().unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Lex);
        assert_eq!(err.offset(), Some(0));
    }

    #[test]
    fn test_expect_reports_found_token() {
        let interner = StringInterner::new();
        let source = "a = 1;";
        let tokens = lex(source, &interner);
        let mut cursor = cursor_over(source, &interner, &tokens);

        let err = cursor.expect(TokenKind::Semi, "';'").unwrap_err();
        assert!(err.message.contains("';'"));
        assert!(err.message.contains("identifier \"a\""));
    }

    #[test]
    fn test_slice_recovers_source() {
        let interner = StringInterner::new();
        let source = "m = Cow(name(\"x\"));";
        let tokens = lex(source, &interner);
        let cursor = cursor_over(source, &interner, &tokens);

        assert_eq!(cursor.slice(Span::new(4, 19)), "Cow(name(\"x\"));");
    }

    #[test]
    fn test_peek_does_not_consume() {
        let interner = StringInterner::new();
        let source = "xs = {1};";
        let tokens = lex(source, &interner);
        let cursor = cursor_over(source, &interner, &tokens);

        assert_eq!(cursor.peek_kind_at(1), TokenKind::Eq);
        assert_eq!(cursor.peek_kind_at(2), TokenKind::LBrace);
        assert_eq!(cursor.peek_kind_at(99), TokenKind::Eof);
        assert_eq!(cursor.position(), 0);
    }
}
