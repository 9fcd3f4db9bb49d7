//! Indentation-aware lexer for the bundled front end.

use crate::error::SyntaxError;
use crate::span::Span;

/// Kind of a token produced by the lexer.
///
/// Layout is made explicit: `Newline` ends a logical line, and
/// `Indent`/`Dedent` bracket indented blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Special
    Eof,
    Newline,
    Indent,
    Dedent,

    // Identifiers and literals
    Name,
    Number,
    String,
    True,
    False,
    None,

    // Punctuation
    LParen,  // (
    RParen,  // )
    Colon,   // :
    Comma,   // ,
    Arrow,   // ->
    Assign,  // =

    // Operators
    Plus,        // +
    Minus,       // -
    Star,        // *
    DoubleStar,  // **
    Slash,       // /
    DoubleSlash, // //
    Percent,     // %
    EqEq,        // ==
    NotEq,       // !=
    Less,        // <
    Greater,     // >
    LessEq,      // <=
    GreaterEq,   // >=

    // Keywords
    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    Pass,
    Break,
    Continue,
    Not,
    And,
    Or,
    Is,
}

/// A single token with its kind and byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Lex a source string into tokens, ending with `Eof`.
pub fn lex(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer {
        source,
        chars: source.as_bytes(),
        index: 0,
        indents: vec![0],
        paren_depth: 0,
        at_line_start: true,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    index: usize,
    /// Stack of open indentation widths; the bottom is always 0.
    indents: Vec<usize>,
    paren_depth: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<(), SyntaxError> {
        loop {
            if self.at_line_start && self.paren_depth == 0 {
                self.at_line_start = false;
                if !self.lex_indentation()? {
                    continue;
                }
            }

            let Some(ch) = self.peek_char() else { break };
            let start = self.index;
            match ch {
                b' ' | b'\t' | b'\r' => self.consume_char(),
                b'#' => self.skip_comment(),
                b'\\' if self.peek_next() == Some(b'\n') => {
                    self.consume_char();
                    self.consume_char();
                }
                b'\n' => {
                    self.consume_char();
                    if self.paren_depth == 0 {
                        self.push(TokenKind::Newline, start);
                        self.at_line_start = true;
                    }
                }
                b'(' => {
                    self.consume_char();
                    self.paren_depth += 1;
                    self.push(TokenKind::LParen, start);
                }
                b')' => {
                    self.consume_char();
                    self.paren_depth = self.paren_depth.saturating_sub(1);
                    self.push(TokenKind::RParen, start);
                }
                b':' => self.single(TokenKind::Colon, start),
                b',' => self.single(TokenKind::Comma, start),
                b'+' => self.single(TokenKind::Plus, start),
                b'%' => self.single(TokenKind::Percent, start),
                b'-' => self.one_or_two(b'>', TokenKind::Minus, TokenKind::Arrow, start),
                b'*' => self.one_or_two(b'*', TokenKind::Star, TokenKind::DoubleStar, start),
                b'/' => self.one_or_two(b'/', TokenKind::Slash, TokenKind::DoubleSlash, start),
                b'=' => self.one_or_two(b'=', TokenKind::Assign, TokenKind::EqEq, start),
                b'<' => self.one_or_two(b'=', TokenKind::Less, TokenKind::LessEq, start),
                b'>' => self.one_or_two(b'=', TokenKind::Greater, TokenKind::GreaterEq, start),
                b'!' => {
                    if self.peek_next() == Some(b'=') {
                        self.consume_char();
                        self.consume_char();
                        self.push(TokenKind::NotEq, start);
                    } else {
                        return Err(SyntaxError::new(start, "unexpected character '!'"));
                    }
                }
                b'"' | b'\'' => self.lex_string(ch, start)?,
                b'0'..=b'9' => self.lex_number(start),
                _ if is_ident_start(ch) => self.lex_ident_or_keyword(start),
                _ => {
                    let shown = self.source[start..].chars().next().unwrap_or('?');
                    return Err(SyntaxError::new(
                        start,
                        format!("unexpected character '{shown}'"),
                    ));
                }
            }
        }

        let end = self.chars.len();
        if self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent))
        {
            self.push(TokenKind::Newline, end);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, end);
        }
        self.push(TokenKind::Eof, end);
        Ok(())
    }

    /// Measure the indentation of the line starting at `self.index` and
    /// emit `Indent`/`Dedent` tokens. Returns `false` for blank and
    /// comment-only lines, which are consumed entirely.
    fn lex_indentation(&mut self) -> Result<bool, SyntaxError> {
        let mut width = 0;
        while let Some(ch) = self.peek_char() {
            match ch {
                b' ' => width += 1,
                b'\t' => width = (width / 8 + 1) * 8,
                b'\r' => {}
                _ => break,
            }
            self.consume_char();
        }

        match self.peek_char() {
            None => return Ok(true),
            Some(b'\n') => {
                self.consume_char();
                self.at_line_start = true;
                return Ok(false);
            }
            Some(b'#') => {
                self.skip_comment();
                if self.peek_char() == Some(b'\n') {
                    self.consume_char();
                }
                self.at_line_start = true;
                return Ok(false);
            }
            Some(_) => {}
        }

        let start = self.index;
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent, start);
        } else {
            while width < self.indents.last().copied().unwrap_or(0) {
                self.indents.pop();
                self.push(TokenKind::Dedent, start);
            }
            if width != self.indents.last().copied().unwrap_or(0) {
                return Err(SyntaxError::new(
                    start,
                    "unindent does not match any outer indentation level",
                ));
            }
        }
        Ok(true)
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, self.index),
        });
    }

    fn single(&mut self, kind: TokenKind, start: usize) {
        self.consume_char();
        self.push(kind, start);
    }

    /// Lex a one-character token, or a two-character one when the next
    /// byte is `second`.
    fn one_or_two(&mut self, second: u8, one: TokenKind, two: TokenKind, start: usize) {
        self.consume_char();
        if self.peek_char() == Some(second) {
            self.consume_char();
            self.push(two, start);
        } else {
            self.push(one, start);
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' {
                break;
            }
            self.consume_char();
        }
    }

    fn lex_string(&mut self, quote: u8, start: usize) -> Result<(), SyntaxError> {
        // Consume the opening quote
        self.consume_char();

        while let Some(ch) = self.peek_char() {
            match ch {
                b'\\' => {
                    self.consume_char();
                    if self.peek_char().is_some() {
                        self.consume_char();
                    }
                }
                b'\n' => break,
                _ if ch == quote => {
                    self.consume_char();
                    self.push(TokenKind::String, start);
                    return Ok(());
                }
                _ => self.consume_char(),
            }
        }
        Err(SyntaxError::new(start, "unterminated string literal"))
    }

    fn lex_number(&mut self, start: usize) {
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.consume_char();
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start);
    }

    fn lex_ident_or_keyword(&mut self, start: usize) {
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }

        let kind = match &self.source[start..self.index] {
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "pass" => TokenKind::Pass,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "not" => TokenKind::Not,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "is" => TokenKind::Is,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            _ => TokenKind::Name,
        };
        self.push(kind, start);
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lex")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_simple_assignment() {
        assert_eq!(kinds("x = 5"), vec![Name, Assign, Number, Newline, Eof]);
    }

    #[test]
    fn lexes_compound_operators() {
        assert_eq!(
            kinds("a // b <= c != d -> e ** f == g"),
            vec![
                Name, DoubleSlash, Name, LessEq, Name, NotEq, Name, Arrow, Name, DoubleStar,
                Name, EqEq, Name, Newline, Eof
            ]
        );
    }

    #[test]
    fn emits_indent_and_dedent() {
        let source = "while x:\n    x = 1\n    pass\ny\n";
        assert_eq!(
            kinds(source),
            vec![
                While, Name, Colon, Newline, Indent, Name, Assign, Number, Newline, Pass,
                Newline, Dedent, Name, Newline, Eof
            ]
        );
    }

    #[test]
    fn closes_open_blocks_at_end_of_input() {
        let source = "def f():\n    if x:\n        pass";
        let tokens = kinds(source);
        assert_eq!(&tokens[tokens.len() - 4..], &[Newline, Dedent, Dedent, Eof]);
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let source = "x = 1\n\n   # note\n\nx  # trailing\n";
        assert_eq!(
            kinds(source),
            vec![Name, Assign, Number, Newline, Name, Newline, Eof]
        );
    }

    #[test]
    fn ignores_newlines_inside_parentheses() {
        assert_eq!(
            kinds("f(1,\n  2)\n"),
            vec![Name, LParen, Number, Comma, Number, RParen, Newline, Eof]
        );
    }

    #[test]
    fn recognizes_keywords_and_literals() {
        assert_eq!(
            kinds("not True and False or None is x"),
            vec![Not, True, And, False, Or, None, Is, Name, Newline, Eof]
        );
    }

    #[test]
    fn token_spans_point_into_source() {
        let source = "total = 42";
        let tokens = lex(source).expect("lex");
        assert_eq!(tokens[0].span.text(source), "total");
        assert_eq!(tokens[2].span.text(source), "42");
    }

    #[test]
    fn rejects_inconsistent_dedent() {
        let err = lex("if x:\n    y\n  z\n").unwrap_err();
        assert!(err.message.contains("unindent"));
    }

    #[test]
    fn rejects_unexpected_characters() {
        let err = lex("x = 1 $ 2").unwrap_err();
        assert_eq!(err.position, 6);
        assert!(lex("s = 'open").is_err());
    }
}
