use crate::error::{SyntaxError, SyntaxErrorKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Text,
    Number,
    EndOfInput,
    TagOpen,    // {{
    BlockOpen,  // {{#
    BlockClose, // {{/
    TagClose,   // }}
    Operator,
    Identifier,
    String,
    Unknown,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Text => "text",
            TokenKind::Number => "number",
            TokenKind::EndOfInput => "end of input",
            TokenKind::TagOpen => "`{{`",
            TokenKind::BlockOpen => "`{{#`",
            TokenKind::BlockClose => "`{{/`",
            TokenKind::TagClose => "`}}`",
            TokenKind::Operator => "operator",
            TokenKind::Identifier => "identifier",
            TokenKind::String => "string",
            TokenKind::Unknown => "character",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: Option<String>,
    /// Byte offset of the first character of the token.
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, value: Option<String>, position: usize) -> Self {
        Self {
            kind,
            value,
            position,
        }
    }

    pub fn is(&self, kind: TokenKind, value: Option<&str>) -> bool {
        self.kind == kind && value.map_or(true, |v| self.value.as_deref() == Some(v))
    }

    pub fn into_value(self) -> String {
        self.value.unwrap_or_default()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(self.kind, self.value.as_deref()))
    }
}

fn describe(kind: TokenKind, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("{kind} {value:?}"),
        None => kind.to_string(),
    }
}

const COMPARISONS: [&str; 4] = ["==", "!=", ">=", "<="];
const SINGLE_OPERATORS: [char; 3] = ['=', '>', '<'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Text,
    Tag,
}

/// Splits template source into tokens, switching between free text and the
/// inside of `{{ ... }}` tags.
#[derive(Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
    mode: Mode,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            cursor: 0,
            mode: Mode::Text,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn advance(&mut self, n: usize) {
        self.cursor += n;
    }

    /// Produces the next token. Once the input is exhausted every call yields
    /// `EndOfInput`.
    pub fn next_token(&mut self) -> Token {
        if self.remaining().is_empty() {
            return Token::new(TokenKind::EndOfInput, None, self.cursor);
        }
        match self.mode {
            Mode::Text => self.lex_text(),
            Mode::Tag => self.lex_tag(),
        }
    }

    fn lex_text(&mut self) -> Token {
        let start = self.cursor;
        let rest = self.remaining();

        if let Some(after) = rest.strip_prefix("{{") {
            self.mode = Mode::Tag;
            let (kind, len) = match after.as_bytes().first() {
                Some(b'#') => (TokenKind::BlockOpen, 3),
                Some(b'/') => (TokenKind::BlockClose, 3),
                _ => (TokenKind::TagOpen, 2),
            };
            self.advance(len);
            return Token::new(kind, None, start);
        }

        let end = rest.find("{{").unwrap_or(rest.len());
        self.advance(end);
        Token::new(TokenKind::Text, Some(rest[..end].to_string()), start)
    }

    fn lex_tag(&mut self) -> Token {
        let rest = self.remaining();
        let trimmed = rest.trim_start_matches([' ', '\t', '\n', '\r']);
        self.advance(rest.len() - trimmed.len());

        let start = self.cursor;
        let rest = self.remaining();
        let Some(first) = rest.chars().next() else {
            return Token::new(TokenKind::EndOfInput, None, start);
        };

        if let Some(op) = COMPARISONS.iter().find(|op| rest.starts_with(**op)) {
            self.advance(op.len());
            return Token::new(TokenKind::Operator, Some(op.to_string()), start);
        }
        if SINGLE_OPERATORS.contains(&first) {
            self.advance(1);
            return Token::new(TokenKind::Operator, Some(first.to_string()), start);
        }
        if first == '"' || first == '\'' {
            return self.lex_string(first);
        }
        if rest.starts_with("}}") {
            self.advance(2);
            self.mode = Mode::Text;
            return Token::new(TokenKind::TagClose, None, start);
        }
        if first.is_ascii_alphabetic() || first == '_' {
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            self.advance(len);
            return Token::new(TokenKind::Identifier, Some(rest[..len].to_string()), start);
        }
        if first.is_ascii_digit() {
            let len = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            self.advance(len);
            return Token::new(TokenKind::Number, Some(rest[..len].to_string()), start);
        }

        // Step over it so the builder can report it where it stands.
        self.advance(first.len_utf8());
        Token::new(TokenKind::Unknown, Some(first.to_string()), start)
    }

    /// Lexes a quoted string. A missing closing quote is tolerated: the
    /// string then runs to the end of the input.
    fn lex_string(&mut self, quote: char) -> Token {
        let start = self.cursor;
        let body = &self.remaining()[quote.len_utf8()..];
        let mut value = String::new();
        let mut consumed = quote.len_utf8() + body.len();

        let mut chars = body.char_indices();
        while let Some((i, c)) = chars.next() {
            if c == quote {
                consumed = quote.len_utf8() + i + c.len_utf8();
                break;
            }
            if c == '\\' {
                match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, other)) => value.push(other),
                    None => {}
                }
            } else {
                value.push(c);
            }
        }

        self.advance(consumed);
        Token::new(TokenKind::String, Some(value), start)
    }
}

/// A token cursor with exactly one token of lookahead.
///
/// `current` is the token under the cursor; `lookahead` is filled lazily by
/// [`TokenStream::peek_next_is`] and drained by the next
/// [`TokenStream::advance`], so the underlying tokenizer never rewinds.
pub struct TokenStream<'a> {
    tokenizer: Tokenizer<'a>,
    current: Token,
    lookahead: Option<Token>,
}

impl<'a> TokenStream<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut tokenizer = Tokenizer::new(input);
        let current = tokenizer.next_token();
        Self {
            tokenizer,
            current,
            lookahead: None,
        }
    }

    pub fn source(&self) -> &'a str {
        self.tokenizer.input
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Moves one token forward and hands back the token that was current.
    pub fn advance(&mut self) -> Token {
        let next = match self.lookahead.take() {
            Some(token) => token,
            None => self.tokenizer.next_token(),
        };
        std::mem::replace(&mut self.current, next)
    }

    pub fn peek_is(&self, kind: TokenKind, value: Option<&str>) -> bool {
        self.current.is(kind, value)
    }

    /// Checks the token after the current one without moving the cursor.
    pub fn peek_next_is(&mut self, kind: TokenKind, value: Option<&str>) -> bool {
        self.lookahead
            .get_or_insert_with(|| self.tokenizer.next_token())
            .is(kind, value)
    }

    pub fn expect(&self, kind: TokenKind, value: Option<&str>) -> Result<(), SyntaxError> {
        if self.peek_is(kind, value) {
            Ok(())
        } else {
            Err(self.unexpected(kind, value))
        }
    }

    /// A mismatch error describing the current token against what the
    /// grammar wanted here.
    pub fn unexpected(&self, kind: TokenKind, value: Option<&str>) -> SyntaxError {
        self.error(SyntaxErrorKind::UnexpectedToken {
            expected: describe(kind, value),
            found: self.current.to_string(),
        })
    }

    pub fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        self.error_at(kind, self.current.position)
    }

    pub fn error_at(&self, kind: SyntaxErrorKind, position: usize) -> SyntaxError {
        SyntaxError::new(kind, self.source(), position)
    }
}
