//! S-expression tokenizer
//!
//! Turns KiCad file text into a flat token stream in a single forward pass.
//! Comments (`;` to end of line) are dropped here and never reach the tree.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::core::{KicadSexpError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Number(f64),
    /// Quoted string literal, already unescaped
    String(String),
    Boolean(bool),
    Nil,
    /// Bare word that is neither a number, a boolean nor `nil`
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub offset: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_trivia();

        let (offset, ch) = match self.chars.peek() {
            Some(&(offset, ch)) => (offset, ch),
            None => return Ok(None),
        };

        let kind = match ch {
            '(' => {
                self.chars.next();
                TokenKind::LParen
            }
            ')' => {
                self.chars.next();
                TokenKind::RParen
            }
            '"' => self.read_string(offset)?,
            '\\' => return Err(self.error(offset, "unexpected '\\' outside a string")),
            c if c.is_control() => {
                return Err(self.error(offset, format!("unrecognized character {:?}", c)))
            }
            _ => self.read_bare(offset),
        };

        Ok(Some(Token { kind, offset }))
    }

    fn skip_trivia(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else if ch == ';' {
                while let Some(&(_, c)) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.chars.next();
                }
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self, start: usize) -> Result<TokenKind> {
        self.chars.next();
        let mut s = String::new();

        loop {
            let (_, ch) = match self.chars.next() {
                Some(next) => next,
                None => return Err(self.error(start, "unterminated string")),
            };

            match ch {
                '"' => return Ok(TokenKind::String(s)),
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => s.push(unescape(escaped)),
                    None => return Err(self.error(start, "unterminated string")),
                },
                _ => s.push(ch),
            }
        }
    }

    fn read_bare(&mut self, start: usize) -> TokenKind {
        let mut end = self.input.len();
        while let Some(&(offset, ch)) = self.chars.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                end = offset;
                break;
            }
            self.chars.next();
        }

        classify_bare(&self.input[start..end])
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> KicadSexpError {
        let (line, column) = line_column(self.input, offset);
        KicadSexpError::Lex {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Tokenize `input` in one pass.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).tokenize()
}

fn unescape(ch: char) -> char {
    match ch {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        other => other,
    }
}

fn classify_bare(word: &str) -> TokenKind {
    match word {
        "#t" => TokenKind::Boolean(true),
        "#f" => TokenKind::Boolean(false),
        "nil" => TokenKind::Nil,
        _ if is_numeric(word) => match word.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Symbol(word.to_string()),
        },
        _ => TokenKind::Symbol(word.to_string()),
    }
}

/// Numeric grammar: `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
pub fn is_numeric(word: &str) -> bool {
    let bytes = word.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }

    if digits == 0 {
        return false;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

/// 1-based line and column of a byte offset.
pub fn line_column(input: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (i, ch) in input.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}
