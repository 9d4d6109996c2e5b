use std::fmt;

use serde::Serialize;

use super::lexer::{line_column, tokenize, Token, TokenKind};
use crate::core::{KicadSexpError, Result, SyntaxErrorKind};

/// Untyped S-expression tree, before any node type is attached.
///
/// Quoted strings and bare symbols both become [`SExp::Atom`]; the printer
/// decides whether quotes are needed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SExp {
    Nil,
    Bool(bool),
    Number(f64),
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn atom(s: impl Into<String>) -> Self {
        SExp::Atom(s.into())
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            SExp::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, SExp::List(_))
    }

    /// Head of a list whose first element is a string.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(|head| head.as_atom())
    }

    /// First child list tagged `key`.
    pub fn get(&self, key: &str) -> Option<&SExp> {
        self.as_list()?
            .iter()
            .find(|item| item.tag() == Some(key))
    }

    /// Every child list tagged `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<&SExp> {
        match self.as_list() {
            Some(items) => items.iter().filter(|item| item.tag() == Some(key)).collect(),
            None => Vec::new(),
        }
    }

    /// Short name of the variant, used in divergence reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            SExp::Nil => "nil",
            SExp::Bool(_) => "boolean",
            SExp::Number(_) => "number",
            SExp::Atom(_) => "string",
            SExp::List(_) => "list",
        }
    }
}

/// Strings outside this class are quoted when printed.
pub fn is_bare_symbol(s: &str) -> bool {
    let mut chars = s.chars();
    let first_ok = match chars.next() {
        Some(c) => c.is_ascii_alphabetic() || c == '_' || c == '*',
        None => false,
    };
    first_ok
        && chars.all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(
                    c,
                    '_' | '.' | '-' | '+' | ':' | '/' | '*' | '$' | '%' | '&' | '!' | '?' | '<'
                        | '>' | '=' | '~' | '@' | '^' | '\'' | ',' | '[' | ']' | '{' | '}' | '|'
                )
        })
}

pub fn is_reserved(s: &str) -> bool {
    matches!(s, "nil" | "#t" | "#f")
}

/// Render a string the way the tokenizer will read it back.
pub fn quote_if_needed(s: &str) -> String {
    if is_bare_symbol(s) && !is_reserved(s) {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        "nan".to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        // also folds -0 into 0
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Nil => write!(f, "nil"),
            SExp::Bool(true) => write!(f, "#t"),
            SExp::Bool(false) => write!(f, "#f"),
            SExp::Number(n) => write!(f, "{}", format_number(*n)),
            SExp::Atom(s) => write!(f, "{}", quote_if_needed(s)),
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Deepest list nesting the parser accepts. Every later pass over a parsed
/// tree recurses at most this far.
pub const MAX_DEPTH: usize = 256;

/// Recursive descent over a token stream.
pub struct SExpParser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> SExpParser<'a> {
    pub fn new(input: &'a str) -> Result<Self> {
        Ok(Self {
            input,
            tokens: tokenize(input)?,
            pos: 0,
            depth: 0,
        })
    }

    /// Every top-level form, in order.
    pub fn parse_all(&mut self) -> Result<Vec<SExp>> {
        let mut forms = Vec::new();
        while self.pos < self.tokens.len() {
            forms.push(self.parse_form()?);
        }
        Ok(forms)
    }

    fn parse_form(&mut self) -> Result<SExp> {
        let offset = self.tokens[self.pos].offset;
        let form = match &self.tokens[self.pos].kind {
            TokenKind::LParen => None,
            TokenKind::RParen => {
                return Err(self.syntax_error(offset, SyntaxErrorKind::UnmatchedClose))
            }
            TokenKind::Number(n) => Some(SExp::Number(*n)),
            TokenKind::String(s) | TokenKind::Symbol(s) => Some(SExp::Atom(s.clone())),
            TokenKind::Boolean(b) => Some(SExp::Bool(*b)),
            TokenKind::Nil => Some(SExp::Nil),
        };
        self.pos += 1;

        match form {
            Some(form) => Ok(form),
            None => self.parse_list(offset),
        }
    }

    fn parse_list(&mut self, open_offset: usize) -> Result<SExp> {
        if self.depth >= MAX_DEPTH {
            return Err(self.syntax_error(open_offset, SyntaxErrorKind::TooDeep));
        }
        self.depth += 1;
        let mut items = Vec::new();
        loop {
            match self.tokens.get(self.pos) {
                None => return Err(self.syntax_error(open_offset, SyntaxErrorKind::UnmatchedOpen)),
                Some(Token { kind: TokenKind::RParen, .. }) => {
                    self.pos += 1;
                    self.depth -= 1;
                    return Ok(SExp::List(items));
                }
                Some(_) => items.push(self.parse_form()?),
            }
        }
    }

    fn syntax_error(&self, offset: usize, kind: SyntaxErrorKind) -> KicadSexpError {
        let (line, column) = line_column(self.input, offset);
        KicadSexpError::Syntax { line, column, kind }
    }
}

/// Tokenize and parse `input` into its top-level forms.
pub fn parse_forms(input: &str) -> Result<Vec<SExp>> {
    SExpParser::new(input)?.parse_all()
}
