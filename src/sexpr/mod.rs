//! Span-preserving s-expression reader for KiCad files.
//!
//! Every node remembers the byte range it was parsed from, so callers can
//! edit a document by patching those ranges ([`PatchSet`]) instead of
//! re-serializing the whole tree. Text the tool does not touch is written
//! back exactly as KiCad left it.

mod format;
mod patch;

pub use format::{format_number, quote, write_node};
pub(crate) use format::render;
pub use patch::{Patch, PatchSet};

use crate::error::{Error, Result};

/// Byte range in the source text (end exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Offset of the first byte
    pub start: usize,
    /// Offset one past the last byte
    pub end: usize,
}

impl Span {
    /// Create a span covering `start..end`
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`, used for pure insertions
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }
}

/// Payload of an s-expression node
#[derive(Debug, Clone, PartialEq)]
pub enum SexprKind {
    /// Bare token such as `gr_text_box`, `yes` or `F.SilkS`
    Symbol(String),
    /// Double-quoted string with escapes resolved
    Str(String),
    /// Numeric token; KiCad mixes integers and decimals freely
    Number(f64),
    /// Parenthesised list
    List(Vec<Sexpr>),
}

/// An s-expression node together with its source span
#[derive(Debug, Clone)]
pub struct Sexpr {
    /// Node payload
    pub kind: SexprKind,
    /// Where the node came from; zero for constructed nodes
    pub span: Span,
}

impl PartialEq for Sexpr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Sexpr {
    /// Constructed symbol node
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::detached(SexprKind::Symbol(s.into()))
    }

    /// Constructed string node
    pub fn string(s: impl Into<String>) -> Self {
        Self::detached(SexprKind::Str(s.into()))
    }

    /// Constructed number node
    pub fn number(n: f64) -> Self {
        Self::detached(SexprKind::Number(n))
    }

    /// Constructed list node
    pub fn list(items: Vec<Sexpr>) -> Self {
        Self::detached(SexprKind::List(items))
    }

    /// Constructed `(name v1 v2 ...)` list
    pub fn node(name: &str, values: impl IntoIterator<Item = Sexpr>) -> Self {
        let mut items = vec![Sexpr::symbol(name)];
        items.extend(values);
        Self::list(items)
    }

    fn detached(kind: SexprKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }

    /// Symbol text, if this is a symbol
    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// String contents, if this is a quoted string
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Symbol or string text; KiCad 6 and earlier left many values unquoted
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::Symbol(s) | SexprKind::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            SexprKind::Number(n) => Some(n),
            _ => None,
        }
    }

    /// List items, if this is a list
    pub fn as_list(&self) -> Option<&[Sexpr]> {
        match &self.kind {
            SexprKind::List(items) => Some(items),
            _ => None,
        }
    }

    /// Leading symbol of a list: `gr_rect` for `(gr_rect ...)`
    pub fn tag(&self) -> Option<&str> {
        self.as_list()?.first()?.as_symbol()
    }

    /// Child lists whose tag is `name`
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Sexpr> + 'a {
        self.as_list()
            .unwrap_or_default()
            .iter()
            .filter(move |child| child.tag() == Some(name))
    }

    /// First child list whose tag is `name`
    pub fn child(&self, name: &str) -> Option<&Sexpr> {
        self.as_list()?.iter().find(|child| child.tag() == Some(name))
    }

    /// Value at `index` inside the first `(name ...)` child
    pub fn child_value(&self, name: &str, index: usize) -> Option<&Sexpr> {
        self.child(name)?.as_list()?.get(index)
    }
}

/// Parse a complete document consisting of exactly one top-level expression
pub fn parse(input: &str) -> Result<Sexpr> {
    let mut parser = Parser::new(input);
    let root = parser.expression()?;
    parser.skip_trivia();
    if parser.pos < input.len() {
        return Err(parser.error("trailing content after top-level expression"));
    }
    tracing::trace!(bytes = input.len(), "parsed s-expression document");
    Ok(root)
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b';' {
                // Line comments are not produced by KiCad but appear in hand-edited fixtures.
                while let Some(&c) = self.bytes.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn expression(&mut self) -> Result<Sexpr> {
        self.skip_trivia();
        match self.bytes.get(self.pos) {
            None => Err(self.error("unexpected end of input")),
            Some(b'(') => self.list(),
            Some(b')') => Err(self.error("unexpected ')'")),
            Some(b'"') => self.string(),
            Some(_) => Ok(self.atom()),
        }
    }

    fn list(&mut self) -> Result<Sexpr> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.bytes.get(self.pos) {
                None => {
                    return Err(Error::Parse {
                        offset: start,
                        message: "unclosed list".to_string(),
                    });
                }
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => items.push(self.expression()?),
            }
        }
        Ok(Sexpr {
            kind: SexprKind::List(items),
            span: Span::new(start, self.pos),
        })
    }

    fn string(&mut self) -> Result<Sexpr> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        let mut run_start = self.pos;
        loop {
            match self.bytes.get(self.pos) {
                None => {
                    return Err(Error::Parse {
                        offset: start,
                        message: "unterminated string".to_string(),
                    });
                }
                Some(b'"') => {
                    value.push_str(&self.input[run_start..self.pos]);
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    value.push_str(&self.input[run_start..self.pos]);
                    self.pos += 1;
                    let escaped = self
                        .input
                        .get(self.pos..)
                        .and_then(|rest| rest.chars().next())
                        .ok_or_else(|| self.error("unterminated escape"))?;
                    value.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    });
                    self.pos += escaped.len_utf8();
                    run_start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
        Ok(Sexpr {
            kind: SexprKind::Str(value),
            span: Span::new(start, self.pos),
        })
    }

    fn atom(&mut self) -> Sexpr {
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() || b == b'(' || b == b')' || b == b'"' {
                break;
            }
            self.pos += 1;
        }
        let token = &self.input[start..self.pos];
        let kind = match token.parse::<f64>() {
            Ok(n) if looks_numeric(token) => SexprKind::Number(n),
            _ => SexprKind::Symbol(token.to_string()),
        };
        Sexpr {
            kind,
            span: Span::new(start, self.pos),
        }
    }
}

// `f64::from_str` accepts "inf" and "NaN"; KiCad never writes those as numbers.
fn looks_numeric(token: &str) -> bool {
    token
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
}
