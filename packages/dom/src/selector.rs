//! Compiled CSS selectors.
//!
//! Supports the subset islands use to locate hosts and props scripts:
//!
//! - type selectors (`div`) and the universal selector (`*`)
//! - `#id` and `.class`
//! - attribute selectors: `[name]`, `[name=value]`, `[name~=value]`,
//!   `[name|=value]`, `[name^=value]`, `[name$=value]`, `[name*=value]`,
//!   with quoted or bare values
//! - descendant (whitespace) and child (`>`) combinators
//! - selector lists (`a, b`)

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::node::NodeId;

/// Errors from parsing a selector string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// The selector (or one entry of a list) is empty.
    #[error("empty selector")]
    Empty,

    /// A character that cannot appear at this position.
    #[error("unexpected '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },

    /// Input ended in the middle of a selector.
    #[error("unexpected end of selector")]
    UnexpectedEnd,

    /// A quoted attribute value is missing its closing quote.
    #[error("unterminated string starting at position {position}")]
    UnterminatedString { position: usize },
}

/// Read access to element structure, used for matching.
pub(crate) trait ElementTree {
    fn tag(&self, node: NodeId) -> Option<&str>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
    fn parent_element(&self, node: NodeId) -> Option<NodeId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeSelector {
    name: String,
    test: Option<(AttributeOp, String)>,
}

impl AttributeSelector {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let Some((op, expected)) = &self.test else {
            return true;
        };
        let expected = expected.as_str();
        match op {
            AttributeOp::Equals => actual == expected,
            AttributeOp::Includes => {
                !expected.is_empty() && actual.split_ascii_whitespace().any(|w| w == expected)
            }
            AttributeOp::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            AttributeOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttributeOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttributeOp::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeSelector>,
}

impl Compound {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        let Some(tag) = tree.tag(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|t| t != tag) {
            return false;
        }
        if let Some(id) = &self.id {
            if tree.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = tree.attribute(node, "class").unwrap_or("");
            let all_present = self
                .classes
                .iter()
                .all(|c| class_attr.split_ascii_whitespace().any(|w| w == c));
            if !all_present {
                return false;
            }
        }
        self.attributes
            .iter()
            .all(|a| a.matches(tree.attribute(node, &a.name)))
    }
}

/// A chain of compounds, left to right. The combinator of the first entry
/// is unused.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        self.matches_from(tree, node, self.parts.len() - 1)
    }

    fn matches_from<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId, index: usize) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(tree, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => tree
                .parent_element(node)
                .is_some_and(|parent| self.matches_from(tree, parent, index - 1)),
            Combinator::Descendant => {
                let mut cursor = tree.parent_element(node);
                while let Some(ancestor) = cursor {
                    if self.matches_from(tree, ancestor, index - 1) {
                        return true;
                    }
                    cursor = tree.parent_element(ancestor);
                }
                false
            }
        }
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    /// Parse a selector list.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use islet_dom::Selector;
    ///
    /// assert!(Selector::parse(r#"div.card > script[type="text/props"]"#).is_ok());
    /// assert!(Selector::parse("div >").is_err());
    /// ```
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser::new(source);
        let alternatives = parser.parse_list()?;
        Ok(Selector {
            source: source.trim().to_string(),
            alternatives,
        })
    }

    /// The selector text this was parsed from, trimmed.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub(crate) fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches(tree, node))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map(|(i, _)| *i).unwrap_or_else(|| {
            self.chars
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0)
        })
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(character) => SelectorError::UnexpectedCharacter {
                character,
                position: self.offset(),
            },
            None => SelectorError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Skip whitespace, reporting whether any was consumed.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some(',') => return Err(SelectorError::Empty),
                _ => {}
            }
            alternatives.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(alternatives),
                Some(',') => {
                    self.pos += 1;
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = vec![(Combinator::Descendant, self.parse_compound()?)];
        loop {
            let had_whitespace = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    parts.push((Combinator::Child, self.parse_compound()?));
                }
                Some(_) if had_whitespace => {
                    parts.push((Combinator::Descendant, self.parse_compound()?));
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(Complex { parts })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut empty = true;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                empty = false;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
                empty = false;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.attribute()?);
                }
                _ => break,
            }
            empty = false;
        }

        if empty {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            out.push(c);
            self.pos += 1;
        }
        if out.is_empty() {
            return Err(self.unexpected());
        }
        Ok(out)
    }

    fn attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttributeSelector { name, test: None });
            }
            Some('=') => {
                self.pos += 1;
                AttributeOp::Equals
            }
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.pos += 1;
                self.expect('=')?;
                match c {
                    '~' => AttributeOp::Includes,
                    '|' => AttributeOp::DashMatch,
                    '^' => AttributeOp::Prefix,
                    '$' => AttributeOp::Suffix,
                    _ => AttributeOp::Substring,
                }
            }
            _ => return Err(self.unexpected()),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => self.quoted(quote)?,
            Some(_) => self.ident()?,
            None => return Err(SelectorError::UnexpectedEnd),
        };
        self.skip_whitespace();
        self.expect(']')?;

        Ok(AttributeSelector {
            name,
            test: Some((op, value)),
        })
    }

    fn quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        let start = self.offset();
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(SelectorError::UnterminatedString { position: start }),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => return Err(SelectorError::UnterminatedString { position: start }),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
