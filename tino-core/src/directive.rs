//! Inclusion directives.
//!
//! A directive is any template line containing [`INCLUDE_MARKER`]:
//!
//! ```text
//!     <== header.html
//!     <== blog#rust:card.item.html 3
//!     <== title
//! ```
//!
//! Everything before the marker only counts as indentation; the first token
//! after it is the source and the optional second token is the count.

use std::fmt;

use thiserror::Error;

pub const INCLUDE_MARKER: &str = "<==";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("directive has no source")]
    MissingSource,
    #[error("invalid count `{0}` (expected a positive integer, `all` or `tags`)")]
    InvalidCount(String),
    #[error("unexpected token `{0}` after the count")]
    UnexpectedToken(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Times(usize),
    /// The whole collection, or every entry of a list value.
    All,
    /// Once per tag of the bound record.
    PerTag,
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Times(n) => write!(f, "{n}"),
            Count::All => write!(f, "all"),
            Count::PerTag => write!(f, "tags"),
        }
    }
}

impl Count {
    fn parse(token: &str) -> Result<Self, DirectiveError> {
        match token {
            "all" => Ok(Count::All),
            "tags" => Ok(Count::PerTag),
            _ => match token.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Count::Times(n)),
                _ => Err(DirectiveError::InvalidCount(token.to_string())),
            },
        }
    }
}

/// Filename-derived template role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Partial,
    Page,
    List,
    Item,
}

impl Role {
    /// Role of an `.html` file name; `None` for anything else.
    pub fn of(name: &str) -> Option<Role> {
        let tokens: Vec<&str> = name.split('.').collect();
        if tokens.len() < 2 || tokens.last() != Some(&"html") {
            return None;
        }
        let infix = &tokens[1..tokens.len() - 1];
        let role = if infix.contains(&"page") {
            Role::Page
        } else if infix.contains(&"list") {
            Role::List
        } else if infix.contains(&"item") {
            Role::Item
        } else {
            Role::Partial
        };
        Some(role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub indent: usize,
    pub source: String,
    pub count: Option<Count>,
}

impl Directive {
    /// `Ok(None)` when the line carries no marker.
    pub fn parse(line: &str) -> Result<Option<Directive>, DirectiveError> {
        let Some((prefix, arguments)) = line.split_once(INCLUDE_MARKER) else {
            return Ok(None);
        };

        let mut tokens = arguments.split_whitespace();
        let source = tokens.next().ok_or(DirectiveError::MissingSource)?;
        let count = tokens.next().map(Count::parse).transpose()?;
        if let Some(extra) = tokens.next() {
            return Err(DirectiveError::UnexpectedToken(extra.to_string()));
        }

        Ok(Some(Directive {
            indent: prefix.chars().count(),
            source: source.to_string(),
            count,
        }))
    }

    /// The effective count; a directive without one includes once.
    pub fn repeat(&self) -> Count {
        self.count.unwrap_or(Count::Times(1))
    }

    /// The partial this directive includes, or `None` for a field directive.
    pub fn reference(&self) -> Option<Reference<'_>> {
        if !self.source.ends_with(".html") {
            return None;
        }
        let (prefix, name) = match self.source.split_once(':') {
            Some((prefix, name)) => (Some(prefix), name),
            None => (None, self.source.as_str()),
        };
        Some(Reference { prefix, name })
    }

    pub fn indent_all<'a, I>(&self, lines: I) -> impl Iterator<Item = String> + use<'a, I>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let width = self.indent;
        lines.into_iter().map(move |line| indent(line, width))
    }
}

/// A partial named by a directive, split from its optional `type:` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    pub prefix: Option<&'a str>,
    pub name: &'a str,
}

impl Reference<'_> {
    pub fn role(&self) -> Role {
        Role::of(self.name).unwrap_or(Role::Partial)
    }
}

pub fn indent(line: &str, width: usize) -> String {
    format!("{:width$}{line}", "")
}
