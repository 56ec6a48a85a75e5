//! Generated placeholder values.
//!
//! Each family of placeholders is an enum whose variants map a directive name
//! to a pure function of the values that define it. [`Placeholders`] is the
//! flat map the binder consumes.

use std::collections::BTreeMap;

use crate::output::{ROOT_MARKER, directory_url};
use crate::record::Value;
use crate::tree::TreePath;

/// A flat name → value map bound like a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placeholders(BTreeMap<String, Value>);

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), Value::Scalar(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_scalar)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn extend(&mut self, other: Placeholders) {
        self.0.extend(other.0);
    }
}

/// Pagination links bound into every listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    First,
    Prev,
    PrevNumber,
    This,
    ThisNumber,
    Next,
    NextNumber,
    ExtraBefore,
    ExtraAfter,
    Last,
}

impl Navigation {
    pub const ALL: [Navigation; 10] = [
        Navigation::First,
        Navigation::Prev,
        Navigation::PrevNumber,
        Navigation::This,
        Navigation::ThisNumber,
        Navigation::Next,
        Navigation::NextNumber,
        Navigation::ExtraBefore,
        Navigation::ExtraAfter,
        Navigation::Last,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Navigation::First => "first",
            Navigation::Prev => "prev",
            Navigation::PrevNumber => "prev-number",
            Navigation::This => "this",
            Navigation::ThisNumber => "this-number",
            Navigation::Next => "next",
            Navigation::NextNumber => "next-number",
            Navigation::ExtraBefore => "extra-before",
            Navigation::ExtraAfter => "extra-after",
            Navigation::Last => "last",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|nav| nav.name() == name)
    }

    /// Value on page `ordinal` of the listing whose page names are `pages`.
    ///
    /// `extra-before` counts the pages hidden between `first` and `prev`,
    /// `extra-after` those between `next` and `last`.
    pub fn value(self, ordinal: usize, pages: &[String]) -> String {
        let total = pages.len();
        let page = |i: usize| pages.get(i).cloned().unwrap_or_default();
        let has_prev = ordinal > 0;
        let has_next = ordinal + 1 < total;
        match self {
            Navigation::First => page(0),
            Navigation::Prev if has_prev => page(ordinal - 1),
            Navigation::PrevNumber if has_prev => ordinal.to_string(),
            Navigation::This => page(ordinal),
            Navigation::ThisNumber => (ordinal + 1).to_string(),
            Navigation::Next if has_next => page(ordinal + 1),
            Navigation::NextNumber if has_next => (ordinal + 2).to_string(),
            Navigation::ExtraBefore => ordinal.saturating_sub(2).to_string(),
            Navigation::ExtraAfter => total.saturating_sub(ordinal + 3).to_string(),
            Navigation::Last => page(total.saturating_sub(1)),
            Navigation::Prev | Navigation::PrevNumber | Navigation::Next | Navigation::NextNumber => {
                String::new()
            }
        }
    }

    pub fn bindings(ordinal: usize, pages: &[String]) -> Placeholders {
        let mut placeholders = Placeholders::new();
        for nav in Self::ALL {
            placeholders.insert(nav.name(), nav.value(ordinal, pages));
        }
        placeholders
    }
}

/// Values for one tag: the nested template of a per-tag directive, and the
/// header of a tag-scoped listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Name,
    Url,
}

impl TagField {
    pub const ALL: [TagField; 2] = [TagField::Name, TagField::Url];

    pub fn name(self) -> &'static str {
        match self {
            TagField::Name => "tag-name",
            TagField::Url => "tag-url",
        }
    }

    /// `dir` is the content-relative directory of the listing the tag
    /// links to; `tag` is `None` for the unfiltered listing.
    pub fn value(self, tag: Option<&str>, dir: &TreePath) -> String {
        match self {
            TagField::Name => tag.unwrap_or_default().to_string(),
            TagField::Url => format!("{ROOT_MARKER}{}", directory_url(dir)),
        }
    }

    pub fn bindings(tag: Option<&str>, dir: &TreePath) -> Placeholders {
        let mut placeholders = Placeholders::new();
        for field in Self::ALL {
            placeholders.insert(field.name(), field.value(tag, dir));
        }
        placeholders
    }
}

/// Collection-wide counts left behind by item multiplication, scoped as
/// `<collection>:total` and `<collection>:extra`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Total,
    Extra,
}

impl Aggregate {
    pub const ALL: [Aggregate; 2] = [Aggregate::Total, Aggregate::Extra];

    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Total => "total",
            Aggregate::Extra => "extra",
        }
    }

    pub fn value(self, total: usize, taken: usize) -> String {
        match self {
            Aggregate::Total => total.to_string(),
            Aggregate::Extra => total.saturating_sub(taken).to_string(),
        }
    }

    pub fn key(self, collection: &str) -> String {
        format!("{collection}:{}", self.name())
    }
}
