use std::collections::BTreeMap;

use crate::tree::TreePath;

pub const BODY: &str = "body";
pub const URL: &str = "url";
pub const INTRO: &str = "intro";
pub const IMAGE: &str = "image";
pub const TAGS: &str = "tags";
pub const WEIGHTS: &str = "weights";
pub const DATE: &str = "date";
pub const TITLE: &str = "title";

/// A value a directive can be bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    Lines(Vec<String>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

/// One formatted content file: front matter plus computed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    path: TreePath,
    fields: BTreeMap<String, Value>,
}

impl ContentRecord {
    /// `path` is relative to the content root, e.g. `blog/first-post.md`.
    pub fn new(path: TreePath) -> Self {
        Self {
            path,
            fields: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &TreePath {
        &self.path
    }

    /// Directory holding the content file, relative to the content root.
    pub fn collection(&self) -> TreePath {
        self.path.parent()
    }

    /// Where the generated page lands: the content path with its extension
    /// replaced by `.html`.
    pub fn output_path(&self) -> TreePath {
        let name = self.path.name().unwrap_or_default();
        let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
        self.path.with_name(&format!("{stem}.html"))
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_scalar)
    }

    pub fn tags(&self) -> &[String] {
        match self.field(TAGS) {
            Some(Value::Lines(tags)) => tags,
            _ => &[],
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().iter().any(|t| t == tag)
    }

    /// Explicit ordering weight for `tag`, if the front matter declared one.
    pub fn weight(&self, tag: &str) -> Option<i64> {
        match self.field(WEIGHTS) {
            Some(Value::Record(weights)) => weights
                .get(tag)
                .and_then(Value::as_scalar)
                .and_then(|weight| weight.parse().ok()),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<&str> {
        self.scalar(DATE)
    }

    pub fn url(&self) -> &str {
        self.scalar(URL).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_rewrites_the_extension() {
        let record = ContentRecord::new(TreePath::parse("blog/hello.world.md"));
        assert_eq!(record.output_path(), TreePath::parse("blog/hello.world.html"));
        assert_eq!(record.collection(), TreePath::parse("blog"));
    }

    #[test]
    fn weight_reads_the_nested_map() {
        let mut record = ContentRecord::new(TreePath::parse("a.md"));
        record.set(
            WEIGHTS,
            Value::Record(BTreeMap::from([(
                "rust".to_string(),
                Value::Scalar("2".to_string()),
            )])),
        );

        assert_eq!(record.weight("rust"), Some(2));
        assert_eq!(record.weight("web"), None);
    }

    #[test]
    fn tags_default_to_empty() {
        let record = ContentRecord::new(TreePath::parse("a.md"));
        assert!(record.tags().is_empty());
        assert!(!record.has_tag("rust"));
    }
}
