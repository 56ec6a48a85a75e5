//! Content collections: gathering, tag filtering and ordering.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::record::ContentRecord;
use crate::tree::{CONTENT, Leaf, SiteTree, TreePath};

/// A collection named by an item reference: `blog`, `blog#rust`, `#rust`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    /// Relative to the content root.
    pub path: TreePath,
    pub tag: Option<String>,
}

impl CollectionRef {
    pub fn parse(prefix: &str) -> Self {
        let (path, tag) = match prefix.split_once('#') {
            Some((path, tag)) => (path, Some(tag.trim().to_string()).filter(|t| !t.is_empty())),
            None => (prefix, None),
        };
        Self {
            path: TreePath::parse(path),
            tag,
        }
    }

    /// Collection implied by an unprefixed item template name:
    /// `blog.item.html` → `blog`.
    pub fn implied_by(item_name: &str) -> Self {
        let stem = item_name.strip_suffix(".html").unwrap_or(item_name);
        let stem = stem.strip_suffix(".item").unwrap_or(stem);
        Self::parse(stem)
    }

    /// Scope prefix for aggregate placeholders, e.g. `blog#rust`.
    pub fn key(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{}#{tag}", self.path),
            None => self.path.to_string(),
        }
    }

    pub fn gather<'t>(&self, tree: &'t SiteTree) -> Vec<&'t ContentRecord> {
        gather(tree, &self.path, self.tag.as_deref())
    }
}

/// Which records of a collection a listing keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFilter {
    Any,
    /// Records carrying exactly this tag.
    Tag(String),
    /// Records carrying any tag with this slug.
    Slug(String),
}

impl TagFilter {
    /// The record's tag this filter matched, if any.
    fn matched<'r>(&self, record: &'r ContentRecord) -> Option<&'r str> {
        let mut tags = record.tags().iter().map(String::as_str);
        match self {
            TagFilter::Any => None,
            TagFilter::Tag(tag) => tags.find(|t| *t == tag.as_str()),
            TagFilter::Slug(slug) => tags.find(|t| slugify(t) == *slug),
        }
    }

    fn keeps(&self, record: &ContentRecord) -> bool {
        *self == TagFilter::Any || self.matched(record).is_some()
    }

    fn weight(&self, record: &ContentRecord) -> Option<i64> {
        self.matched(record).and_then(|tag| record.weight(tag))
    }
}

/// Every record below `content/<scope>`, filtered to `tag` and ordered.
///
/// A missing directory is an empty collection.
pub fn gather<'t>(tree: &'t SiteTree, scope: &TreePath, tag: Option<&str>) -> Vec<&'t ContentRecord> {
    let filter = match tag {
        Some(tag) => TagFilter::Tag(tag.to_string()),
        None => TagFilter::Any,
    };
    gather_with(tree, scope, &filter)
}

pub fn gather_with<'t>(
    tree: &'t SiteTree,
    scope: &TreePath,
    filter: &TagFilter,
) -> Vec<&'t ContentRecord> {
    let dir = TreePath::parse(CONTENT).join_path(scope);
    if tree.get(&dir).is_none() {
        debug!("No content at {dir}, collection is empty");
        return Vec::new();
    }

    let mut records: Vec<&ContentRecord> = tree
        .leaf_paths(&dir)
        .iter()
        .filter_map(|path| tree.leaf(path).and_then(Leaf::record))
        .filter(|record| filter.keeps(record))
        .collect();
    records.sort_by(|a, b| order(a, b, filter));
    records
}

/// Newest first; under a tag filter, records weighted for the tag come
/// first, lightest first.
fn order(a: &ContentRecord, b: &ContentRecord, filter: &TagFilter) -> Ordering {
    let by_recency = || {
        b.date()
            .cmp(&a.date())
            .then_with(|| a.path().cmp(b.path()))
    };
    match (filter.weight(a), filter.weight(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(by_recency),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => by_recency(),
    }
}

pub fn tag_set<'a, I>(records: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a ContentRecord>,
{
    records
        .into_iter()
        .flat_map(|record| record.tags().iter().cloned())
        .collect()
}

/// Distinct tag slugs with the first tag spelling each one, in tag order.
/// `Rust` and `rust` share one entry.
pub fn tag_slugs<'a, I>(records: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a ContentRecord>,
{
    let mut slugs = BTreeMap::new();
    for tag in tag_set(records) {
        slugs.entry(slugify(&tag)).or_insert(tag);
    }
    slugs
}

/// Lowercase alphanumerics joined by single hyphens. A tag without any
/// alphanumerics falls back to `tag-` and the hex of its bytes, so a slug is
/// never empty.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_hyphen = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("tag-");
        for byte in text.bytes() {
            slug.push_str(&format!("{byte:02x}"));
        }
    }
    slug
}

/// Directory of the listing for `tag` below the listing directory `dir`.
pub fn tag_dir(dir: &TreePath, tag: &str) -> TreePath {
    dir.join(&slugify(tag))
}

/// The content directory a `static/…` template is scoped to.
pub fn template_scope(template: &TreePath) -> TreePath {
    TreePath::from_iter(
        template
            .parent()
            .segments()
            .iter()
            .skip(1)
            .map(String::as_str),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn urls(records: &[&ContentRecord]) -> Vec<String> {
        records.iter().map(|r| r.url().to_string()).collect()
    }

    #[test]
    fn parse_prefix() {
        let collection = CollectionRef::parse("blog/notes#rust");
        assert_eq!(collection.path, TreePath::parse("blog/notes"));
        assert_eq!(collection.tag.as_deref(), Some("rust"));
        assert_eq!(collection.key(), "blog/notes#rust");

        assert_eq!(CollectionRef::implied_by("blog.item.html").key(), "blog");
        assert_eq!(CollectionRef::parse("#rust").path, TreePath::root());
    }

    #[test]
    fn newest_first_undated_last() {
        let tree = formatted_site(&[
            ("content/blog/a.md", "date: 2024-01-01\n---\nA"),
            ("content/blog/b.md", "date: 2024-05-01\n---\nB"),
            ("content/blog/c.md", "title: undated\n---\nC"),
            ("content/blog/old/d.md", "date: 2023-01-01\n---\nD"),
        ]);

        let records = gather(&tree, &TreePath::parse("blog"), None);
        assert_eq!(urls(&records), ["blog/b/", "blog/a/", "blog/old/d/", "blog/c/"]);
    }

    #[test]
    fn tag_filter_and_weights() {
        let tree = formatted_site(&[
            ("content/a.md", "date: 2024-01-01\ntags: [x, y]\n---\n"),
            ("content/b.md", "date: 2024-02-01\ntags: [x]\nweight: [x: 5]\n---\n"),
            ("content/c.md", "date: 2024-03-01\ntags: [x]\nweight: [x: 1]\n---\n"),
            ("content/d.md", "date: 2024-04-01\ntags: [y]\n---\n"),
        ]);

        let x = gather(&tree, &TreePath::root(), Some("x"));
        assert_eq!(urls(&x), ["c/", "b/", "a/"]);

        let y = gather(&tree, &TreePath::root(), Some("y"));
        assert_eq!(urls(&y), ["d/", "a/"]);

        assert!(gather(&tree, &TreePath::root(), Some("z")).is_empty());
    }

    #[test]
    fn unfiltered_order_ignores_weights() {
        let tree = formatted_site(&[
            ("content/a.md", "date: 2024-01-01\nweight: [x: 1]\n---\n"),
            ("content/b.md", "date: 2024-02-01\n---\n"),
        ]);
        let all = gather(&tree, &TreePath::root(), None);
        assert_eq!(urls(&all), ["b/", "a/"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let tree = formatted_site(&[("content/blog/a.md", "A")]);
        assert!(gather(&tree, &TreePath::parse("news"), None).is_empty());
    }

    #[test]
    fn tags_and_slugs() {
        let tree = formatted_site(&[
            ("content/a.md", "tags: [Rust Lang, web]\n---\n"),
            ("content/b.md", "tags: [web]\n---\n"),
        ]);
        let tags = tag_set(gather(&tree, &TreePath::root(), None));
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), ["Rust Lang", "web"]);

        assert_eq!(slugify("Rust Lang"), "rust-lang");
        assert_eq!(slugify("  C++ & you! "), "c-you");
    }

    #[test]
    fn slugs_are_never_empty() {
        assert_eq!(slugify("日本"), "日本");
        assert_eq!(slugify("Ünïcode Tag"), "ünïcode-tag");
        assert_eq!(slugify("++"), "tag-2b2b");
        assert_eq!(slugify(""), "tag-");
        assert_eq!(tag_dir(&TreePath::parse("blog"), "++"), TreePath::parse("blog/tag-2b2b"));
    }

    #[test]
    fn tags_differing_in_case_share_a_slug() {
        let tree = formatted_site(&[
            ("content/a.md", "date: 2024-01-01\ntags: [Rust]\n---\n"),
            ("content/b.md", "date: 2024-02-01\ntags: [rust, web]\n---\n"),
            ("content/c.md", "date: 2024-03-01\ntags: [go]\n---\n"),
        ]);
        let all = gather(&tree, &TreePath::root(), None);
        let slugs = tag_slugs(all.iter().copied());
        assert_eq!(
            slugs.iter().map(|(s, t)| (s.as_str(), t.as_str())).collect::<Vec<_>>(),
            [("go", "go"), ("rust", "Rust"), ("web", "web")]
        );

        let rust = gather_with(&tree, &TreePath::root(), &TagFilter::Slug("rust".into()));
        assert_eq!(urls(&rust), ["b/", "a/"]);
        let exact = gather(&tree, &TreePath::root(), Some("rust"));
        assert_eq!(urls(&exact), ["b/"]);
    }

    #[test]
    fn scope_of_a_static_template() {
        assert_eq!(
            template_scope(&TreePath::parse("static/blog/post.page.html")),
            TreePath::parse("blog")
        );
        assert_eq!(
            template_scope(&TreePath::parse("static/post.page.html")),
            TreePath::root()
        );
    }
}
