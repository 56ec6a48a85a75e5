//! Binding records and placeholder maps into template lines.
//!
//! Only directive lines are touched, and only when their source names a known
//! field. Anything else passes through unchanged so templates can mention
//! fields a record does not (yet) have.

use crate::collection::tag_dir;
use crate::directive::{Count, Directive};
use crate::output::ROOT_MARKER;
use crate::placeholder::{Placeholders, TagField};
use crate::record::{self, ContentRecord, Value};
use crate::tree::{Leaf, PARTIALS, SiteTree, TreePath};

/// Something directives can be bound against.
pub trait Fields {
    fn field(&self, key: &str) -> Option<&Value>;

    /// The record behind these fields, for per-tag expansion.
    fn record(&self) -> Option<&ContentRecord> {
        None
    }
}

impl Fields for ContentRecord {
    fn field(&self, key: &str) -> Option<&Value> {
        ContentRecord::field(self, key)
    }

    fn record(&self) -> Option<&ContentRecord> {
        Some(self)
    }
}

impl Fields for Placeholders {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

/// Lookup of resolved partials by their name below `partials/`.
pub trait PartialSource {
    fn partial_lines(&self, name: &str) -> Option<&[String]>;
}

impl PartialSource for SiteTree {
    fn partial_lines(&self, name: &str) -> Option<&[String]> {
        self.leaf(&TreePath::parse(PARTIALS).join(name))
            .and_then(Leaf::lines)
    }
}

/// Bind `fields` into `lines`.
pub fn bind(lines: &[String], fields: &dyn Fields, partials: &dyn PartialSource) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        // Bound values are never re-parsed, and a malformed directive here
        // was already accepted by the expander as literal text.
        let Ok(Some(directive)) = Directive::parse(line) else {
            out.push(line.clone());
            continue;
        };
        match bind_directive(&directive, fields, partials) {
            Some(replacement) => out.extend(directive.indent_all(&replacement)),
            None => out.push(line.clone()),
        }
    }
    out
}

fn bind_directive(
    directive: &Directive,
    fields: &dyn Fields,
    partials: &dyn PartialSource,
) -> Option<Vec<String>> {
    if directive.count == Some(Count::PerTag) {
        return bind_per_tag(directive, fields.record()?, partials);
    }

    match fields.field(&directive.source)? {
        Value::Scalar(value) if directive.source == record::URL => {
            Some(vec![format!("{ROOT_MARKER}{value}")])
        }
        Value::Scalar(value) => Some(vec![value.clone()]),
        Value::Lines(values) => {
            let take = match directive.count {
                Some(Count::Times(n)) => n,
                _ => values.len(),
            };
            Some(values.iter().take(take).cloned().collect())
        }
        Value::Record(_) => None,
    }
}

/// One copy of the referenced template per tag of `record`, each bound with
/// `tag-name` and `tag-url`.
fn bind_per_tag(
    directive: &Directive,
    record: &ContentRecord,
    partials: &dyn PartialSource,
) -> Option<Vec<String>> {
    let reference = directive.reference()?;
    let template = partials.partial_lines(reference.name)?;
    let listing = record.collection();
    Some(
        record
            .tags()
            .iter()
            .flat_map(|tag| {
                bind(
                    template,
                    &TagField::bindings(Some(tag), &tag_dir(&listing, tag)),
                    partials,
                )
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn record(text: &str) -> ContentRecord {
        record_at("blog/post.md", text)
    }

    #[test]
    fn scalar_fields_are_reindented() {
        let lines = lines("<h1>\n  <== title\n</h1>");
        let bound = bind(&lines, &record("title: Hello\n---\n"), &SiteTree::new());
        assert_eq!(bound, ["<h1>", "  Hello", "</h1>"]);
    }

    #[test]
    fn unknown_fields_are_left_verbatim() {
        let lines = lines("  <== subtitle\n<== nothing.html");
        let bound = bind(&lines, &record("title: Hello\n---\n"), &SiteTree::new());
        assert_eq!(bound, lines);
    }

    #[test]
    fn multi_line_values_emit_one_line_per_entry() {
        let bound = bind(
            &lines("<article>\n    <== body\n</article>"),
            &record("---\n---\n# Hi\n\nText\n"),
            &SiteTree::new(),
        );
        assert_eq!(
            bound,
            ["<article>", "    <h1>Hi</h1>", "    <p>Text</p>", "</article>"]
        );
    }

    #[test]
    fn explicit_count_limits_list_values() {
        let record = record("tags: [a, b, c]\n---\n");
        let bound = bind(&lines("<== tags 2"), &record, &SiteTree::new());
        assert_eq!(bound, ["a", "b"]);
        let bound = bind(&lines("<== tags all"), &record, &SiteTree::new());
        assert_eq!(bound, ["a", "b", "c"]);
    }

    #[test]
    fn url_gets_the_root_marker() {
        let bound = bind(&lines("<== url"), &record("---\n---\n"), &SiteTree::new());
        assert_eq!(bound, ["==>blog/post/"]);
    }

    #[test]
    fn per_tag_expands_the_nested_template() {
        let tree = site(&[(
            "partials/tag.item.html",
            "<a href=\"\n  <== tag-url\n\">\n  <== tag-name\n</a>",
        )]);
        let bound = bind(
            &lines("  <== tag.item.html tags"),
            &record("tags: [Rust Lang, web]\n---\n"),
            &tree,
        );
        assert_eq!(
            bound,
            [
                "  <a href=\"",
                "    ==>blog/rust-lang/",
                "  \">",
                "    Rust Lang",
                "  </a>",
                "  <a href=\"",
                "    ==>blog/web/",
                "  \">",
                "    web",
                "  </a>",
            ]
        );
    }

    #[test]
    fn per_tag_without_a_record_is_left_alone() {
        let tree = site(&[("partials/tag.item.html", "<== tag-name")]);
        let mut placeholders = Placeholders::new();
        placeholders.insert("tag-name", "x");
        let lines = lines("<== tag.item.html tags");
        assert_eq!(bind(&lines, &placeholders, &tree), lines);
    }

    #[test]
    fn untagged_record_drops_the_per_tag_line() {
        let tree = site(&[("partials/tag.item.html", "<== tag-name")]);
        let bound = bind(&lines("<== tag.item.html tags"), &record("---\n---\n"), &tree);
        assert!(bound.is_empty());
    }
}
