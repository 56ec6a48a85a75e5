//! Paginated listings.
//!
//! A list template carries exactly one item directive. Its count is the page
//! size, and the item template is bound once per record on each page. Every
//! listing is emitted for the whole collection and, when tag listings are
//! enabled, again for each tag found in it, nested under the tag's slug.
//! Tags sharing a slug share one listing. An item prefix with a tag filter
//! emits only that tag's listing, in the template's own directory.

use log::{debug, info};

use crate::binder::bind;
use crate::collection::{
    CollectionRef, TagFilter, gather, gather_with, tag_slugs, template_scope,
};
use crate::directive::{Count, Directive, Role};
use crate::expand::{Expander, ResolveError, partial_path};
use crate::page::insert_generated;
use crate::placeholder::{Navigation, TagField};
use crate::tree::{Leaf, STATIC, SiteTree, TreePath};

/// Where the item directive sits in a resolved list template.
#[derive(Debug)]
struct ItemSlot {
    index: usize,
    directive: Directive,
}

impl ItemSlot {
    fn locate(template: &TreePath, lines: &[String]) -> Result<Self, ResolveError> {
        let mut found: Option<ItemSlot> = None;
        for (index, line) in lines.iter().enumerate() {
            let Ok(Some(directive)) = Directive::parse(line) else {
                continue;
            };
            let is_item = directive
                .reference()
                .is_some_and(|reference| reference.role() == Role::Item);
            if !is_item {
                continue;
            }
            if let Some(first) = &found {
                return Err(ResolveError::DuplicateItemDirective {
                    template: template.clone(),
                    line: index + 1,
                    first: first.index + 1,
                });
            }
            found = Some(ItemSlot { index, directive });
        }
        found.ok_or_else(|| ResolveError::MissingItemDirective {
            template: template.clone(),
        })
    }

    fn page_size(&self, template: &TreePath) -> Result<usize, ResolveError> {
        match self.directive.repeat() {
            Count::Times(n) => Ok(n),
            count => Err(ResolveError::InvalidCount {
                reference: self.directive.source.clone(),
                count,
                template: template.clone(),
                line: self.index + 1,
            }),
        }
    }
}

/// Number of pages for `total` items. An exact multiple of the page size
/// gets a trailing empty page.
pub fn page_count(total: usize, page_size: usize) -> usize {
    total / page_size + 1
}

/// `index.html`, `page-2.html`, `page-3.html`, …
pub fn page_names(count: usize) -> Vec<String> {
    (0..count)
        .map(|ordinal| match ordinal {
            0 => "index.html".to_string(),
            n => format!("page-{}.html", n + 1),
        })
        .collect()
}

/// Emit every listing of `template` and drop it. Returns the number of pages
/// generated.
pub fn generate_lists(
    tree: &mut SiteTree,
    template: &TreePath,
    tag_lists: bool,
) -> Result<usize, ResolveError> {
    let lines = Expander::new(tree).resolve(template)?;
    let slot = ItemSlot::locate(template, &lines)?;
    let page_size = slot.page_size(template)?;

    let reference = slot
        .directive
        .reference()
        .ok_or_else(|| ResolveError::MissingItemDirective {
            template: template.clone(),
        })?;
    let item_template = partial_path(reference.name);
    if tree.leaf(&item_template).and_then(Leaf::lines).is_none() {
        return Err(ResolveError::MissingPartial {
            reference: reference.name.to_string(),
            template: template.clone(),
            line: slot.index + 1,
        });
    }
    let item = Expander::new(tree).resolve(&item_template)?;

    let listing = template_scope(template);
    let (collection_path, mut scopes) = match reference.prefix {
        Some(prefix) => {
            let collection = CollectionRef::parse(prefix);
            let scope = match collection.tag {
                Some(tag) => Scope {
                    name: Some(tag.clone()),
                    filter: TagFilter::Tag(tag),
                    dir: listing.clone(),
                },
                None => Scope::unfiltered(&listing),
            };
            (collection.path, vec![scope])
        }
        None => (listing.clone(), vec![Scope::unfiltered(&listing)]),
    };
    if tag_lists && scopes[0].filter == TagFilter::Any {
        let records = gather(tree, &collection_path, None);
        scopes.extend(tag_slugs(records).into_iter().map(|(slug, name)| Scope {
            name: Some(name),
            dir: listing.join(&slug),
            filter: TagFilter::Slug(slug),
        }));
    }

    let mut pages = Vec::new();
    for scope in &scopes {
        let records = gather_with(tree, &collection_path, &scope.filter);
        let count = page_count(records.len(), page_size);
        let names = page_names(count);
        let output_dir = TreePath::parse(STATIC).join_path(&scope.dir);
        debug!(
            "{template}: {} records for {}, {count} pages",
            records.len(),
            scope.name.as_deref().unwrap_or("all")
        );

        for (ordinal, name) in names.iter().enumerate() {
            let items: Vec<String> = records
                .iter()
                .skip(ordinal * page_size)
                .take(page_size)
                .flat_map(|record| bind(&item, *record, &*tree))
                .collect();

            let mut page = Vec::with_capacity(lines.len() + items.len());
            page.extend(lines[..slot.index].iter().cloned());
            page.extend(slot.directive.indent_all(&items));
            page.extend(lines[slot.index + 1..].iter().cloned());

            let mut placeholders = Navigation::bindings(ordinal, &names);
            placeholders.extend(TagField::bindings(scope.name.as_deref(), &scope.dir));
            pages.push((output_dir.join(name), bind(&page, &placeholders, &*tree)));
        }
    }

    let generated = insert_generated(tree, template, pages)?;
    tree.remove(template);

    info!(
        "{template}: generated {generated} listing pages across {} scopes",
        scopes.len()
    );
    Ok(generated)
}

/// One listing emitted from a list template.
#[derive(Debug)]
struct Scope {
    /// Tag shown as `tag-name`; `None` for the unfiltered listing.
    name: Option<String>,
    filter: TagFilter,
    /// Content-relative directory the listing is written to.
    dir: TreePath,
}

impl Scope {
    fn unfiltered(dir: &TreePath) -> Self {
        Self {
            name: None,
            filter: TagFilter::Any,
            dir: dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    const LIST: &str = "<ul>\n  <== post.item.html 5\n</ul>\n<== prev\n<== next\n<== this-number";

    fn blog(posts: usize, list: &str) -> SiteTree {
        let posts: Vec<(String, String)> = (1..=posts)
            .map(|n| {
                (
                    format!("content/blog/p{n}.md"),
                    format!("title: P{n}\ndate: 2024-01-{n:02}\n---\nPost {n}"),
                )
            })
            .collect();
        let mut files: Vec<(&str, &str)> = vec![
            ("partials/post.item.html", "<li>\n  <== title\n</li>"),
            ("static/blog/index.list.html", list),
        ];
        files.extend(posts.iter().map(|(path, text)| (path.as_str(), text.as_str())));
        formatted_site(&files)
    }

    fn items(lines: &[String]) -> usize {
        lines.iter().filter(|line| line.trim() == "<li>").count()
    }

    #[test]
    fn page_count_keeps_the_trailing_page() {
        assert_eq!(page_count(0, 5), 1);
        assert_eq!(page_count(9, 5), 2);
        assert_eq!(page_count(10, 5), 3);
        assert_eq!(page_names(3), ["index.html", "page-2.html", "page-3.html"]);
    }

    #[test]
    fn two_pages_link_to_each_other() {
        let mut tree = blog(9, LIST);
        let template = TreePath::parse("static/blog/index.list.html");
        assert_eq!(generate_lists(&mut tree, &template, false).unwrap(), 2);

        let first = output_lines(&tree, "static/blog/index.html");
        assert_eq!(items(&first), 5);
        assert_eq!(&first[..4], ["<ul>", "  <li>", "    P9", "  </li>"]);
        assert_eq!(&first[first.len() - 3..], ["", "page-2.html", "1"]);

        let second = output_lines(&tree, "static/blog/page-2.html");
        assert_eq!(items(&second), 4);
        assert_eq!(&second[second.len() - 3..], ["index.html", "", "2"]);

        assert!(tree.get(&template).is_none());
    }

    #[test]
    fn exact_multiple_ends_with_an_empty_page() {
        let list = "<ul>\n  <== post.item.html 10\n</ul>";
        let mut tree = blog(10, list);
        let template = TreePath::parse("static/blog/index.list.html");
        assert_eq!(generate_lists(&mut tree, &template, false).unwrap(), 2);
        assert_eq!(items(&output_lines(&tree, "static/blog/index.html")), 10);
        assert_eq!(output_lines(&tree, "static/blog/page-2.html"), ["<ul>", "</ul>"]);
    }

    #[test]
    fn tag_listings_only_hold_tagged_records() {
        let mut tree = formatted_site(&[
            ("partials/post.item.html", "<== title"),
            (
                "static/blog/index.list.html",
                "<== tag-name\n<== tag-url\n<== post.item.html 5",
            ),
            ("content/blog/ab.md", "title: AB\ntags: [a, b]\n---\n"),
            ("content/blog/c.md", "title: C\ntags: [c]\n---\n"),
        ]);
        let template = TreePath::parse("static/blog/index.list.html");
        assert_eq!(generate_lists(&mut tree, &template, true).unwrap(), 4);

        assert_eq!(output_lines(&tree, "static/blog/index.html"), ["", "==>blog/", "AB", "C"]);
        assert_eq!(output_lines(&tree, "static/blog/a/index.html"), ["a", "==>blog/a/", "AB"]);
        assert_eq!(output_lines(&tree, "static/blog/b/index.html"), ["b", "==>blog/b/", "AB"]);
        assert_eq!(output_lines(&tree, "static/blog/c/index.html"), ["c", "==>blog/c/", "C"]);
    }

    #[test]
    fn tag_listings_can_be_disabled() {
        let mut tree = formatted_site(&[
            ("partials/post.item.html", "<== title"),
            ("static/blog/index.list.html", "<== post.item.html 5"),
            ("content/blog/a.md", "title: A\ntags: [a]\n---\n"),
        ]);
        let template = TreePath::parse("static/blog/index.list.html");
        assert_eq!(generate_lists(&mut tree, &template, false).unwrap(), 1);
        assert!(tree.get(&TreePath::parse("static/blog/a")).is_none());
    }

    #[test]
    fn prefixed_item_overrides_scope_and_filters() {
        let mut tree = formatted_site(&[
            ("partials/card.item.html", "<== title"),
            (
                "static/index.list.html",
                "<== tag-name\n<== tag-url\n<== blog#rust:card.item.html 3",
            ),
            ("content/blog/a.md", "title: A\ntags: [rust]\n---\n"),
            ("content/blog/b.md", "title: B\ntags: [go]\n---\n"),
        ]);
        let template = TreePath::parse("static/index.list.html");
        assert_eq!(generate_lists(&mut tree, &template, true).unwrap(), 1);
        assert_eq!(output_lines(&tree, "static/index.html"), ["rust", "==>", "A"]);
        assert!(tree.get(&TreePath::parse("static/rust")).is_none());
    }

    #[test]
    fn tags_without_ascii_get_their_own_listing() {
        let mut tree = formatted_site(&[
            ("partials/post.item.html", "<== title"),
            ("static/blog/index.list.html", "<== tag-name\n<== post.item.html 5"),
            ("content/blog/a.md", "title: A\ndate: 2024-01-02\ntags: [日本]\n---\n"),
            ("content/blog/b.md", "title: B\ndate: 2024-01-01\ntags: [rust]\n---\n"),
        ]);
        let template = TreePath::parse("static/blog/index.list.html");
        assert_eq!(generate_lists(&mut tree, &template, true).unwrap(), 3);

        assert_eq!(output_lines(&tree, "static/blog/index.html"), ["", "A", "B"]);
        assert_eq!(output_lines(&tree, "static/blog/日本/index.html"), ["日本", "A"]);
        assert_eq!(output_lines(&tree, "static/blog/rust/index.html"), ["rust", "B"]);
    }

    #[test]
    fn tags_differing_in_case_share_one_listing() {
        let mut tree = formatted_site(&[
            ("partials/post.item.html", "<== title"),
            (
                "static/blog/index.list.html",
                "<== tag-name\n<== tag-url\n<== post.item.html 5",
            ),
            ("content/blog/a.md", "title: A\ndate: 2024-01-01\ntags: [Rust]\n---\n"),
            ("content/blog/b.md", "title: B\ndate: 2024-01-02\ntags: [rust]\n---\n"),
        ]);
        let template = TreePath::parse("static/blog/index.list.html");
        assert_eq!(generate_lists(&mut tree, &template, true).unwrap(), 2);

        assert_eq!(
            output_lines(&tree, "static/blog/rust/index.html"),
            ["Rust", "==>blog/rust/", "B", "A"]
        );
    }

    #[test]
    fn listing_never_replaces_a_generated_page() {
        let mut tree = formatted_site(&[
            ("partials/post.item.html", "<== title"),
            ("static/blog/index.list.html", "<== post.item.html 5"),
            ("static/blog/index.html", "<p>hand written</p>"),
            ("content/blog/a.md", "title: A\n---\n"),
        ]);
        let template = TreePath::parse("static/blog/index.list.html");
        let err = generate_lists(&mut tree, &template, false).unwrap_err();
        assert!(matches!(
            &err,
            ResolveError::OutputCollision { path, .. } if path.to_string() == "static/blog/index.html"
        ));
        assert_eq!(output_lines(&tree, "static/blog/index.html"), ["<p>hand written</p>"]);
        assert!(tree.get(&template).is_some());
    }

    #[test]
    fn unbounded_page_size_is_fatal() {
        let mut tree = blog(3, "<== post.item.html all");
        let template = TreePath::parse("static/blog/index.list.html");
        let err = generate_lists(&mut tree, &template, true).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidCount { count: Count::All, line: 1, .. }));
    }

    #[test]
    fn item_directive_must_appear_exactly_once() {
        let mut tree = blog(1, "<ul></ul>");
        let template = TreePath::parse("static/blog/index.list.html");
        let err = generate_lists(&mut tree, &template, true).unwrap_err();
        assert!(matches!(err, ResolveError::MissingItemDirective { .. }));

        let mut tree = blog(1, "<== post.item.html 2\n<== post.item.html 2");
        let err = generate_lists(&mut tree, &template, true).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DuplicateItemDirective { line: 2, first: 1, .. }
        ));
    }
}
