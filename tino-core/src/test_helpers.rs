//! In-memory site fixtures shared by the unit tests.

use crate::markdown::format_record;
use crate::record::ContentRecord;
use crate::tree::{CONTENT, Leaf, Node, STATIC, SiteTree, TreePath};

pub fn lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Build a tree from `(path, text)` pairs. `.html` files and everything under
/// `content/` load as text; any other file under `static/` is an asset.
pub fn site(files: &[(&str, &str)]) -> SiteTree {
    let mut tree = SiteTree::new();
    for (path, text) in files {
        let path = TreePath::parse(path);
        let is_html = path.name().is_some_and(|name| name.ends_with(".html"));
        let is_static = path.segments().first().is_some_and(|root| root == STATIC);
        let node = if is_static && !is_html {
            Node::Leaf(Leaf::Asset(text.as_bytes().to_vec()))
        } else {
            Node::text(lines(text))
        };
        tree.insert(&path, node);
    }
    tree
}

/// [`site`], with every content file already formatted into a record.
pub fn formatted_site(files: &[(&str, &str)]) -> SiteTree {
    let mut tree = site(files);
    let content = TreePath::parse(CONTENT);
    for path in tree.leaf_paths(&content) {
        let Some(Leaf::Text(text)) = tree.leaf(&path) else {
            continue;
        };
        let relative = path.strip_prefix(&content).unwrap();
        let record = format_record(&relative, text).unwrap();
        tree.insert(&path, Node::Leaf(Leaf::Record(record)));
    }
    tree
}

/// Format `text` as the content file at `path` (relative to `content/`).
pub fn record_at(path: &str, text: &str) -> ContentRecord {
    format_record(&TreePath::parse(path), &lines(text)).unwrap()
}

pub fn output_lines(tree: &SiteTree, path: &str) -> Vec<String> {
    tree.leaf(&TreePath::parse(path))
        .and_then(Leaf::lines)
        .unwrap_or_else(|| panic!("no text at {path}"))
        .to_vec()
}
