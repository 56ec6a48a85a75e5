//! In-memory mirror of the source roots.
//!
//! The loader reads `partials/`, `content/` and `static/` into a [`SiteTree`],
//! every later stage reads and rewrites nodes in place, and the writer
//! serializes whatever is left under [`OUTPUT`].
//!
//! ## Traversal contract
//!
//! Generation deletes template nodes from the same tree it walks. Iteration
//! helpers such as [`SiteTree::leaf_paths`] therefore return an owned snapshot
//! of paths; callers collect first and mutate afterwards.

use std::collections::BTreeMap;
use std::fmt;

use log::warn;

use crate::record::ContentRecord;

pub const PARTIALS: &str = "partials";
pub const CONTENT: &str = "content";
pub const STATIC: &str = "static";
pub const OUTPUT: &str = "output";

/// A slash-free, segment-list address inside a [`SiteTree`].
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreePath(Vec<String>);

impl TreePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Split a `/`-separated path. Empty segments are dropped, so `"a//b/"`
    /// and `"a/b"` address the same node.
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a relative `/`-separated path.
    pub fn join(&self, relative: &str) -> Self {
        let mut joined = self.clone();
        joined.0.extend(TreePath::parse(relative).0);
        joined
    }

    pub fn join_path(&self, other: &TreePath) -> Self {
        let mut joined = self.clone();
        joined.0.extend(other.0.iter().cloned());
        joined
    }

    /// The containing directory. The root is its own parent.
    pub fn parent(&self) -> Self {
        let mut parent = self.clone();
        parent.0.pop();
        parent
    }

    /// Last segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn with_name(&self, name: &str) -> Self {
        self.parent().join(name)
    }

    pub fn starts_with(&self, prefix: &TreePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn strip_prefix(&self, prefix: &TreePath) -> Option<Self> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| Self(rest.to_vec()))
    }
}

impl<S: Into<String>> FromIterator<S> for TreePath {
    fn from_iter<I: IntoIterator<Item = S>>(segments: I) -> Self {
        Self(segments.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Directory(BTreeMap<String, Node>),
    Leaf(Leaf),
}

impl Node {
    pub fn directory() -> Self {
        Node::Directory(BTreeMap::new())
    }

    pub fn text<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Node::Leaf(Leaf::Text(lines.into_iter().map(Into::into).collect()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    /// Lines as read from disk, directives untouched.
    Text(Vec<String>),
    /// Lines after partial expansion.
    Resolved(Vec<String>),
    /// A formatted content file.
    Record(ContentRecord),
    /// Anything that is not a template, carried through verbatim.
    Asset(Vec<u8>),
}

impl Leaf {
    pub fn lines(&self) -> Option<&[String]> {
        match self {
            Leaf::Text(lines) | Leaf::Resolved(lines) => Some(lines),
            _ => None,
        }
    }

    pub fn record(&self) -> Option<&ContentRecord> {
        match self {
            Leaf::Record(record) => Some(record),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteTree {
    root: Node,
}

impl Default for SiteTree {
    fn default() -> Self {
        Self {
            root: Node::directory(),
        }
    }
}

impl SiteTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &TreePath) -> Option<&Node> {
        let mut node = &self.root;
        for segment in path.segments() {
            match node {
                Node::Directory(children) => node = children.get(segment)?,
                Node::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    pub fn get_mut(&mut self, path: &TreePath) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for segment in path.segments() {
            match node {
                Node::Directory(children) => node = children.get_mut(segment)?,
                Node::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    pub fn leaf(&self, path: &TreePath) -> Option<&Leaf> {
        match self.get(path)? {
            Node::Leaf(leaf) => Some(leaf),
            Node::Directory(_) => None,
        }
    }

    pub fn is_directory(&self, path: &TreePath) -> bool {
        matches!(self.get(path), Some(Node::Directory(_)))
    }

    /// Place `node` at `path`, creating directories along the way. Returns the
    /// node previously stored there.
    pub fn insert(&mut self, path: &TreePath, node: Node) -> Option<Node> {
        let Some((name, parents)) = path.segments().split_last() else {
            return Some(std::mem::replace(&mut self.root, node));
        };

        let mut current = &mut self.root;
        for segment in parents {
            let Node::Directory(children) = current else {
                unreachable!("intermediate nodes are always directories");
            };
            let child = children
                .entry(segment.clone())
                .or_insert_with(Node::directory);
            if let Node::Leaf(_) = child {
                warn!("replacing file `{segment}` with a directory to store {path}");
                *child = Node::directory();
            }
            current = child;
        }

        match current {
            Node::Directory(children) => children.insert(name.clone(), node),
            Node::Leaf(_) => unreachable!("intermediate nodes are always directories"),
        }
    }

    pub fn remove(&mut self, path: &TreePath) -> Option<Node> {
        let (name, _) = path.segments().split_last()?;
        match self.get_mut(&path.parent())? {
            Node::Directory(children) => children.remove(name),
            Node::Leaf(_) => None,
        }
    }

    /// Snapshot of every leaf below `under`, in depth-first name order.
    pub fn leaf_paths(&self, under: &TreePath) -> Vec<TreePath> {
        let mut paths = Vec::new();
        if let Some(node) = self.get(under) {
            collect_leaves(node, under, &mut paths);
        }
        paths
    }

    /// Snapshot of the leaves directly inside the directory `dir`.
    pub fn child_leaves(&self, dir: &TreePath) -> Vec<TreePath> {
        match self.get(dir) {
            Some(Node::Directory(children)) => children
                .iter()
                .filter(|(_, node)| matches!(node, Node::Leaf(_)))
                .map(|(name, _)| dir.join(name))
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn collect_leaves(node: &Node, path: &TreePath, out: &mut Vec<TreePath>) {
    match node {
        Node::Leaf(_) => out.push(path.clone()),
        Node::Directory(children) => {
            for (name, child) in children {
                let mut child_path = path.clone();
                child_path.0.push(name.clone());
                collect_leaves(child, &child_path, out);
            }
        }
    }
}
