//! Serializing the generated tree to disk.
//!
//! HTML files other than `index.html` and `page-N.html` get pretty URLs:
//! `about.html` is stored as `about/index.html` and linked as `about/`.
//! Root-relative markers left in HTML are resolved against the stored depth.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::tree::{Leaf, Node, SiteTree, TreePath};

pub const ROOT_MARKER: &str = "==>";

pub type HtmlFilter = Box<dyn Fn(String) -> String + Send + Sync>;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("refusing to clean {output}: it contains the source directory {source_dir}")]
    UnsafeClean { output: PathBuf, source_dir: PathBuf },
}

fn is_pretty_exempt(stem: &str) -> bool {
    stem == "index"
        || stem
            .strip_prefix("page-")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn html_stem(path: &TreePath) -> Option<&str> {
    path.name()?.strip_suffix(".html")
}

/// Path the file is stored at, relative to the output root.
pub fn stored_path(path: &TreePath) -> TreePath {
    match html_stem(path) {
        Some(stem) if !is_pretty_exempt(stem) => path.parent().join(stem).join("index.html"),
        _ => path.clone(),
    }
}

/// URL of a generated file relative to the output root, as links should
/// spell it.
pub fn logical_url(path: &TreePath) -> String {
    match html_stem(path) {
        Some("index") => directory_url(&path.parent()),
        Some(stem) if !is_pretty_exempt(stem) => directory_url(&path.parent().join(stem)),
        _ => path.to_string(),
    }
}

/// `blog/rust` → `blog/rust/`; the root is the empty string.
pub fn directory_url(dir: &TreePath) -> String {
    if dir.is_root() {
        String::new()
    } else {
        format!("{dir}/")
    }
}

/// Replace every root-relative marker with `depth` parent steps.
pub fn resolve_root_markers(line: &str, depth: usize) -> String {
    line.replace(ROOT_MARKER, &"../".repeat(depth))
}

pub struct OutputWriter {
    root: PathBuf,
    clean: bool,
    source_dir: Option<PathBuf>,
    html_filter: Option<HtmlFilter>,
}

impl OutputWriter {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            clean: false,
            source_dir: None,
            html_filter: None,
        }
    }

    /// Remove the output root before writing.
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Never clean a directory that contains `source_dir`.
    pub fn protect<P: AsRef<Path>>(mut self, source_dir: P) -> Self {
        self.source_dir = Some(source_dir.as_ref().to_path_buf());
        self
    }

    /// Post-process every written HTML document.
    pub fn html_filter(mut self, filter: HtmlFilter) -> Self {
        self.html_filter = Some(filter);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every leaf below `from`, returning the files written.
    pub fn write(&self, tree: &SiteTree, from: &TreePath) -> Result<Vec<PathBuf>, WriteError> {
        if self.clean && self.root.exists() {
            self.check_clean_is_safe()?;
            debug!("Cleaning {}", self.root.display());
            fs::remove_dir_all(&self.root).map_err(|source| WriteError::Io {
                path: self.root.clone(),
                source,
            })?;
        }

        let mut written = Vec::new();
        for path in tree.leaf_paths(from) {
            let Some(relative) = path.strip_prefix(from) else {
                continue;
            };
            let Some(Node::Leaf(leaf)) = tree.get(&path) else {
                continue;
            };
            let stored = stored_path(&relative);
            let target = stored
                .segments()
                .iter()
                .fold(self.root.clone(), |dir, segment| dir.join(segment));

            let bytes = match leaf {
                Leaf::Asset(bytes) => bytes.clone(),
                Leaf::Text(lines) | Leaf::Resolved(lines) => {
                    if html_stem(&relative).is_some() {
                        self.render_html(lines, stored.len().saturating_sub(1))
                            .into_bytes()
                    } else {
                        join_lines(lines).into_bytes()
                    }
                }
                Leaf::Record(record) => {
                    warn!("Skipping unrendered content record {}", record.path());
                    continue;
                }
            };

            write_file(&target, &bytes)?;
            debug!("Wrote {}", target.display());
            written.push(target);
        }

        info!("Wrote {} files to {}", written.len(), self.root.display());
        Ok(written)
    }

    fn render_html(&self, lines: &[String], depth: usize) -> String {
        let resolved: Vec<String> = lines
            .iter()
            .map(|line| resolve_root_markers(line, depth))
            .collect();
        let html = join_lines(&resolved);
        match &self.html_filter {
            Some(filter) => filter(html),
            None => html,
        }
    }

    fn check_clean_is_safe(&self) -> Result<(), WriteError> {
        let Some(source_dir) = &self.source_dir else {
            return Ok(());
        };
        let output = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let source = source_dir
            .canonicalize()
            .unwrap_or_else(|_| source_dir.clone());
        if source.starts_with(&output) {
            return Err(WriteError::UnsafeClean {
                output: self.root.clone(),
                source_dir: source_dir.clone(),
            });
        }
        Ok(())
    }
}

fn join_lines(lines: &[String]) -> String {
    let mut text = lines.join("\n");
    if !lines.is_empty() {
        text.push('\n');
    }
    text
}

fn write_file(target: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let io_error = |source| WriteError::Io {
        path: target.to_path_buf(),
        source,
    };
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(target, bytes).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn pretty_paths() {
        let stored = |p: &str| stored_path(&TreePath::parse(p)).to_string();
        assert_eq!(stored("about.html"), "about/index.html");
        assert_eq!(stored("blog/post.html"), "blog/post/index.html");
        assert_eq!(stored("blog/index.html"), "blog/index.html");
        assert_eq!(stored("blog/page-2.html"), "blog/page-2.html");
        assert_eq!(stored("blog/page-two.html"), "blog/page-two/index.html");
        assert_eq!(stored("css/site.css"), "css/site.css");
    }

    #[test]
    fn logical_urls() {
        let url = |p: &str| logical_url(&TreePath::parse(p));
        assert_eq!(url("about.html"), "about/");
        assert_eq!(url("blog/post.html"), "blog/post/");
        assert_eq!(url("blog/index.html"), "blog/");
        assert_eq!(url("index.html"), "");
        assert_eq!(url("blog/page-3.html"), "blog/page-3.html");
        assert_eq!(url("js/app.js"), "js/app.js");
    }

    #[test]
    fn markers_become_parent_steps() {
        assert_eq!(resolve_root_markers("<a href=\"==>css/a.css\">", 0), "<a href=\"css/a.css\">");
        assert_eq!(resolve_root_markers("==>x ==>y", 2), "../../x ../../y");
    }

    fn output_tree() -> SiteTree {
        let mut tree = SiteTree::new();
        let out = TreePath::parse("output");
        tree.insert(&out.join("index.html"), Node::text(["<a href=\"==>about/\">"]));
        tree.insert(&out.join("about.html"), Node::text(["<link href=\"==>site.css\">"]));
        tree.insert(&out.join("site.css"), Node::Leaf(Leaf::Asset(b"a{}\n".to_vec())));
        tree
    }

    #[test]
    fn writes_pretty_paths_and_resolves_markers() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("dist");
        let written = OutputWriter::new(&root)
            .write(&output_tree(), &TreePath::parse("output"))
            .unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(
            fs::read_to_string(root.join("index.html")).unwrap(),
            "<a href=\"about/\">\n"
        );
        assert_eq!(
            fs::read_to_string(root.join("about/index.html")).unwrap(),
            "<link href=\"../site.css\">\n"
        );
        assert_eq!(fs::read(root.join("site.css")).unwrap(), b"a{}\n");
    }

    #[test]
    fn html_filter_applies_to_html_only() {
        let tmp = TempDir::new().unwrap();
        OutputWriter::new(tmp.path())
            .html_filter(Box::new(|html: String| format!("{html}<!-- dev -->")))
            .write(&output_tree(), &TreePath::parse("output"))
            .unwrap();

        assert!(
            fs::read_to_string(tmp.path().join("index.html"))
                .unwrap()
                .ends_with("<!-- dev -->")
        );
        assert_eq!(fs::read(tmp.path().join("site.css")).unwrap(), b"a{}\n");
    }

    #[test]
    fn clean_removes_stale_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("stale.html"), "old").unwrap();

        OutputWriter::new(tmp.path())
            .clean(true)
            .write(&output_tree(), &TreePath::parse("output"))
            .unwrap();

        assert!(!tmp.path().join("stale.html").exists());
        assert!(tmp.path().join("index.html").exists());
    }

    #[test]
    fn clean_refuses_to_remove_the_source() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("site");
        fs::create_dir_all(&source).unwrap();

        let err = OutputWriter::new(tmp.path())
            .clean(true)
            .protect(&source)
            .write(&output_tree(), &TreePath::parse("output"))
            .unwrap_err();

        assert!(matches!(err, WriteError::UnsafeClean { .. }));
        assert!(source.exists());
    }
}
