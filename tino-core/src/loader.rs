use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, info};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::tree::{CONTENT, Leaf, Node, PARTIALS, STATIC, SiteTree, TreePath};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),
}

/// Reads the source roots of a site into a [`SiteTree`].
pub struct SiteScanner {
    source_dir: PathBuf,
    include_content: bool,
}

impl SiteScanner {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source_dir: path.as_ref().to_path_buf(),
            include_content: true,
        }
    }

    /// Leave `content/` out of the scan.
    pub fn without_content(mut self) -> Self {
        self.include_content = false;
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    fn roots(&self) -> Vec<&'static str> {
        if self.include_content {
            vec![PARTIALS, CONTENT, STATIC]
        } else {
            vec![PARTIALS, STATIC]
        }
    }

    pub fn scan(&self) -> Result<SiteTree, ScanError> {
        debug!("Scanning: {}", self.source_dir.display());

        let mut tree = SiteTree::new();
        for root in self.roots() {
            let root_dir = self.source_dir.join(root);
            // A missing root still exists in the tree, just empty.
            tree.insert(&TreePath::parse(root), Node::directory());
            if !root_dir.is_dir() {
                debug!("No {root}/ directory in {}", self.source_dir.display());
                continue;
            }

            let mut files = 0;
            for entry in walk(&root_dir) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = tree_path(root, &root_dir, entry.path())?;
                tree.insert(&path, load_file(root, entry.path())?);
                files += 1;
            }
            info!("Loaded {files} files from {root}/");
        }
        Ok(tree)
    }

    /// Newest modification time of any file in the source roots.
    pub fn latest_modification(&self) -> Option<SystemTime> {
        self.roots()
            .into_iter()
            .flat_map(|root| walk(&self.source_dir.join(root)))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok()?.modified().ok())
            .max()
    }

    /// Whether anything in the source roots changed after `since`.
    pub fn changed_since(&self, since: SystemTime) -> bool {
        self.latest_modification()
            .is_some_and(|modified| modified > since)
    }
}

fn walk(dir: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> + use<> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn tree_path(root: &str, root_dir: &Path, file: &Path) -> Result<TreePath, ScanError> {
    let relative = file
        .strip_prefix(root_dir)
        .map_err(|_| ScanError::InvalidPath(file.to_path_buf()))?;
    let mut path = TreePath::parse(root);
    for component in relative.components() {
        let segment = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| ScanError::InvalidPath(file.to_path_buf()))?;
        path = path.join(segment);
    }
    Ok(path)
}

/// Templates and content load as lines, everything else as bytes.
fn load_file(root: &str, file: &Path) -> Result<Node, ScanError> {
    let bytes = fs::read(file).map_err(|source| ScanError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let is_html = file.extension().is_some_and(|ext| ext == "html");
    if root != CONTENT && !is_html {
        return Ok(Node::Leaf(Leaf::Asset(bytes)));
    }
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Node::text(text.lines())),
        Err(err) if root == CONTENT => Ok(Node::Leaf(Leaf::Asset(err.into_bytes()))),
        Err(err) => Err(ScanError::Io {
            path: file.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
        }),
    }
}
