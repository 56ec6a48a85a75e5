use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Everything one build pass needs to know.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BuildOptions {
    /// Directory holding `partials/`, `content/` and `static/`.
    pub source: PathBuf,
    pub output: PathBuf,
    /// Skip content entirely; page and list templates are dropped.
    pub exclude_content: bool,
    /// Emit a listing per tag next to each unfiltered listing.
    pub tag_lists: bool,
    /// Remove the output directory before writing.
    pub clean: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            output: PathBuf::from("dist"),
            exclude_content: false,
            tag_lists: true,
            clean: true,
        }
    }
}
