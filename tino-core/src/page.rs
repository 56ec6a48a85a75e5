use std::collections::BTreeSet;

use log::{debug, info};

use crate::binder::bind;
use crate::collection::template_scope;
use crate::expand::{Expander, ResolveError};
use crate::record::ContentRecord;
use crate::tree::{CONTENT, Leaf, Node, STATIC, SiteTree, TreePath};

/// Render `template` once for every content file directly inside its scope,
/// then drop the template. Returns the number of pages generated.
pub fn generate_pages(tree: &mut SiteTree, template: &TreePath) -> Result<usize, ResolveError> {
    let lines = Expander::new(tree).resolve(template)?;
    let scope = template_scope(template);
    let content_dir = TreePath::parse(CONTENT).join_path(&scope);
    let output_dir = TreePath::parse(STATIC);

    let records: Vec<ContentRecord> = tree
        .child_leaves(&content_dir)
        .iter()
        .filter_map(|path| tree.leaf(path).and_then(Leaf::record).cloned())
        .collect();

    let pages: Vec<(TreePath, Vec<String>)> = records
        .iter()
        .map(|record| {
            let output = output_dir.join_path(&record.output_path());
            (output, bind(&lines, record, &*tree))
        })
        .collect();

    let generated = insert_generated(tree, template, pages)?;
    tree.remove(template);

    info!("{template}: generated {generated} pages from {content_dir}");
    Ok(generated)
}

/// Store generated documents. Nothing already in the tree is overwritten and
/// no path may be generated twice; on a collision nothing is stored.
pub(crate) fn insert_generated(
    tree: &mut SiteTree,
    template: &TreePath,
    outputs: Vec<(TreePath, Vec<String>)>,
) -> Result<usize, ResolveError> {
    let mut seen = BTreeSet::new();
    for (path, _) in &outputs {
        if tree.get(path).is_some() || !seen.insert(path) {
            return Err(ResolveError::OutputCollision {
                path: path.clone(),
                template: template.clone(),
            });
        }
    }

    let generated = outputs.len();
    for (path, lines) in outputs {
        debug!("Generated {path}");
        tree.insert(&path, Node::Leaf(Leaf::Resolved(lines)));
    }
    Ok(generated)
}
