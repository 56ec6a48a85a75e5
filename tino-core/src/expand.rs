//! Partial expansion.
//!
//! [`Expander::resolve`] rewrites a template in place: every directive naming
//! an `.html` partial is replaced by that partial's own resolved lines,
//! repeated or multiplied over a content collection. Resolution is depth-first
//! and memoized in the tree itself: once a node holds [`Leaf::Resolved`] it is
//! returned as-is, so including a partial twice yields identical lines.
//!
//! Field directives (`<== title`) are left for the binder, as are item
//! directives inside list templates, which belong to the list generator.

use std::collections::BTreeMap;

use log::debug;
use thiserror::Error;

use crate::binder::bind;
use crate::collection::CollectionRef;
use crate::directive::{Count, Directive, DirectiveError, Reference, Role};
use crate::output::resolve_root_markers;
use crate::placeholder::{Aggregate, Placeholders};
use crate::tree::{Leaf, Node, PARTIALS, STATIC, SiteTree, TreePath};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("{template}:{line}: {source}")]
    Directive {
        template: TreePath,
        line: usize,
        source: DirectiveError,
    },
    #[error("{template}:{line}: partial `{reference}` does not exist")]
    MissingPartial {
        reference: String,
        template: TreePath,
        line: usize,
    },
    #[error("{template}:{line}: `{reference}` includes itself ({chain})")]
    Cycle {
        reference: String,
        template: TreePath,
        line: usize,
        chain: String,
    },
    #[error("{template}:{line}: count `{count}` cannot be used with `{reference}`")]
    InvalidCount {
        reference: String,
        count: Count,
        template: TreePath,
        line: usize,
    },
    #[error("template `{0}` does not exist")]
    MissingTemplate(TreePath),
    #[error("{template}: list template has no item directive")]
    MissingItemDirective { template: TreePath },
    #[error("{template}: generated `{path}` would overwrite another file")]
    OutputCollision { path: TreePath, template: TreePath },
    #[error("{template}:{line}: list template already has an item directive on line {first}")]
    DuplicateItemDirective {
        template: TreePath,
        line: usize,
        first: usize,
    },
}

/// Aggregate counts gathered while resolving one template.
#[derive(Debug, Default)]
pub struct ResolveContext {
    /// collection key → (total, most taken)
    collections: BTreeMap<String, (usize, usize)>,
}

impl ResolveContext {
    pub fn record(&mut self, collection: String, total: usize, taken: usize) {
        let entry = self.collections.entry(collection).or_insert((total, 0));
        entry.1 = entry.1.max(taken);
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn placeholders(&self) -> Placeholders {
        let mut placeholders = Placeholders::new();
        for (collection, &(total, taken)) in &self.collections {
            for aggregate in Aggregate::ALL {
                placeholders.insert(aggregate.key(collection), aggregate.value(total, taken));
            }
        }
        placeholders
    }
}

pub fn partial_path(name: &str) -> TreePath {
    TreePath::parse(PARTIALS).join(name)
}

/// Depth of the pages a page template produces below the output root.
///
/// Pages land beside the template's own directory and get pretty URLs, so
/// `static/blog/post.page.html` writes `blog/<name>/index.html`, two levels
/// down.
pub fn page_depth(template: &TreePath) -> usize {
    template.len().saturating_sub(1)
}

pub struct Expander<'t> {
    tree: &'t mut SiteTree,
    in_progress: Vec<TreePath>,
}

impl<'t> Expander<'t> {
    pub fn new(tree: &'t mut SiteTree) -> Self {
        Self {
            tree,
            in_progress: Vec::new(),
        }
    }

    /// Resolve every template under `partials/` and `static/` except page and
    /// list templates, which the generators resolve when they consume them.
    pub fn resolve_all(&mut self) -> Result<usize, ResolveError> {
        let mut resolved = 0;
        for root in [PARTIALS, STATIC] {
            for path in self.tree.leaf_paths(&TreePath::parse(root)) {
                match path.name().and_then(Role::of) {
                    Some(Role::Page | Role::List) | None => continue,
                    Some(_) => {}
                }
                if matches!(self.tree.leaf(&path), Some(Leaf::Text(_))) {
                    self.resolve(&path)?;
                    resolved += 1;
                }
            }
        }
        Ok(resolved)
    }

    /// Fully resolve `template`, store the result in the tree and return it.
    pub fn resolve(&mut self, template: &TreePath) -> Result<Vec<String>, ResolveError> {
        let lines = match self.tree.leaf(template) {
            Some(Leaf::Resolved(lines)) => return Ok(lines.clone()),
            Some(Leaf::Text(lines)) => lines.clone(),
            _ => return Err(ResolveError::MissingTemplate(template.clone())),
        };
        debug!("Resolving {template}");

        self.in_progress.push(template.clone());
        let expanded = self.expand_lines(template, &lines);
        self.in_progress.pop();
        let mut resolved = expanded?;

        if template.name().and_then(Role::of) == Some(Role::Page) {
            let depth = page_depth(template);
            resolved = resolved
                .iter()
                .map(|line| resolve_root_markers(line, depth))
                .collect();
        }

        self.tree
            .insert(template, Node::Leaf(Leaf::Resolved(resolved.clone())));
        Ok(resolved)
    }

    fn expand_lines(
        &mut self,
        template: &TreePath,
        lines: &[String],
    ) -> Result<Vec<String>, ResolveError> {
        let role = template.name().and_then(Role::of);
        let mut context = ResolveContext::default();
        let mut out = Vec::with_capacity(lines.len());

        for (index, line) in lines.iter().enumerate() {
            let at = index + 1;
            let directive = match Directive::parse(line) {
                Ok(Some(directive)) => directive,
                Ok(None) => {
                    out.push(line.clone());
                    continue;
                }
                Err(source) => {
                    return Err(ResolveError::Directive {
                        template: template.clone(),
                        line: at,
                        source,
                    });
                }
            };
            let Some(reference) = directive.reference() else {
                out.push(line.clone());
                continue;
            };
            let included_role = reference.role();
            if role == Some(Role::List) && included_role == Role::Item {
                out.push(line.clone());
                continue;
            }

            let included = self.include(template, at, &reference)?;
            let expanded = match directive.repeat() {
                Count::PerTag => {
                    out.push(line.clone());
                    continue;
                }
                count if included_role == Role::Item => {
                    self.multiply(&reference, &included, count, &mut context)
                }
                Count::Times(n) => (0..n).flat_map(|_| included.iter().cloned()).collect(),
                count @ Count::All => {
                    return Err(ResolveError::InvalidCount {
                        reference: directive.source.clone(),
                        count,
                        template: template.clone(),
                        line: at,
                    });
                }
            };
            out.extend(directive.indent_all(&expanded));
        }

        if !context.is_empty() {
            out = bind(&out, &context.placeholders(), &*self.tree);
        }
        Ok(out)
    }

    /// Resolve the partial named by `reference`, checking it exists and is
    /// not already being resolved further up.
    fn include(
        &mut self,
        template: &TreePath,
        line: usize,
        reference: &Reference<'_>,
    ) -> Result<Vec<String>, ResolveError> {
        let partial = partial_path(reference.name);
        if self.tree.leaf(&partial).and_then(Leaf::lines).is_none() {
            return Err(ResolveError::MissingPartial {
                reference: reference.name.to_string(),
                template: template.clone(),
                line,
            });
        }
        if self.in_progress.contains(&partial) {
            let chain = self
                .in_progress
                .iter()
                .chain(std::iter::once(&partial))
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ResolveError::Cycle {
                reference: reference.name.to_string(),
                template: template.clone(),
                line,
                chain,
            });
        }
        self.resolve(&partial)
    }

    /// Bind the item template once per record of the referenced collection.
    fn multiply(
        &self,
        reference: &Reference<'_>,
        item: &[String],
        count: Count,
        context: &mut ResolveContext,
    ) -> Vec<String> {
        let collection = match reference.prefix {
            Some(prefix) => CollectionRef::parse(prefix),
            None => CollectionRef::implied_by(reference.name),
        };
        let records = collection.gather(&*self.tree);
        let take = match count {
            Count::Times(n) => n.min(records.len()),
            Count::All | Count::PerTag => records.len(),
        };
        context.record(collection.key(), records.len(), take);

        records[..take]
            .iter()
            .flat_map(|record| bind(item, *record, &*self.tree))
            .collect()
    }
}
