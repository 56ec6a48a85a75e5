use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::config::BuildOptions;
use crate::directive::Role;
use crate::expand::{Expander, ResolveError};
use crate::list::generate_lists;
use crate::loader::{ScanError, SiteScanner};
use crate::markdown::{FormatError, format_record};
use crate::output::{HtmlFilter, OutputWriter, WriteError};
use crate::page::generate_pages;
use crate::tree::{CONTENT, Leaf, Node, OUTPUT, PARTIALS, STATIC, SiteTree, TreePath};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("source directory {0} does not exist")]
    MissingSourceDir(PathBuf),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// What one build pass produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub records: usize,
    pub templates: usize,
    pub pages: usize,
    pub listings: usize,
    pub written: Vec<PathBuf>,
}

pub struct SiteBuilder {
    options: BuildOptions,
    html_filter: Option<HtmlFilter>,
}

impl Default for SiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self::from_options(BuildOptions::default())
    }

    pub fn from_options(options: BuildOptions) -> Self {
        Self {
            options,
            html_filter: None,
        }
    }

    pub fn source_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.options.source = path.as_ref().to_path_buf();
        self
    }

    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.options.output = path.as_ref().to_path_buf();
        self
    }

    pub fn exclude_content(mut self, exclude: bool) -> Self {
        self.options.exclude_content = exclude;
        self
    }

    pub fn tag_lists(mut self, enabled: bool) -> Self {
        self.options.tag_lists = enabled;
        self
    }

    pub fn clean(mut self, clean: bool) -> Self {
        self.options.clean = clean;
        self
    }

    /// Post-process every HTML file as it is written.
    pub fn html_filter(mut self, filter: HtmlFilter) -> Self {
        self.html_filter = Some(filter);
        self
    }

    /// Load the source tree.
    pub fn build(self) -> Result<Site, BuildError> {
        let source = &self.options.source;
        if !source.is_dir() {
            return Err(BuildError::MissingSourceDir(source.clone()));
        }

        let mut scanner = SiteScanner::new(source);
        if self.options.exclude_content {
            scanner = scanner.without_content();
        }
        let tree = scanner.scan()?;

        Ok(Site {
            tree,
            options: self.options,
            html_filter: self.html_filter,
        })
    }
}

/// A loaded site, ready to be generated.
pub struct Site {
    tree: SiteTree,
    options: BuildOptions,
    html_filter: Option<HtmlFilter>,
}

impl Site {
    pub fn tree(&self) -> &SiteTree {
        &self.tree
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Run every stage and write the result to the output directory.
    pub fn render_all(mut self) -> Result<BuildReport, BuildError> {
        let mut report = BuildReport {
            records: self.format_content()?,
            templates: Expander::new(&mut self.tree).resolve_all()?,
            ..BuildReport::default()
        };
        info!(
            "Formatted {} content files, resolved {} templates",
            report.records, report.templates
        );

        self.generate(&mut report)?;
        self.finish();

        let mut writer = OutputWriter::new(&self.options.output)
            .clean(self.options.clean)
            .protect(&self.options.source);
        if let Some(filter) = self.html_filter.take() {
            writer = writer.html_filter(filter);
        }
        report.written = writer.write(&self.tree, &TreePath::parse(OUTPUT))?;
        Ok(report)
    }

    fn format_content(&mut self) -> Result<usize, FormatError> {
        let content = TreePath::parse(CONTENT);
        let mut formatted = 0;
        for path in self.tree.leaf_paths(&content) {
            let Some(Leaf::Text(lines)) = self.tree.leaf(&path) else {
                continue;
            };
            let Some(relative) = path.strip_prefix(&content) else {
                continue;
            };
            let record = format_record(&relative, lines)?;
            self.tree.insert(&path, Node::Leaf(Leaf::Record(record)));
            formatted += 1;
        }
        Ok(formatted)
    }

    /// Consume every page and list template under `static/`.
    fn generate(&mut self, report: &mut BuildReport) -> Result<(), ResolveError> {
        let templates: Vec<(TreePath, Role)> = self
            .tree
            .leaf_paths(&TreePath::parse(STATIC))
            .into_iter()
            .filter_map(|path| {
                let role = path.name().and_then(Role::of)?;
                matches!(role, Role::Page | Role::List).then_some((path, role))
            })
            .collect();

        if self.options.exclude_content {
            for (template, _) in &templates {
                debug!("Dropping {template}, content is excluded");
                self.tree.remove(template);
            }
            return Ok(());
        }

        for (template, _) in templates.iter().filter(|(_, role)| *role == Role::Page) {
            report.pages += generate_pages(&mut self.tree, template)?;
        }
        for (template, _) in templates.iter().filter(|(_, role)| *role == Role::List) {
            report.listings += generate_lists(&mut self.tree, template, self.options.tag_lists)?;
        }
        info!(
            "Generated {} pages and {} listing pages",
            report.pages, report.listings
        );
        Ok(())
    }

    /// Leave only the output root in the tree.
    fn finish(&mut self) {
        self.tree.remove(&TreePath::parse(PARTIALS));
        self.tree.remove(&TreePath::parse(CONTENT));
        let generated = self
            .tree
            .remove(&TreePath::parse(STATIC))
            .unwrap_or_else(Node::directory);
        self.tree.insert(&TreePath::parse(OUTPUT), generated);
    }
}

/// Load, generate and write a site in one go.
pub fn build_site(options: &BuildOptions) -> Result<BuildReport, BuildError> {
    SiteBuilder::from_options(options.clone())
        .build()?
        .render_all()
}
