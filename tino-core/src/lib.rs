//! Directive-driven static site generation.
//!
//! A site is three source roots: reusable `partials/`, markdown `content/`
//! and the `static/` templates that become the output. Templates pull in
//! partials and content fields with `<==` directives; `*.page.html` templates
//! produce a page per content file and `*.list.html` templates produce
//! paginated listings.

pub mod binder;
pub mod builder;
pub mod collection;
pub mod config;
pub mod directive;
pub mod expand;
pub mod list;
pub mod loader;
pub mod markdown;
pub mod output;
pub mod page;
pub mod placeholder;
pub mod record;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export main types
pub use builder::{BuildError, BuildReport, Site, SiteBuilder, build_site};
pub use config::BuildOptions;
pub use directive::{Count, Directive, DirectiveError, Role};
pub use expand::{Expander, ResolveError};
pub use loader::{ScanError, SiteScanner};
pub use markdown::{FormatError, format_record, render_markdown};
pub use output::{HtmlFilter, OutputWriter, WriteError};
pub use record::{ContentRecord, Value};
pub use tree::{Leaf, Node, SiteTree, TreePath};
