//! Template rendering
//!
//! The render pipeline: [`preprocess_template`] normalises how commands are
//! distributed across text runs, then [`produce_report`] walks the template
//! and output trees simultaneously, evaluating directives, expanding loops
//! and conditionals, and collecting generated images, hyperlinks, and HTML
//! chunks for the container layer to wire in.
//!
//! ## Command syntax
//!
//! - Insertion: `+++name+++`, `+++INS $item.field+++`, `+++= expr+++`
//! - Loops: `+++FOR item IN items+++` ... `+++END-FOR item+++`
//! - Conditionals: `+++IF score >= 80+++` ... `+++END-IF+++`
//! - Inline objects: `+++IMAGE img+++`, `+++LINK repo+++`, `+++HTML chunk+++`
//! - Shorthands: `+++ALIAS name body+++`, then `+++*name+++`

pub mod commands;
pub mod eval;
pub mod value;

mod context;
mod handlers;
mod preprocess;
mod walker;

use std::collections::BTreeMap;

use crate::error::{DocxlabError, Result};
use crate::node::{NodeId, Tree};
use crate::render::value::{default_functions, Functions, ImagePars, LinkPars, ReportData};

pub use preprocess::preprocess_template;

pub const DEFAULT_CMD_DELIMITER: &str = "+++";
pub const DEFAULT_LITERAL_XML_DELIMITER: &str = "||";
pub const DEFAULT_MAXIMUM_WALK_DEPTH: usize = 1_000_000;
/// Seed for image and shape ids; high enough not to collide with ids already
/// present in a template, and fixed so identical inputs produce identical
/// output bytes.
pub const DEFAULT_IMAGE_AND_SHAPE_ID_INCREMENT: usize = 73_086_257;

/// Open and close command delimiters; the two may be equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: DEFAULT_CMD_DELIMITER.to_string(),
            close: DEFAULT_CMD_DELIMITER.to_string(),
        }
    }
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Callback substituting a string for a failed command; receives the error
/// and the raw command text.
pub type ErrorHandler = Box<dyn Fn(&DocxlabError, &str) -> String + Send + Sync>;

/// Options for a single render.
pub struct ReportOptions {
    pub cmd_delimiter: Delimiters,
    pub literal_xml_delimiter: String,
    pub process_line_breaks: bool,
    /// Translate `\n` in inserted values into a close-text / break /
    /// open-text triplet instead of a bare `<w:br/>`.
    pub process_line_breaks_as_new_text: bool,
    pub fail_fast: bool,
    /// Treat null or missing INS results as errors instead of empty output.
    pub reject_nullish: bool,
    pub error_handler: Option<ErrorHandler>,
    pub fix_smart_quotes: bool,
    pub maximum_walk_depth: usize,
    pub functions: Functions,
    pub image_and_shape_id_increment: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            cmd_delimiter: Delimiters::default(),
            literal_xml_delimiter: DEFAULT_LITERAL_XML_DELIMITER.to_string(),
            process_line_breaks: true,
            process_line_breaks_as_new_text: false,
            fail_fast: false,
            reject_nullish: false,
            error_handler: None,
            fix_smart_quotes: false,
            maximum_walk_depth: DEFAULT_MAXIMUM_WALK_DEPTH,
            functions: default_functions(),
            image_and_shape_id_increment: DEFAULT_IMAGE_AND_SHAPE_ID_INCREMENT,
        }
    }
}

impl std::fmt::Debug for ReportOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportOptions")
            .field("cmd_delimiter", &self.cmd_delimiter)
            .field("literal_xml_delimiter", &self.literal_xml_delimiter)
            .field("process_line_breaks", &self.process_line_breaks)
            .field(
                "process_line_breaks_as_new_text",
                &self.process_line_breaks_as_new_text,
            )
            .field("fail_fast", &self.fail_fast)
            .field("reject_nullish", &self.reject_nullish)
            .field("error_handler", &self.error_handler.is_some())
            .field("fix_smart_quotes", &self.fix_smart_quotes)
            .field("maximum_walk_depth", &self.maximum_walk_depth)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field(
                "image_and_shape_id_increment",
                &self.image_and_shape_id_increment,
            )
            .finish()
    }
}

/// Outcome of a walk: the output tree plus everything the host must wire
/// into the container (media parts, relationships, content types).
#[derive(Debug)]
pub struct RenderResult {
    pub tree: Tree,
    pub root: NodeId,
    pub images: BTreeMap<String, ImagePars>,
    pub links: BTreeMap<String, LinkPars>,
    pub htmls: BTreeMap<String, String>,
    pub query: Option<String>,
    /// Per-command errors collected when `fail_fast` is off; the output above
    /// is the partial render.
    pub errors: Vec<DocxlabError>,
}

/// Expand a preprocessed template against the data binding.
///
/// With `fail_fast` set the first error aborts; otherwise errors accumulate
/// in [`RenderResult::errors`] and the walk continues.
pub fn produce_report(
    data: &ReportData,
    template: &mut Tree,
    root: NodeId,
    options: &ReportOptions,
) -> Result<RenderResult> {
    walker::walk_template(data, template, root, options, false)
}

/// Pre-scan a template for a `QUERY` command at its head without producing
/// output; ordinary commands are not executed.
pub fn extract_query(
    template: &mut Tree,
    root: NodeId,
    options: &ReportOptions,
) -> Result<Option<String>> {
    let data = ReportData::new();
    let result = walker::walk_template(&data, template, root, options, true)?;
    Ok(result.query)
}

#[cfg(test)]
mod tests;
