//! docxlab-core — template expansion engine for Office Open XML
//! word-processing documents.
//!
//! A template `.docx` carries commands inside its text runs
//! (`+++name+++`, `+++FOR item IN items+++`, `+++IMAGE logo+++`, ...). The
//! engine preprocesses the document so every command lives in a single text
//! node, then walks the template and output trees simultaneously, evaluating
//! commands against a data binding and emitting a structurally valid copy
//! with repetition and conditional blocks expanded.
//!
//! ```no_run
//! use docxlab_core::{create_report_from_file, ReportData, ReportOptions, Value};
//!
//! let mut data = ReportData::new();
//! data.insert("name", Value::from("John"));
//! let bytes =
//!     create_report_from_file("template.docx", &data, &ReportOptions::default()).unwrap();
//! std::fs::write("out.docx", bytes).unwrap();
//! ```

pub mod archive;
pub mod docx;
pub mod error;
pub mod node;
pub mod render;
pub mod xml;

pub use docx::{create_report, create_report_from_file, document_text, extract_query, parse_template};
pub use error::{DocxlabError, Result};
pub use render::value::{Function, Functions, ImagePars, LinkPars, ReportData, Value};
pub use render::{
    preprocess_template, produce_report, Delimiters, RenderResult, ReportOptions,
};
