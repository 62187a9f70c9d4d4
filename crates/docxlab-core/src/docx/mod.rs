//! OOXML package handling
//!
//! Locates the main document part through `[Content_Types].xml`, runs the
//! render pipeline over it, and assembles the output archive: the rewritten
//! main part, media and HTML parts for generated inline objects, extended
//! relationships, and content-type defaults for any new extensions. All other
//! parts are byte-copied.

use std::collections::BTreeSet;
use std::path::Path;

use log::debug;

use crate::archive::{ZipSink, ZipStore};
use crate::error::{DocxlabError, Result};
use crate::node::{attrs, NodeId, NodeKind, Tree};
use crate::render::value::ReportData;
use crate::render::{preprocess_template, produce_report, RenderResult, ReportOptions};
use crate::xml::{build_xml, parse_xml, XmlOptions};

pub const TEMPLATE_PATH: &str = "word";
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

const MAIN_DOC_MIMES: [&str; 2] = [
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
    "application/vnd.ms-word.document.macroEnabled.main+xml",
];

const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const HYPERLINK_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const ALTCHUNK_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/aFChunk";

const EMPTY_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
</Relationships>"#;

/// Content type registered for each extension the engine can introduce.
fn content_type_for(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        "html" => Some("text/html"),
        _ => None,
    }
}

/// A template archive with its main document parsed.
pub struct ParsedTemplate {
    pub store: ZipStore,
    pub tree: Tree,
    pub root: NodeId,
    pub main_document: String,
    content_types: (Tree, NodeId),
}

/// The main document part named by the content-types file, relative to
/// `word/`.
fn get_main_doc(content_types: &Tree, root: NodeId) -> Result<String> {
    for &child in content_types.children(root) {
        let Some(content_type) = content_types.attr(child, "ContentType") else {
            continue;
        };
        if MAIN_DOC_MIMES.contains(&content_type) {
            if let Some(part_name) = content_types.attr(child, "PartName") {
                return Ok(part_name.replace("/word/", ""));
            }
        }
    }
    Err(DocxlabError::TemplateParse(format!(
        "could not find main document (e.g. document.xml) in {CONTENT_TYPES_PATH}"
    )))
}

/// Open a template archive and parse its main document.
pub fn parse_template(bytes: Vec<u8>) -> Result<ParsedTemplate> {
    let mut store = ZipStore::from_bytes(bytes)?;
    let ct_xml = store.read_text(CONTENT_TYPES_PATH)?;
    let (ct_tree, ct_root) = parse_xml(&ct_xml)?;
    let main_document = get_main_doc(&ct_tree, ct_root)?;

    let doc_xml = store.read_text(&format!("{TEMPLATE_PATH}/{main_document}"))?;
    let (tree, root) = parse_xml(&doc_xml)?;

    Ok(ParsedTemplate {
        store,
        tree,
        root,
        main_document,
        content_types: (ct_tree, ct_root),
    })
}

/// Generate a report document from template bytes and a data binding.
///
/// Errors collected during a non-fail-fast render are combined and returned;
/// use [`produce_report`] directly when the partial output matters.
pub fn create_report(
    template: Vec<u8>,
    data: &ReportData,
    options: &ReportOptions,
) -> Result<Vec<u8>> {
    let mut parsed = parse_template(template)?;
    preprocess_template(&mut parsed.tree, parsed.root, &options.cmd_delimiter)?;
    let mut result = produce_report(data, &mut parsed.tree, parsed.root, options)?;
    if !result.errors.is_empty() {
        return Err(DocxlabError::combined(std::mem::take(&mut result.errors)));
    }
    write_report(parsed, &result, options)
}

/// [`create_report`] over a template file on disk.
pub fn create_report_from_file(
    path: impl AsRef<Path>,
    data: &ReportData,
    options: &ReportOptions,
) -> Result<Vec<u8>> {
    let bytes = std::fs::read(&path).map_err(|e| {
        DocxlabError::TemplateParse(format!(
            "cannot read template '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    create_report(bytes, data, options)
}

/// Pre-scan a template for its `QUERY` command without rendering.
pub fn extract_query(template: Vec<u8>, options: &ReportOptions) -> Result<Option<String>> {
    let mut parsed = parse_template(template)?;
    preprocess_template(&mut parsed.tree, parsed.root, &options.cmd_delimiter)?;
    crate::render::extract_query(&mut parsed.tree, parsed.root, options)
}

/// Collect the text content of a tree in document order, one line per text
/// node.
pub fn document_text(tree: &Tree, root: NodeId) -> String {
    let mut lines = Vec::new();
    for id in tree.descendants(root) {
        if let NodeKind::Text(text) = tree.kind(id) {
            if !text.is_empty() {
                lines.push(text.as_str());
            }
        }
    }
    lines.join("\n")
}

fn read_rels(store: &mut ZipStore, rels_path: &str) -> Result<(Tree, NodeId)> {
    let rels_xml = match store.try_read_text(rels_path)? {
        Some(xml) if !xml.is_empty() => xml,
        _ => EMPTY_RELS.to_string(),
    };
    parse_xml(&rels_xml)
}

fn add_relationship(
    rels: &mut Tree,
    root: NodeId,
    id: &str,
    rel_type: &str,
    target: &str,
    target_mode: Option<&str>,
) {
    let mut rel_attrs = attrs([("Id", id), ("Type", rel_type), ("Target", target)]);
    if let Some(mode) = target_mode {
        rel_attrs.insert("TargetMode".to_string(), mode.to_string());
    }
    let rel = rels.element("Relationship", rel_attrs);
    rels.append_child(root, rel);
}

/// Add `<Default Extension=... ContentType=.../>` entries for extensions the
/// template did not already declare.
fn ensure_content_type_defaults(
    content_types: &mut Tree,
    root: NodeId,
    extensions: &BTreeSet<String>,
) {
    let known: BTreeSet<String> = content_types
        .children(root)
        .iter()
        .filter(|&&c| content_types.tag(c) == Some("Default"))
        .filter_map(|&c| content_types.attr(c, "Extension"))
        .map(str::to_lowercase)
        .collect();

    for extension in extensions {
        if known.contains(extension) {
            continue;
        }
        let Some(content_type) = content_type_for(extension) else {
            continue;
        };
        let default = content_types.element(
            "Default",
            attrs([
                ("Extension", extension.as_str()),
                ("ContentType", content_type),
            ]),
        );
        content_types.append_child(root, default);
    }
}

fn write_report(
    mut parsed: ParsedTemplate,
    result: &RenderResult,
    options: &ReportOptions,
) -> Result<Vec<u8>> {
    let xml_opts = XmlOptions {
        literal_xml_delimiter: options.literal_xml_delimiter.clone(),
    };
    let mut sink = ZipSink::new();

    let main_path = format!("{TEMPLATE_PATH}/{}", parsed.main_document);
    let rels_path = format!("{TEMPLATE_PATH}/_rels/{}.rels", parsed.main_document);
    let mut exclude = vec![main_path.clone()];

    let has_new_rels =
        !result.images.is_empty() || !result.links.is_empty() || !result.htmls.is_empty();
    if has_new_rels {
        debug!("extending {rels_path}");
        let (mut rels_tree, rels_root) = read_rels(&mut parsed.store, &rels_path)?;

        for (image_id, image) in &result.images {
            let image_name = format!(
                "template_{}_{}{}",
                parsed.main_document, image_id, image.extension
            );
            debug!("writing image {image_id} ({image_name})");
            sink.set(&format!("{TEMPLATE_PATH}/media/{image_name}"), &image.data)?;
            add_relationship(
                &mut rels_tree,
                rels_root,
                image_id,
                IMAGE_REL_TYPE,
                &format!("media/{image_name}"),
                None,
            );
        }

        for (link_id, link) in &result.links {
            add_relationship(
                &mut rels_tree,
                rels_root,
                link_id,
                HYPERLINK_REL_TYPE,
                &link.url,
                Some("External"),
            );
        }

        for (html_id, html) in &result.htmls {
            let html_name = format!("template_{}_{}.html", parsed.main_document, html_id);
            debug!("writing html chunk {html_id} ({html_name})");
            sink.set(&format!("{TEMPLATE_PATH}/{html_name}"), html.as_bytes())?;
            add_relationship(
                &mut rels_tree,
                rels_root,
                html_id,
                ALTCHUNK_REL_TYPE,
                &html_name,
                None,
            );
        }

        sink.set(
            &rels_path,
            build_xml(&rels_tree, rels_root, &xml_opts).as_bytes(),
        )?;
        exclude.push(rels_path);
    }

    // Content-type defaults for any extension the render introduced.
    let mut new_extensions: BTreeSet<String> = result
        .images
        .values()
        .map(|image| image.extension.trim_start_matches('.').to_lowercase())
        .collect();
    if !result.htmls.is_empty() {
        new_extensions.insert("html".to_string());
    }
    if !new_extensions.is_empty() {
        let (ct_tree, ct_root) = &mut parsed.content_types;
        ensure_content_type_defaults(ct_tree, *ct_root, &new_extensions);
        sink.set(
            CONTENT_TYPES_PATH,
            build_xml(ct_tree, *ct_root, &xml_opts).as_bytes(),
        )?;
        exclude.push(CONTENT_TYPES_PATH.to_string());
    }

    sink.set(
        &main_path,
        build_xml(&result.tree, result.root, &xml_opts).as_bytes(),
    )?;
    parsed.store.clone_except(&mut sink, &exclude)?;
    sink.into_bytes()
}
