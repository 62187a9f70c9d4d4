//! Fixtures shared by the render tests.

use std::collections::BTreeMap;

use crate::docx::document_text;
use crate::error::Result;
use crate::render::value::{ImagePars, ReportData, Value};
use crate::render::{preprocess_template, produce_report, RenderResult, ReportOptions};
use crate::xml::{build_xml, parse_xml, XmlOptions};

pub fn document(body: &str) -> String {
    format!(
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    )
}

pub fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r></w:p>")
}

/// A document whose body is one paragraph per entry.
pub fn document_of(paragraphs: &[&str]) -> String {
    let body: String = paragraphs.iter().map(|t| paragraph(t)).collect();
    document(&body)
}

/// A paragraph with one `w:t` per entry; block commands (FOR/IF and their
/// ENDs) must live in their own text run so the walker can jump back to the
/// run and re-walk the body.
pub fn runs_paragraph(texts: &[&str]) -> String {
    let runs: String = texts
        .iter()
        .map(|t| format!("<w:t xml:space=\"preserve\">{t}</w:t>"))
        .collect();
    format!("<w:p><w:r>{runs}</w:r></w:p>")
}

pub fn render_with(
    xml: &str,
    data: &ReportData,
    options: &ReportOptions,
) -> Result<RenderResult> {
    let (mut tree, root) = parse_xml(xml)?;
    preprocess_template(&mut tree, root, &options.cmd_delimiter)?;
    produce_report(data, &mut tree, root, options)
}

pub fn render(xml: &str, data: &ReportData) -> RenderResult {
    render_with(xml, data, &ReportOptions::default()).expect("render succeeds")
}

/// The visible text of a render, one line per non-empty text node.
pub fn rendered_text(result: &RenderResult) -> String {
    document_text(&result.tree, result.root)
}

/// The serialised main part of a render.
pub fn rendered_xml(result: &RenderResult) -> String {
    build_xml(&result.tree, result.root, &XmlOptions::default())
}

pub fn scalar_data() -> ReportData {
    [
        ("name", Value::from("John")),
        ("surname", Value::from("Doe")),
        ("age", Value::Int(25)),
        ("score", Value::Int(85)),
        ("isActive", Value::Bool(true)),
        ("isInactive", Value::Bool(false)),
    ]
    .into_iter()
    .collect()
}

fn map(pairs: &[(&str, Value)]) -> Value {
    Value::Map(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
    )
}

pub fn items_data() -> ReportData {
    [(
        "items",
        Value::List(vec![
            map(&[("name", Value::from("Item 1")), ("value", Value::Int(100))]),
            map(&[("name", Value::from("Item 2")), ("value", Value::Int(200))]),
            map(&[("name", Value::from("Item 3")), ("value", Value::Int(300))]),
        ]),
    )]
    .into_iter()
    .collect()
}

pub fn categories_data() -> ReportData {
    [(
        "categories",
        Value::List(vec![
            map(&[
                ("name", Value::from("Category 1")),
                (
                    "subitems",
                    Value::List(vec![Value::from("Sub 1.1"), Value::from("Sub 1.2")]),
                ),
            ]),
            map(&[
                ("name", Value::from("Category 2")),
                (
                    "subitems",
                    Value::List(vec![Value::from("Sub 2.1"), Value::from("Sub 2.2")]),
                ),
            ]),
        ]),
    )]
    .into_iter()
    .collect()
}

pub fn tiny_image() -> Value {
    Value::Image(ImagePars {
        width: 5.0,
        height: 5.0,
        data: vec![0x89, b'P', b'N', b'G'],
        extension: ".png".to_string(),
        caption: None,
    })
}

/// Positions of `needles` inside `haystack`, asserting each is present and
/// that they appear in the given order.
pub fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut from = 0;
    for needle in needles {
        match haystack[from..].find(needle) {
            Some(pos) => from += pos + needle.len(),
            None => panic!("expected '{needle}' (in order) in:\n{haystack}"),
        }
    }
}
