//! End-to-end report generation over real (in-memory) docx archives.

use docxlab_core::{
    create_report, create_report_from_file, extract_query, DocxlabError, Delimiters, ImagePars,
    LinkPars, ReportData, ReportOptions, Value,
};
use docxlab_testkit::{
    docx_bytes, docx_with_paragraphs, document_xml, paragraph, read_part, read_part_text,
    TINY_PNG,
};

fn scalar_data() -> ReportData {
    [
        ("name", Value::from("John")),
        ("surname", Value::from("Doe")),
    ]
    .into_iter()
    .collect()
}

fn main_document(output: &[u8]) -> String {
    read_part_text(output, "word/document.xml").expect("output has a main document")
}

#[test]
fn test_basic_data_processing() {
    let template = docx_with_paragraphs(&["+++name+++ +++surname+++"]);
    let output = create_report(template, &scalar_data(), &ReportOptions::default()).unwrap();
    let document = main_document(&output);
    assert!(document.contains("John Doe"));
}

#[test]
fn test_custom_delimiters() {
    let template = docx_with_paragraphs(&["{name}"]);
    let options = ReportOptions {
        cmd_delimiter: Delimiters::new("{", "}"),
        ..Default::default()
    };
    let output = create_report(template, &scalar_data(), &options).unwrap();
    assert!(main_document(&output).contains("John"));
}

#[test]
fn test_untouched_parts_are_cloned() {
    let template = docx_with_paragraphs(&["+++name+++"]);
    let output = create_report(template.clone(), &scalar_data(), &ReportOptions::default())
        .unwrap();
    // Root rels are copied through byte for byte.
    assert_eq!(
        read_part(&output, "_rels/.rels"),
        read_part(&template, "_rels/.rels")
    );
}

#[test]
fn test_image_processing() {
    let mut data = ReportData::new();
    data.insert(
        "img",
        Value::Image(ImagePars {
            width: 5.0,
            height: 5.0,
            data: TINY_PNG.to_vec(),
            extension: ".png".to_string(),
            caption: None,
        }),
    );
    let template = docx_with_paragraphs(&["+++IMAGE img+++"]);
    let output = create_report(template, &data, &ReportOptions::default()).unwrap();

    // The media part exists and carries the blob.
    let media_name = "word/media/template_document.xml_img73086258.png";
    assert_eq!(read_part(&output, media_name).as_deref(), Some(TINY_PNG));

    // Content types gained the png default.
    let content_types = read_part_text(&output, "[Content_Types].xml").unwrap();
    assert!(content_types.contains("image/png"));

    // The rels file references the image part.
    let rels = read_part_text(&output, "word/_rels/document.xml.rels").unwrap();
    assert!(rels.contains("media/template_document.xml_img73086258.png"));
    assert!(rels.contains("relationships/image"));
}

#[test]
fn test_link_processing() {
    let mut data = ReportData::new();
    data.insert(
        "projectLink",
        Value::Link(LinkPars {
            url: "https://github.com/project".to_string(),
            label: Some("Project Repository".to_string()),
        }),
    );
    let template = docx_with_paragraphs(&["+++LINK projectLink+++"]);
    let output = create_report(template, &data, &ReportOptions::default()).unwrap();

    assert!(main_document(&output).contains("Project Repository"));
    let rels = read_part_text(&output, "word/_rels/document.xml.rels").unwrap();
    assert!(rels.contains("https://github.com/project"));
    assert!(rels.contains("relationships/hyperlink"));
    assert!(rels.contains("TargetMode=\"External\""));
}

#[test]
fn test_html_processing() {
    let mut data = ReportData::new();
    data.insert("chunk", Value::Str("<html><b>hi</b></html>".to_string()));
    let template = docx_with_paragraphs(&["+++HTML chunk+++"]);
    let output = create_report(template, &data, &ReportOptions::default()).unwrap();

    let html = read_part_text(&output, "word/template_document.xml_html1.html").unwrap();
    assert_eq!(html, "<html><b>hi</b></html>");

    let content_types = read_part_text(&output, "[Content_Types].xml").unwrap();
    assert!(content_types.contains("text/html"));

    assert!(main_document(&output).contains("w:altChunk"));
}

#[test]
fn test_for_loop_end_to_end() {
    let mut data = ReportData::new();
    data.insert(
        "items",
        Value::List(vec![
            Value::from("alpha"),
            Value::from("beta"),
            Value::from("gamma"),
        ]),
    );
    let template = docx_with_paragraphs(&[
        "+++FOR item IN items+++",
        "* +++INS $item+++",
        "+++END-FOR item+++",
    ]);
    let output = create_report(template, &data, &ReportOptions::default()).unwrap();
    let document = main_document(&output);
    for needle in ["alpha", "beta", "gamma"] {
        assert!(document.contains(needle), "missing {needle}");
    }
}

#[test]
fn test_invalid_template_path() {
    let err = create_report_from_file(
        "definitely_not_here.docx",
        &ReportData::new(),
        &ReportOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, DocxlabError::TemplateParse(_)));
}

#[test]
fn test_template_without_content_types() {
    let err = create_report(vec![1, 2, 3], &ReportData::new(), &ReportOptions::default())
        .unwrap_err();
    assert!(matches!(err, DocxlabError::TemplateParse(_)));
}

#[test]
fn test_render_errors_surface_combined() {
    let template = docx_with_paragraphs(&["+++END-FOR item+++", "+++END-IF+++"]);
    let err = create_report(template, &scalar_data(), &ReportOptions::default()).unwrap_err();
    match err {
        DocxlabError::Multiple(errors) => assert_eq!(errors.len(), 2),
        DocxlabError::InvalidCommand { .. } => {}
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_extract_query() {
    let template = docx_with_paragraphs(&["+++QUERY SELECT * FROM users+++"]);
    let query = extract_query(template, &ReportOptions::default()).unwrap();
    assert_eq!(query.as_deref(), Some("SELECT * FROM users"));
}

#[test]
fn test_deterministic_bytes() {
    let mut data = ReportData::new();
    data.insert(
        "img",
        Value::Image(ImagePars {
            width: 2.0,
            height: 2.0,
            data: TINY_PNG.to_vec(),
            extension: ".png".to_string(),
            caption: None,
        }),
    );
    let template = docx_with_paragraphs(&["+++IMAGE img+++", "+++name+++"]);
    let mut data_with_name = data;
    data_with_name.insert("name", Value::from("John"));

    let a = create_report(
        template.clone(),
        &data_with_name,
        &ReportOptions::default(),
    )
    .unwrap();
    let b = create_report(template, &data_with_name, &ReportOptions::default()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_no_directive_template_preserves_text() {
    let body = format!("{}{}", paragraph("Hello world."), paragraph("Second."));
    let template = docx_bytes(&document_xml(&body));
    let output = create_report(template, &ReportData::new(), &ReportOptions::default()).unwrap();
    let document = main_document(&output);
    assert!(document.contains("Hello world."));
    assert!(document.contains("Second."));
}
