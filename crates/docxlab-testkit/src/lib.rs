//! Test utilities for docxlab
//!
//! Builds minimal but structurally valid `.docx` archives in memory so tests
//! never depend on fixture files on disk, and reads parts back out of
//! generated archives for assertions.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// A 50x50 single-colour PNG.
pub const TINY_PNG: &[u8] = &[
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 50, 0, 0, 0, 50, 8, 2,
    0, 0, 0, 145, 93, 31, 230, 0, 0, 0, 30, 73, 68, 65, 84, 120, 156, 237, 193, 49, 1, 0, 0, 0,
    194, 160, 245, 79, 109, 8, 95, 160, 0, 0, 0, 0, 0, 0, 248, 13, 29, 126, 0, 1, 10, 82, 239, 54,
    0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
</Relationships>"#;

/// Wrap body content into a complete main document part.
pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
    <w:body>
{body}
    </w:body>
</w:document>"#
    )
}

/// A paragraph holding a single text run.
pub fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r></w:p>")
}

/// Build a docx archive around the given main document part.
pub fn docx_bytes(document: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let parts: [(&str, &[u8]); 4] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("word/document.xml", document.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
    ];
    for (name, data) in parts {
        writer.start_file(name, options).expect("start zip entry");
        writer.write_all(data).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Build a docx archive whose body consists of the given paragraphs.
pub fn docx_with_paragraphs(texts: &[&str]) -> Vec<u8> {
    let body: String = texts
        .iter()
        .map(|t| paragraph(t))
        .collect::<Vec<_>>()
        .join("\n");
    docx_bytes(&document_xml(&body))
}

/// Names of every part in an archive.
pub fn part_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes.to_vec())).expect("open archive");
    archive.file_names().map(str::to_owned).collect()
}

/// Read one part out of an archive.
pub fn read_part(bytes: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).expect("open archive");
    let mut file = archive.by_name(name).ok()?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).expect("read part");
    Some(data)
}

/// Read one part out of an archive as text.
pub fn read_part_text(bytes: &[u8], name: &str) -> Option<String> {
    read_part(bytes, name).map(|data| String::from_utf8(data).expect("part is UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_round_trips() {
        let bytes = docx_with_paragraphs(&["hello"]);
        let names = part_names(&bytes);
        assert!(names.contains(&"[Content_Types].xml".to_string()));
        assert!(names.contains(&"word/document.xml".to_string()));

        let document = read_part_text(&bytes, "word/document.xml").unwrap();
        assert!(document.contains("hello"));
        assert_eq!(read_part(&bytes, "missing"), None);
    }
}
