use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{DocxlabError, Result};
use crate::node::{NodeId, Tree};

fn parse_attributes(start: &BytesStart) -> Result<BTreeMap<String, String>> {
    let mut attrs = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DocxlabError::TemplateParse(format!("bad attribute: {e}")))?;
        // Namespace prefixes stay part of the stored name (`w:val`, `r:id`).
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| DocxlabError::TemplateParse(format!("bad attribute value: {e}")))?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// Parse an XML string into a tree, returning the root element.
///
/// Character data is kept only when non-empty after trimming; elements store
/// their full `prefix:local` tag name.
pub fn parse_xml(xml: &str) -> Result<(Tree, NodeId)> {
    let mut reader = Reader::from_str(xml);
    let mut tree = Tree::new();
    let mut root: Option<NodeId> = None;
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let node = tree.element(tag, parse_attributes(&start)?);
                match stack.last() {
                    Some(&parent) => tree.append_child(parent, node),
                    None => {
                        if root.is_none() {
                            root = Some(node);
                        }
                    }
                }
                stack.push(node);
            }
            Ok(Event::Empty(start)) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let node = tree.element(tag, parse_attributes(&start)?);
                match stack.last() {
                    Some(&parent) => tree.append_child(parent, node),
                    None => {
                        if root.is_none() {
                            root = Some(node);
                        }
                    }
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(text)) => {
                if let Some(&parent) = stack.last() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| DocxlabError::TemplateParse(format!("bad text: {e}")))?;
                    let trimmed = unescaped.trim();
                    if !trimmed.is_empty() {
                        let node = tree.text_node(trimmed);
                        tree.append_child(parent, node);
                    }
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(&parent) = stack.last() {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        let node = tree.text_node(trimmed);
                        tree.append_child(parent, node);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DocxlabError::TemplateParse(format!(
                    "XML parsing error: {e}"
                )))
            }
        }
    }

    let root = root.ok_or_else(|| DocxlabError::TemplateParse("empty XML document".into()))?;
    Ok((tree, root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_prefixed_names() {
        let (tree, root) =
            parse_xml(r#"<w:document xmlns:w="ns"><w:body><w:p/></w:body></w:document>"#).unwrap();
        assert_eq!(tree.tag(root), Some("w:document"));
        assert_eq!(tree.attr(root, "xmlns:w"), Some("ns"));
        let body = tree.children(root)[0];
        assert_eq!(tree.tag(body), Some("w:body"));
        assert_eq!(tree.tag(tree.children(body)[0]), Some("w:p"));
    }

    #[test]
    fn test_parse_drops_whitespace_only_text() {
        let (tree, root) = parse_xml("<a>\n  <b>hello</b>\n</a>").unwrap();
        assert_eq!(tree.children(root).len(), 1);
        let b = tree.children(root)[0];
        assert_eq!(tree.text(tree.children(b)[0]), Some("hello"));
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let (tree, root) = parse_xml("<a>x &amp; y</a>").unwrap();
        assert_eq!(tree.text(tree.children(root)[0]), Some("x & y"));
    }

    #[test]
    fn test_parse_malformed_is_an_error() {
        assert!(parse_xml("<a><b></a>").is_err());
    }
}
