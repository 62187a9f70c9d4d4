use crate::node::{NodeId, NodeKind, Tree};

/// Serialiser options.
#[derive(Debug, Clone)]
pub struct XmlOptions {
    /// Text between two occurrences of this marker is emitted verbatim.
    pub literal_xml_delimiter: String,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            literal_xml_delimiter: "||".to_string(),
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Escape `text`, splicing runs between two literal-XML markers verbatim.
fn write_text(text: &str, delimiter: &str, out: &mut String) {
    let mut literal = false;
    for segment in text.split(delimiter) {
        if literal {
            out.push_str(segment);
        } else {
            escape_text(segment, out);
        }
        literal = !literal;
    }
}

fn write_node(tree: &Tree, id: NodeId, opts: &XmlOptions, out: &mut String) {
    match tree.kind(id) {
        NodeKind::Text(text) => write_text(text, &opts.literal_xml_delimiter, out),
        NodeKind::Element { tag, attrs } => {
            out.push('<');
            out.push_str(tag);
            for (key, value) in attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            let children = tree.children(id);
            if children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for &child in children {
                    write_node(tree, child, opts, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

/// Serialise the subtree rooted at `root` as an XML 1.0 document.
pub fn build_xml(tree: &Tree, root: NodeId, opts: &XmlOptions) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    write_node(tree, root, opts, &mut out);
    out
}
