//! Template preprocessing
//!
//! Word splits literal text across runs freely (spell-check boundaries,
//! formatting changes), so a command's open and close delimiters routinely
//! land in different `w:t` nodes. This pass re-distributes text so that every
//! command lives inside exactly one text node before the walker runs.

use crate::error::{DocxlabError, Result};
use crate::node::{tags, NodeId, Tree};
use crate::render::Delimiters;

/// True when `text` ends inside a command: delimiters toggle an in-command
/// state as they are encountered left to right.
fn ends_in_command(text: &str, delimiters: &Delimiters) -> bool {
    let mut in_cmd = false;
    let mut pos = 0;
    while pos < text.len() {
        let needle = if in_cmd {
            &delimiters.close
        } else {
            &delimiters.open
        };
        match text[pos..].find(needle.as_str()) {
            Some(found) => {
                pos += found + needle.len();
                in_cmd = !in_cmd;
            }
            None => break,
        }
    }
    in_cmd
}

/// Create an empty text node inside a fresh `w:t` inserted right after the
/// `w:t` hosting `text_node`, and return the new text node.
fn insert_text_sibling_after(tree: &mut Tree, text_node: NodeId, text: String) -> Result<NodeId> {
    let t_node = tree
        .parent(text_node)
        .filter(|&p| tree.tag(p) == Some(tags::T))
        .ok_or_else(|| {
            DocxlabError::TemplateParse("text node not within w:t".to_string())
        })?;
    let t_parent = tree
        .parent(t_node)
        .ok_or_else(|| DocxlabError::TemplateParse("w:t node has no parent".to_string()))?;
    let idx = tree
        .child_index(t_node)
        .ok_or_else(|| DocxlabError::TemplateParse("node not found in parent".to_string()))?;

    let new_t = tree.clone_shallow(t_node);
    let new_text = tree.text_node(text);
    tree.append_child(new_t, new_text);
    tree.insert_child(t_parent, idx + 1, new_t);
    Ok(new_text)
}

/// Text nodes hosted by a `w:t`, in document order.
fn command_text_nodes(tree: &Tree, root: NodeId) -> Vec<NodeId> {
    tree.descendants(root)
        .into_iter()
        .filter(|&id| {
            tree.is_text(id)
                && tree
                    .parent(id)
                    .is_some_and(|parent| tree.tag(parent) == Some(tags::T))
        })
        .collect()
}

/// Guarantee that every command is contained in exactly one text node.
///
/// When a command opens in one text node and closes in a later one, the text
/// up to and including the close is merged into the first node (the first
/// run's formatting wins; acceptable because that text is consumed as a
/// command, not rendered), and anything after the close moves to a new
/// sibling `w:t`. A command left open at the end of the part is a syntax
/// error.
pub fn preprocess_template(tree: &mut Tree, root: NodeId, delimiters: &Delimiters) -> Result<()> {
    let mut text_nodes = command_text_nodes(tree, root);

    let mut i = 0;
    while i < text_nodes.len() {
        let node = text_nodes[i];
        while ends_in_command(tree.text(node).unwrap_or(""), delimiters) {
            let mut merged = String::new();
            let mut close_at = None;
            for (offset, &later) in text_nodes[i + 1..].iter().enumerate() {
                let later_text = tree.text(later).unwrap_or("").to_string();
                match later_text.find(delimiters.close.as_str()) {
                    Some(pos) => {
                        let end = pos + delimiters.close.len();
                        merged.push_str(&later_text[..end]);
                        close_at = Some((offset, later_text[end..].to_string()));
                        break;
                    }
                    None => merged.push_str(&later_text),
                }
            }

            let Some((offset, remainder)) = close_at else {
                return Err(DocxlabError::CommandSyntax(format!(
                    "command open delimiter '{}' is never closed",
                    delimiters.open
                )));
            };

            // Consume the merged text nodes and grow the first one.
            for &consumed in &text_nodes[i + 1..=i + 1 + offset] {
                tree.set_text(consumed, String::new());
            }
            let mut text = tree.text(node).unwrap_or("").to_string();
            text.push_str(&merged);
            tree.set_text(node, text);

            if !remainder.is_empty() {
                let new_node = insert_text_sibling_after(tree, node, remainder)?;
                text_nodes.insert(i + 1, new_node);
            }
        }
        i += 1;
    }

    Ok(())
}
