//! The two-tree walk
//!
//! Two cursors advance in lockstep: `node_in` over the preprocessed template
//! and `node_out` over the output tree under construction. Each iteration
//! performs one move (DOWN, SIDE, UP, or JUMP back to an open loop's
//! reference node) and then processes the landed node: cloning into the
//! output, running the command scanner on text inside `w:t`, collapsing
//! containers that held only commands, and attaching pending inline objects
//! at their host tags.

use log::debug;

use crate::error::{DocxlabError, Result};
use crate::node::{attrs, tags, NodeId, Tree};
use crate::render::context::{Context, Pending};
use crate::render::handlers::process_cmd;
use crate::render::value::ReportData;
use crate::render::{Delimiters, RenderResult, ReportOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Initial,
    Down,
    Side,
    Up,
    Jump,
}

pub(crate) fn walk_template(
    data: &ReportData,
    template: &mut Tree,
    root: NodeId,
    options: &ReportOptions,
    seek_query: bool,
) -> Result<RenderResult> {
    let mut ctx = Context::new(options, seek_query);
    let mut out = Tree::new();
    let out_root = out.adopt_shallow(template, root);

    let mut node_in = root;
    let mut node_out = out_root;
    let mut last_move = Move::Initial;
    let mut delta_jump: i32 = 0;
    let mut errors: Vec<DocxlabError> = Vec::new();
    let mut iterations: usize = 0;

    loop {
        iterations += 1;
        if iterations > options.maximum_walk_depth {
            return Err(DocxlabError::WalkDepthExceeded(options.maximum_walk_depth));
        }

        // =====================================================
        // Move the input cursor
        // =====================================================
        let mv = if ctx.f_jump {
            let Some(cur) = ctx.cur_loop() else {
                return Err(DocxlabError::TemplateParse(
                    "jump requested without an open loop".to_string(),
                ));
            };
            debug!("jumping back to level {}", cur.ref_node_level);
            delta_jump = ctx.level - cur.ref_node_level;
            node_in = cur.ref_node;
            ctx.level = cur.ref_node_level;
            ctx.f_jump = false;
            Move::Jump
        } else if template.first_child(node_in).is_some() && last_move != Move::Up {
            node_in = template.first_child(node_in).expect("just checked");
            ctx.level += 1;
            Move::Down
        } else if let Some(sibling) = template.next_sibling(node_in) {
            node_in = sibling;
            Move::Side
        } else if let Some(parent) = template.parent(node_in) {
            node_in = parent;
            ctx.level -= 1;
            Move::Up
        } else {
            debug!("walk finished after {iterations} iterations");
            break;
        };
        last_move = mv;

        // =====================================================
        // Drop the last generated output node in special cases
        // =====================================================
        // Containers created during a loop's exploring pass never appear in
        // the output, and neither does a paragraph/row/cell whose only
        // payload was commands.
        if mv != Move::Down {
            let mut f_remove = false;
            if let Some(tag) = out.tag(node_out) {
                let is_container = matches!(tag, tags::P | tags::TR | tags::TC);
                if (is_container || tag == tags::TBL) && ctx.is_loop_exploring() {
                    f_remove = true;
                } else if is_container {
                    let buf = &ctx.buffers[tag];
                    f_remove = buf.text.is_empty() && !buf.cmds.is_empty() && !buf.f_inserted_text;
                }
            }
            if f_remove {
                if let Some(parent) = out.parent(node_out) {
                    out.pop_child(parent);
                }
            }
        }

        // =====================================================
        // Handle an UP movement
        // =====================================================
        if mv == Move::Up {
            // The loop body turned out to begin one level higher than the
            // node the FOR was first seen on.
            if ctx.is_loop_exploring() {
                let promote = ctx
                    .cur_loop()
                    .map(|cur| cur.ref_node)
                    .and_then(|ref_node| template.parent(ref_node))
                    == Some(node_in);
                if promote {
                    let cur = ctx.cur_loop_mut().expect("exploring implies a loop");
                    cur.ref_node = node_in;
                    cur.ref_node_level -= 1;
                }
            }

            node_out = out.parent(node_out).ok_or_else(|| {
                DocxlabError::TemplateParse("template syntax error: output node has no parent".into())
            })?;
            let out_tag = out.tag(node_out).map(str::to_owned);

            // A pending image/link/html replaces the just-closed output node
            // once the walk exits its host tag.
            let pending = std::mem::take(&mut ctx.pending);
            match (pending, out_tag.as_deref()) {
                (Pending::Image { drawing, caption }, Some(tags::T)) => {
                    if let Some(parent) = out.parent(node_out) {
                        out.pop_child(parent);
                        out.append_child(parent, drawing);
                        for caption_node in caption {
                            out.append_child(parent, caption_node);
                        }
                        ctx.mark_inserted();
                    }
                }
                (Pending::Link { hyperlink }, Some(tags::R)) => {
                    if let Some(parent) = out.parent(node_out) {
                        out.pop_child(parent);
                        out.append_child(parent, hyperlink);
                        ctx.mark_inserted();
                    }
                }
                (Pending::Html { alt_chunk }, Some(tags::P)) => {
                    if let Some(parent) = out.parent(node_out) {
                        out.pop_child(parent);
                        out.append_child(parent, alt_chunk);
                        ctx.mark_inserted();
                    }
                }
                (other, _) => ctx.pending = other,
            }

            // A table cell must not end up without a paragraph or altChunk.
            if out_tag.as_deref() == Some(tags::TC) {
                let has_block = out
                    .children(node_out)
                    .iter()
                    .any(|&c| matches!(out.tag(c), Some(tags::P) | Some(tags::ALTCHUNK)));
                if !has_block {
                    let p = out.element(tags::P, attrs([]));
                    out.append_child(node_out, p);
                }
            }

            // Track the latest run properties for LINK formatting.
            match out_tag.as_deref() {
                Some(tags::RPR) => ctx.text_run_props_node = Some(node_out),
                Some(tags::R) => ctx.text_run_props_node = None,
                _ => {}
            }
        }

        // =====================================================
        // Node creation: DOWN | SIDE
        // =====================================================
        // Copies land in the output tree tentatively; a container that turns
        // out to hold only commands is dropped later.
        if mv == Move::Down || mv == Move::Side {
            if mv == Move::Side {
                node_out = out.parent(node_out).ok_or_else(|| {
                    DocxlabError::TemplateParse(
                        "template syntax error: output node has no parent".into(),
                    )
                })?;
            }

            match template.tag(node_in) {
                Some(tags::P) => ctx.reset_buffer(tags::P),
                Some(tags::TR) => ctx.reset_buffer(tags::TR),
                Some(tags::TC) => ctx.reset_buffer(tags::TC),
                _ => {}
            }

            let new_node = out.adopt_shallow(template, node_in);
            out.append_child(node_out, new_node);

            // Keep drawing-object ids unique across expanded copies.
            if !ctx.is_loop_exploring()
                && matches!(template.tag(node_in), Some(tags::DOCPR) | Some(tags::VSHAPE))
            {
                let id = ctx.next_shape_id();
                out.set_attr(new_node, "id", id);
            }

            let in_text_run = template.is_text(node_in)
                && template
                    .parent(node_in)
                    .is_some_and(|p| template.tag(p) == Some(tags::T));
            if in_text_run {
                match process_text(data, template, node_in, &mut out, &mut ctx) {
                    Ok(text) => out.set_text(new_node, text),
                    Err(e) => {
                        if options.fail_fast {
                            return Err(e);
                        }
                        errors.push(e);
                    }
                }
            }

            node_out = new_node;
        }

        // =====================================================
        // JUMP: ascend the output cursor to the loop's level
        // =====================================================
        if mv == Move::Jump {
            while delta_jump > 0 {
                node_out = out.parent(node_out).ok_or_else(|| {
                    DocxlabError::TemplateParse(
                        "template syntax error: output node has no parent".into(),
                    )
                })?;
                delta_jump -= 1;
            }
        }
    }

    // =====================================================
    // End-of-walk invariants
    // =====================================================
    if ctx.g_cnt_if != ctx.g_cnt_end_if {
        let err = DocxlabError::IncompleteConditional;
        if options.fail_fast {
            return Err(err);
        }
        errors.push(err);
    }
    if let Some(unterminated) = ctx.loops.iter().rev().find(|l| !l.is_if) {
        let err = DocxlabError::UnterminatedLoop(unterminated.var_name.clone());
        if options.fail_fast {
            return Err(err);
        }
        errors.push(err);
    }

    Ok(RenderResult {
        tree: out,
        root: out_root,
        images: ctx.images,
        links: ctx.links,
        htmls: ctx.htmls,
        query: ctx.query,
        errors,
    })
}

/// Split text into out-of-command and in-command segments; the in-command
/// state toggles at every delimiter boundary.
fn split_text_by_delimiters(text: &str, delimiters: &Delimiters) -> Vec<String> {
    text.split(delimiters.open.as_str())
        .flat_map(|piece| {
            piece
                .split(delimiters.close.as_str())
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Run the command scanner over one text node's content; returns the text to
/// place in the cloned output node.
fn process_text(
    data: &ReportData,
    template: &mut Tree,
    node: NodeId,
    out: &mut Tree,
    ctx: &mut Context,
) -> Result<String> {
    let text = match template.text(node) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => return Ok(String::new()),
    };

    let open = ctx.options.cmd_delimiter.open.clone();
    let segments = split_text_by_delimiters(&text, &ctx.options.cmd_delimiter);
    let last = segments.len() - 1;

    let mut out_text = String::new();
    let mut collected: Vec<DocxlabError> = Vec::new();

    for (idx, segment) in segments.iter().enumerate() {
        if idx > 0 {
            // Delimiters count as command payload for the collapse heuristic.
            ctx.append_to_buffers(&open, true, false);
        }

        if ctx.f_cmd {
            ctx.cmd.push_str(segment);
        } else if !ctx.is_loop_exploring() {
            out_text.push_str(segment);
        }
        ctx.append_to_buffers(segment, ctx.f_cmd, false);

        if idx < last {
            if ctx.f_cmd {
                match process_cmd(data, template, node, out, ctx) {
                    Ok(result) => {
                        if !result.is_empty() {
                            out_text.push_str(&result);
                            ctx.append_to_buffers(&result, false, true);
                        }
                    }
                    Err(e) => {
                        if ctx.options.fail_fast {
                            return Err(e);
                        }
                        collected.push(e);
                    }
                }
            }
            ctx.f_cmd = !ctx.f_cmd;
        }
    }

    if !collected.is_empty() {
        return Err(DocxlabError::combined(collected));
    }
    Ok(out_text)
}
