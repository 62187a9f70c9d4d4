//! Directive execution
//!
//! A command reaching this module has been normalised (see
//! [`super::commands`]) and is executed against the walk context: loop and
//! conditional bookkeeping, value insertion, and construction of the pending
//! inline-object subtrees the walker attaches on its next UP move.

use log::debug;

use crate::error::{DocxlabError, Result};
use crate::node::{attrs, tags, NodeId, Tree};
use crate::render::commands::{normalize_command, split_command};
use crate::render::context::{Context, LoopStatus, Pending};
use crate::render::eval::{EvalError, Evaluator};
use crate::render::value::{ImagePars, LinkPars, ReportData, Value};

const DRAWING_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PICTURE_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// Centimetres to English Metric Units.
fn cm_to_emu(cm: f64) -> i64 {
    (cm * 360_000.0).round() as i64
}

fn map_eval_error(err: EvalError, cmd: &str) -> DocxlabError {
    match err {
        EvalError::Undefined(name) => DocxlabError::invalid_command(
            format!("undefined identifier '{name}'"),
            cmd,
        ),
        EvalError::Syntax(msg) => DocxlabError::CommandSyntax(format!("{msg} in '{cmd}'")),
        EvalError::Function { name, reason } => DocxlabError::UserFunction { name, reason },
    }
}

/// Execute the command accumulated in `ctx.cmd` and return the text to splice
/// into the output, if any.
pub(crate) fn process_cmd(
    data: &ReportData,
    template: &mut Tree,
    node_in: NodeId,
    out: &mut Tree,
    ctx: &mut Context,
) -> Result<String> {
    let raw = std::mem::take(&mut ctx.cmd);
    let cmd = normalize_command(&raw, &ctx.shorthands, ctx.options.fix_smart_quotes)?;
    let (cmd_name, rest) = split_command(&cmd);

    if cmd_name != "CMD_NODE" {
        debug!("processing cmd: {cmd}");
    }

    // Query pre-scan mode: only QUERY is honoured, nothing executes.
    if ctx.f_seek_query {
        if cmd_name == "QUERY" {
            ctx.query = Some(rest);
        }
        return Ok(String::new());
    }

    match cmd_name.as_str() {
        "QUERY" | "CMD_NODE" => Ok(String::new()),
        "ALIAS" => {
            match rest.split_once(char::is_whitespace) {
                Some((name, body)) => {
                    ctx.shorthands
                        .insert(name.to_string(), body.trim().to_string());
                    Ok(String::new())
                }
                None => Err(DocxlabError::invalid_command(
                    "ALIAS needs a name and a body",
                    cmd.as_str(),
                )),
            }
        }
        "FOR" | "IF" => {
            process_for_if(data, template, node_in, ctx, &cmd, &cmd_name, &rest)?;
            Ok(String::new())
        }
        "END-FOR" | "END-IF" => {
            process_end_for_if(template, node_in, ctx, &cmd, &cmd_name, &rest)?;
            Ok(String::new())
        }
        "INS" => process_ins(data, ctx, &cmd, &rest),
        "EXEC" => {
            if !ctx.is_loop_exploring() {
                evaluate(data, ctx, &rest).map_err(|e| map_eval_error(e, &cmd))?;
            }
            Ok(String::new())
        }
        "IMAGE" => {
            if !ctx.is_loop_exploring() {
                process_image(data, out, ctx, &cmd, &rest)?;
            }
            Ok(String::new())
        }
        "LINK" => {
            if !ctx.is_loop_exploring() {
                process_link(data, out, ctx, &cmd, &rest)?;
            }
            Ok(String::new())
        }
        "HTML" => {
            if !ctx.is_loop_exploring() {
                process_html(data, out, ctx, &cmd, &rest)?;
            }
            Ok(String::new())
        }
        _ => Err(DocxlabError::CommandSyntax(cmd)),
    }
}

fn evaluate(data: &ReportData, ctx: &Context, expr: &str) -> std::result::Result<Value, EvalError> {
    Evaluator {
        data,
        vars: &ctx.vars,
        functions: &ctx.options.functions,
    }
    .evaluate(expr)
}

fn process_ins(data: &ReportData, ctx: &mut Context, cmd: &str, rest: &str) -> Result<String> {
    if ctx.is_loop_exploring() {
        return Ok(String::new());
    }

    let value = match evaluate(data, ctx, rest) {
        Ok(value) => value,
        Err(EvalError::Undefined(name)) => {
            let err =
                DocxlabError::invalid_command(format!("undefined identifier '{name}'"), cmd);
            if let Some(handler) = &ctx.options.error_handler {
                return Ok(handler(&err, cmd));
            }
            if ctx.options.reject_nullish {
                return Err(err);
            }
            Value::Null
        }
        Err(e) => return Err(map_eval_error(e, cmd)),
    };

    if ctx.options.reject_nullish && value.is_null() {
        let err = DocxlabError::invalid_command("null value in INS", cmd);
        if let Some(handler) = &ctx.options.error_handler {
            return Ok(handler(&err, cmd));
        }
        return Err(err);
    }

    let mut text = value.stringify();
    if ctx.options.process_line_breaks {
        text = insert_line_breaks(&text, ctx);
    }
    Ok(text)
}

/// Translate `\n` using the literal-XML delimiter so the serialiser splices
/// the break elements verbatim.
fn insert_line_breaks(value: &str, ctx: &Context) -> String {
    let lit = &ctx.options.literal_xml_delimiter;
    if ctx.options.process_line_breaks_as_new_text {
        let separator = format!(
            "{lit}</w:t>{lit}{lit}<w:br/>{lit}{lit}<w:t xml:space=\"preserve\">{lit}"
        );
        value.split('\n').collect::<Vec<_>>().join(&separator)
    } else {
        let line_break = format!("{lit}<w:br/>{lit}");
        value.replace('\n', &line_break)
    }
}

fn process_for_if(
    data: &ReportData,
    template: &mut Tree,
    node_in: NodeId,
    ctx: &mut Context,
    cmd: &str,
    cmd_name: &str,
    rest: &str,
) -> Result<()> {
    let is_if = cmd_name == "IF";

    let (var_name, for_expr) = if is_if {
        // The IF gets an auto name so its END-IF can match it without the
        // user naming the scope.
        if template.name(node_in).is_none() {
            template.set_name(node_in, format!("__if_{}", ctx.g_cnt_if));
            ctx.g_cnt_if += 1;
        }
        (
            template.name(node_in).expect("just assigned").to_string(),
            None,
        )
    } else {
        let Some((var, expr)) = parse_for_body(rest) else {
            return Err(DocxlabError::invalid_command("invalid FOR command", cmd));
        };
        (var, Some(expr))
    };

    // Re-entry of the same node during iteration must not re-initialise.
    if ctx.cur_loop().is_some_and(|l| l.var_name == var_name) {
        return Ok(());
    }

    let parent_is_exploring = ctx.cur_loop().is_some_and(|l| l.idx == -1);
    let loop_over: Vec<Value> = if parent_is_exploring {
        Vec::new()
    } else if is_if {
        let truthy = match evaluate(data, ctx, rest) {
            Ok(value) => value.is_truthy(),
            Err(EvalError::Undefined(_)) => false,
            Err(e) => return Err(map_eval_error(e, cmd)),
        };
        if truthy {
            vec![Value::Bool(true)]
        } else {
            Vec::new()
        }
    } else {
        let expr = for_expr.expect("FOR always parses an expression");
        let value = evaluate(data, ctx, &expr).map_err(|e| map_eval_error(e, cmd))?;
        match value.as_list() {
            Some(items) => items.to_vec(),
            None => {
                return Err(DocxlabError::invalid_command(
                    "FOR can only iterate over a sequence",
                    cmd,
                ))
            }
        }
    };

    ctx.loops.push(LoopStatus {
        ref_node: node_in,
        ref_node_level: ctx.level,
        var_name,
        loop_over,
        idx: -1,
        is_if,
    });
    Ok(())
}

/// `<var> IN <expr>`, keyword case-insensitive.
fn parse_for_body(rest: &str) -> Option<(String, String)> {
    let (var, after) = rest.split_once(char::is_whitespace)?;
    let (keyword, expr) = after.trim_start().split_once(char::is_whitespace)?;
    if !keyword.eq_ignore_ascii_case("IN") {
        return None;
    }
    Some((var.to_string(), expr.trim().to_string()))
}

fn process_end_for_if(
    template: &mut Tree,
    node_in: NodeId,
    ctx: &mut Context,
    cmd: &str,
    cmd_name: &str,
    rest: &str,
) -> Result<()> {
    let is_if = cmd_name == "END-IF";

    let Some(cur_var) = ctx.cur_loop().map(|l| l.var_name.clone()) else {
        let scope = if is_if { "IF statement" } else { "FOR loop" };
        return Err(DocxlabError::invalid_command(
            format!("unexpected {cmd_name} outside of {scope} context"),
            cmd,
        ));
    };

    // First visit of an END-IF: adopt the auto name its opener generated.
    if is_if && template.name(node_in).is_none() {
        template.set_name(node_in, cur_var.clone());
        ctx.g_cnt_end_if += 1;
    }

    let var_name = if is_if {
        template
            .name(node_in)
            .expect("END-IF was just named")
            .to_string()
    } else {
        rest.to_string()
    };

    // An END naming a different scope: if it names an outer loop the template
    // is malformed; otherwise it is a leftover from a previous sibling
    // paragraph of this loop body and is ignored.
    if !var_name.is_empty() && var_name != cur_var {
        if ctx.loops.iter().any(|l| l.var_name == var_name) {
            return Err(DocxlabError::invalid_command("invalid command", cmd));
        }
        debug!("ignoring {cmd} ({var_name}, expecting {cur_var})");
        return Ok(());
    }

    let next_item = {
        let cur = ctx.cur_loop_mut().expect("checked above");
        let next_idx = (cur.idx + 1) as usize;
        if next_idx < cur.loop_over.len() {
            cur.idx = next_idx as isize;
            Some(cur.loop_over[next_idx].clone())
        } else {
            None
        }
    };
    match next_item {
        Some(item) => {
            ctx.vars.insert(format!("${cur_var}"), item);
            ctx.f_jump = true;
        }
        None => {
            ctx.loops.pop();
        }
    }
    Ok(())
}

fn process_image(
    data: &ReportData,
    out: &mut Tree,
    ctx: &mut Context,
    cmd: &str,
    rest: &str,
) -> Result<()> {
    let value = evaluate(data, ctx, rest).map_err(|e| map_eval_error(e, cmd))?;
    let Value::Image(image) = value else {
        return Err(DocxlabError::invalid_command(
            "IMAGE expects an image value",
            cmd,
        ));
    };

    const KNOWN: [&str; 6] = [".png", ".gif", ".jpg", ".jpeg", ".svg", ".bmp"];
    if !KNOWN.contains(&image.extension.to_lowercase().as_str()) {
        return Err(DocxlabError::invalid_command(
            format!("unsupported image extension '{}'", image.extension),
            cmd,
        ));
    }

    let image_id = ctx.next_image_id();
    let doc_pr_id = ctx.image_and_shape_id_increment.to_string();
    let drawing = build_drawing_node(out, &image_id, &doc_pr_id, &image);
    let caption = image
        .caption
        .as_deref()
        .map(|text| build_caption_nodes(out, text))
        .unwrap_or_default();
    ctx.images.insert(image_id, image);
    ctx.pending = Pending::Image { drawing, caption };
    Ok(())
}

/// The DrawingML subtree for one inline picture.
fn build_drawing_node(out: &mut Tree, image_id: &str, doc_pr_id: &str, image: &ImagePars) -> NodeId {
    let cx = cm_to_emu(image.width).to_string();
    let cy = cm_to_emu(image.height).to_string();
    let name = format!("Picture {image_id}");

    let extent = out.element("wp:extent", attrs([("cx", cx.as_str()), ("cy", cy.as_str())]));
    let doc_pr = out.element(
        "wp:docPr",
        attrs([("id", doc_pr_id), ("name", name.as_str())]),
    );
    let frame_locks = out.element(
        "a:graphicFrameLocks",
        attrs([("xmlns:a", DRAWING_NS), ("noChangeAspect", "1")]),
    );
    let frame_pr = out.element("wp:cNvGraphicFramePr", attrs([]));
    out.append_child(frame_pr, frame_locks);

    let cnv_pr = out.element("pic:cNvPr", attrs([("id", "0"), ("name", name.as_str())]));
    let cnv_pic_pr = out.element("pic:cNvPicPr", attrs([]));
    let nv_pic_pr = out.element("pic:nvPicPr", attrs([]));
    out.append_child(nv_pic_pr, cnv_pr);
    out.append_child(nv_pic_pr, cnv_pic_pr);

    let blip = out.element(
        "a:blip",
        attrs([("r:embed", image_id), ("cstate", "print")]),
    );
    let fill_rect = out.element("a:fillRect", attrs([]));
    let stretch = out.element("a:stretch", attrs([]));
    out.append_child(stretch, fill_rect);
    let blip_fill = out.element("pic:blipFill", attrs([]));
    out.append_child(blip_fill, blip);
    out.append_child(blip_fill, stretch);

    let off = out.element("a:off", attrs([("x", "0"), ("y", "0")]));
    let ext = out.element("a:ext", attrs([("cx", cx.as_str()), ("cy", cy.as_str())]));
    let xfrm = out.element("a:xfrm", attrs([]));
    out.append_child(xfrm, off);
    out.append_child(xfrm, ext);
    let av_lst = out.element("a:avLst", attrs([]));
    let prst_geom = out.element("a:prstGeom", attrs([("prst", "rect")]));
    out.append_child(prst_geom, av_lst);
    let sp_pr = out.element("pic:spPr", attrs([]));
    out.append_child(sp_pr, xfrm);
    out.append_child(sp_pr, prst_geom);

    let pic = out.element("pic:pic", attrs([("xmlns:pic", PICTURE_NS)]));
    out.append_child(pic, nv_pic_pr);
    out.append_child(pic, blip_fill);
    out.append_child(pic, sp_pr);

    let graphic_data = out.element("a:graphicData", attrs([("uri", PICTURE_NS)]));
    out.append_child(graphic_data, pic);
    let graphic = out.element("a:graphic", attrs([("xmlns:a", DRAWING_NS)]));
    out.append_child(graphic, graphic_data);

    let inline = out.element(
        "wp:inline",
        attrs([("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")]),
    );
    out.append_child(inline, extent);
    out.append_child(inline, doc_pr);
    out.append_child(inline, frame_pr);
    out.append_child(inline, graphic);

    let drawing = out.element("w:drawing", attrs([]));
    out.append_child(drawing, inline);
    drawing
}

/// Break plus caption text, appended to the run after the picture.
fn build_caption_nodes(out: &mut Tree, caption: &str) -> Vec<NodeId> {
    let br = out.element("w:br", attrs([]));
    let t = out.element(tags::T, attrs([("xml:space", "preserve")]));
    let text = out.text_node(caption);
    out.append_child(t, text);
    vec![br, t]
}

fn process_link(
    data: &ReportData,
    out: &mut Tree,
    ctx: &mut Context,
    cmd: &str,
    rest: &str,
) -> Result<()> {
    let value = evaluate(data, ctx, rest).map_err(|e| map_eval_error(e, cmd))?;
    let link = match value {
        Value::Link(link) => link,
        // A plain map with a url (and optional label) works too.
        Value::Map(map) => match map.get("url") {
            Some(Value::Str(url)) => LinkPars {
                url: url.clone(),
                label: match map.get("label") {
                    Some(Value::Str(label)) => Some(label.clone()),
                    _ => None,
                },
            },
            _ => {
                return Err(DocxlabError::invalid_command(
                    "LINK expects a url",
                    cmd,
                ))
            }
        },
        _ => {
            return Err(DocxlabError::invalid_command(
                "LINK expects a link value",
                cmd,
            ))
        }
    };

    let link_id = ctx.next_link_id();
    let label = link.label.clone().unwrap_or_else(|| link.url.clone());

    // Clone the surrounding run's properties so the hyperlink inherits the
    // local formatting; fall back to plain underline.
    let rpr = match ctx.text_run_props_node {
        Some(node) => out.clone_deep(node),
        None => {
            let rpr = out.element(tags::RPR, attrs([]));
            let underline = out.element("w:u", attrs([("w:val", "single")]));
            out.append_child(rpr, underline);
            rpr
        }
    };

    let t = out.element(tags::T, attrs([("xml:space", "preserve")]));
    let text = out.text_node(label);
    out.append_child(t, text);
    let run = out.element(tags::R, attrs([]));
    out.append_child(run, rpr);
    out.append_child(run, t);
    let hyperlink = out.element(
        "w:hyperlink",
        attrs([("r:id", link_id.as_str()), ("w:history", "1")]),
    );
    out.append_child(hyperlink, run);

    ctx.links.insert(link_id, link);
    ctx.pending = Pending::Link { hyperlink };
    Ok(())
}

fn process_html(
    data: &ReportData,
    out: &mut Tree,
    ctx: &mut Context,
    cmd: &str,
    rest: &str,
) -> Result<()> {
    let value = evaluate(data, ctx, rest).map_err(|e| map_eval_error(e, cmd))?;
    let html = match value {
        Value::Html(html) => html,
        Value::Str(html) => html,
        _ => {
            return Err(DocxlabError::invalid_command(
                "HTML expects an HTML string",
                cmd,
            ))
        }
    };

    let html_id = ctx.next_html_id();
    let alt_chunk = out.element(tags::ALTCHUNK, attrs([("r:id", html_id.as_str())]));
    ctx.htmls.insert(html_id, html);
    ctx.pending = Pending::Html { alt_chunk };
    Ok(())
}
