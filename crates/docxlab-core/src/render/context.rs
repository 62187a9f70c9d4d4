//! Walk-scoped state
//!
//! One [`Context`] accompanies a single render: the in-command buffer, the
//! per-container tag buffers that drive paragraph/row collapsing, the loop
//! stack, and the one-shot side channels set by directive handlers and
//! consumed by the walker.

use std::collections::BTreeMap;

use crate::node::{tags, NodeId};
use crate::render::value::{ImagePars, LinkPars, Value};
use crate::render::ReportOptions;

/// Per-container accumulator: collected visible text, collected command
/// text, and whether a command inserted renderable content.
#[derive(Debug, Clone, Default)]
pub(crate) struct BufferStatus {
    pub text: String,
    pub cmds: String,
    pub f_inserted_text: bool,
}

/// One open FOR or IF scope.
///
/// `idx == -1` is the exploring pass: the loop body is traversed to record
/// its structure without emitting output.
#[derive(Debug, Clone)]
pub(crate) struct LoopStatus {
    pub ref_node: NodeId,
    pub ref_node_level: i32,
    pub var_name: String,
    pub loop_over: Vec<Value>,
    pub idx: isize,
    pub is_if: bool,
}

/// An inline object awaiting attachment at a specific ancestor tag during an
/// UP move. Node ids refer to detached subtrees in the output tree.
#[derive(Debug, Clone, Default)]
pub(crate) enum Pending {
    #[default]
    None,
    Image {
        drawing: NodeId,
        caption: Vec<NodeId>,
    },
    Link {
        hyperlink: NodeId,
    },
    Html {
        alt_chunk: NodeId,
    },
}

pub(crate) const BUFFER_TAGS: [&str; 3] = [tags::P, tags::TR, tags::TC];

pub(crate) struct Context<'a> {
    pub options: &'a ReportOptions,

    pub level: i32,
    pub f_cmd: bool,
    pub cmd: String,
    pub f_seek_query: bool,
    pub query: Option<String>,

    pub buffers: BTreeMap<&'static str, BufferStatus>,
    pub g_cnt_if: usize,
    pub g_cnt_end_if: usize,

    pub loops: Vec<LoopStatus>,
    pub f_jump: bool,
    pub pending: Pending,

    pub vars: BTreeMap<String, Value>,
    pub shorthands: BTreeMap<String, String>,

    pub image_and_shape_id_increment: usize,
    pub link_id: usize,
    pub html_id: usize,
    pub images: BTreeMap<String, ImagePars>,
    pub links: BTreeMap<String, LinkPars>,
    pub htmls: BTreeMap<String, String>,

    /// Most recently exited `w:rPr` in the output tree, cleared on `w:r`
    /// exit; LINK clones it so hyperlink text keeps the local formatting.
    pub text_run_props_node: Option<NodeId>,
}

impl<'a> Context<'a> {
    pub fn new(options: &'a ReportOptions, seek_query: bool) -> Self {
        let mut buffers = BTreeMap::new();
        for tag in BUFFER_TAGS {
            buffers.insert(tag, BufferStatus::default());
        }
        Self {
            options,
            level: 1,
            f_cmd: false,
            cmd: String::new(),
            f_seek_query: seek_query,
            query: None,
            buffers,
            g_cnt_if: 0,
            g_cnt_end_if: 0,
            loops: Vec::new(),
            f_jump: false,
            pending: Pending::None,
            vars: BTreeMap::new(),
            shorthands: BTreeMap::new(),
            image_and_shape_id_increment: options.image_and_shape_id_increment,
            link_id: 0,
            html_id: 0,
            images: BTreeMap::new(),
            links: BTreeMap::new(),
            htmls: BTreeMap::new(),
            text_run_props_node: None,
        }
    }

    pub fn cur_loop(&self) -> Option<&LoopStatus> {
        self.loops.last()
    }

    pub fn cur_loop_mut(&mut self) -> Option<&mut LoopStatus> {
        self.loops.last_mut()
    }

    /// True while the innermost loop is in its exploring pass.
    pub fn is_loop_exploring(&self) -> bool {
        self.cur_loop().is_some_and(|l| l.idx == -1)
    }

    /// Append text to the per-container buffers: commands and visible text
    /// are tracked separately so a paragraph/row holding only commands can be
    /// collapsed later.
    pub fn append_to_buffers(&mut self, text: &str, f_cmd: bool, f_inserted: bool) {
        if self.f_seek_query {
            return;
        }
        for tag in BUFFER_TAGS {
            let buf = self.buffers.get_mut(tag).expect("buffer tags are fixed");
            if f_cmd {
                buf.cmds.push_str(text);
            } else {
                buf.text.push_str(text);
            }
            if f_inserted {
                buf.f_inserted_text = true;
            }
        }
    }

    /// Reset the buffer for a container tag on entry.
    pub fn reset_buffer(&mut self, tag: &'static str) {
        self.buffers.insert(tag, BufferStatus::default());
    }

    /// Flag all buffers as holding inserted content; used when a pending
    /// image/link/html lands so its containers survive collapsing.
    pub fn mark_inserted(&mut self) {
        for tag in BUFFER_TAGS {
            self.buffers
                .get_mut(tag)
                .expect("buffer tags are fixed")
                .f_inserted_text = true;
        }
    }

    pub fn next_image_id(&mut self) -> String {
        self.image_and_shape_id_increment += 1;
        format!("img{}", self.image_and_shape_id_increment)
    }

    pub fn next_shape_id(&mut self) -> String {
        self.image_and_shape_id_increment += 1;
        self.image_and_shape_id_increment.to_string()
    }

    pub fn next_link_id(&mut self) -> String {
        self.link_id += 1;
        format!("link{}", self.link_id)
    }

    pub fn next_html_id(&mut self) -> String {
        self.html_id += 1;
        format!("html{}", self.html_id)
    }
}
