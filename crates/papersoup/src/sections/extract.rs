// ABOUTME: Recursive section extractor that turns a cleaned sub-tree into a nested Section hierarchy.
// ABOUTME: Headings open sections on a level-indexed stack; blocks and inline runs become leaf text.

use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use serde::Deserialize;

use super::{Content, Section};
use crate::dom::{collect_text, normalize_spaces, Document, Element, Node};
use crate::rules::SelectorSet;

/// Tags whose text becomes its own leaf (or which are walked into when they
/// contain further blocks). HTML block elements plus JATS containers.
const DEFAULT_BLOCK_TAGS: &[&str] = &[
    "abstract", "ack", "address", "app", "app-group", "article", "aside", "back", "blockquote",
    "body", "boxed-text", "caption", "dd", "def-item", "def-list", "disp-quote", "div", "dl",
    "dt", "fieldset", "fig", "figcaption", "figure", "footer", "form", "front", "fulltext",
    "header", "hr", "li", "list", "list-item", "main", "nav", "notes", "ol", "p", "pre", "sec",
    "section", "statement", "table", "table-wrap", "tbody", "td", "tfoot", "th", "thead",
    "trans-abstract", "tr", "ul",
];

/// Tags that never carry document text.
const DEFAULT_SKIP_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "template", "meta", "link",
];

/// Tuning for the extractor. Deserializes from a recipe with every field
/// optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SectionOptions {
    pub block_tags: Vec<String>,
    pub skip_tags: Vec<String>,
    /// Extra nodes to treat as headings even though their tag carries no level.
    pub heading_rules: Option<SelectorSet>,
    /// Level assigned to headings matched by `heading_rules`.
    pub default_heading_level: u8,
}

impl Default for SectionOptions {
    fn default() -> Self {
        Self {
            block_tags: DEFAULT_BLOCK_TAGS.iter().map(|t| t.to_string()).collect(),
            skip_tags: DEFAULT_SKIP_TAGS.iter().map(|t| t.to_string()).collect(),
            heading_rules: None,
            default_heading_level: 1,
        }
    }
}

impl SectionOptions {
    fn is_block(&self, el: &Element) -> bool {
        self.block_tags.iter().any(|t| t.eq_ignore_ascii_case(&el.name))
    }

    fn is_skipped(&self, el: &Element) -> bool {
        self.skip_tags.iter().any(|t| t.eq_ignore_ascii_case(&el.name))
    }

    fn heading_level(&self, el: &Element) -> Option<u8> {
        el.heading_level().or_else(|| {
            self.heading_rules
                .as_ref()
                .filter(|rules| rules.matches_element(el))
                .map(|_| self.default_heading_level)
        })
    }
}

/// Extracts the section hierarchy below `container`.
///
/// Text that precedes the first heading is gathered into an untitled
/// section (`type` and `name` both empty) at the front of the result.
/// Sections that end up with no text are dropped.
pub fn extract_sections(doc: &Document, container: NodeId, opts: &SectionOptions) -> Vec<Section> {
    let Some(node) = doc.get(container) else {
        return Vec::new();
    };
    let mut builder = Builder::new(opts, structured_nodes(node, opts));
    builder.visit(node);
    builder.finish()
}

/// Every node under (and including) `top` that has a block or heading as a
/// strict descendant. Ancestors are marked upward until one is already
/// marked, so each node is visited a bounded number of times.
fn structured_nodes(top: NodeRef<'_, Node>, opts: &SectionOptions) -> HashSet<NodeId> {
    let mut marked = HashSet::new();
    for d in top.descendants().skip(1) {
        let is_structure = d.value().as_element().is_some_and(|el| {
            !opts.is_skipped(el) && (opts.is_block(el) || opts.heading_level(el).is_some())
        });
        if !is_structure {
            continue;
        }
        for ancestor in d.ancestors() {
            if !marked.insert(ancestor.id()) || ancestor.id() == top.id() {
                break;
            }
        }
    }
    marked
}

struct OpenSection {
    level: u8,
    section: Section,
}

struct Builder<'a> {
    opts: &'a SectionOptions,
    structured: HashSet<NodeId>,
    root: Vec<Section>,
    preamble: Vec<Content>,
    stack: Vec<OpenSection>,
    pending: String,
}

impl<'a> Builder<'a> {
    fn new(opts: &'a SectionOptions, structured: HashSet<NodeId>) -> Self {
        Self {
            opts,
            structured,
            root: Vec::new(),
            preamble: Vec::new(),
            stack: Vec::new(),
            pending: String::new(),
        }
    }

    /// Handles the container itself: a container that is a leaf block still
    /// yields its text.
    fn visit(&mut self, node: NodeRef<'_, Node>) {
        match node.value() {
            Node::Element(el) if !self.has_structure(node) && !self.opts.is_skipped(el) => {
                if let Some(level) = self.opts.heading_level(el) {
                    let mut name = String::new();
                    collect_text(node, &mut name);
                    self.open(level, normalize_spaces(&name));
                } else {
                    collect_text(node, &mut self.pending);
                    self.flush();
                }
            }
            _ => self.walk(node),
        }
    }

    /// Walks the children of `node` in document order. Descending into an
    /// element with structure flushes before and after it; the explicit stack
    /// keeps deep nesting off the call stack.
    fn walk(&mut self, node: NodeRef<'_, Node>) {
        let mut stack = vec![node.children()];
        while let Some(children) = stack.last_mut() {
            let Some(child) = children.next() else {
                stack.pop();
                if !stack.is_empty() {
                    self.flush();
                }
                continue;
            };
            match child.value() {
                Node::Text(text) => self.pending.push_str(text),
                Node::Root => {}
                Node::Element(el) => {
                    if self.opts.is_skipped(el) {
                        continue;
                    }
                    if let Some(level) = self.opts.heading_level(el) {
                        self.flush();
                        let mut name = String::new();
                        collect_text(child, &mut name);
                        self.open(level, normalize_spaces(&name));
                    } else if self.has_structure(child) {
                        self.flush();
                        stack.push(child.children());
                    } else if self.opts.is_block(el) {
                        self.flush();
                        collect_text(child, &mut self.pending);
                        self.flush();
                    } else {
                        collect_text(child, &mut self.pending);
                    }
                }
            }
        }
    }

    /// True when some strict descendant is a block or a heading.
    fn has_structure(&self, node: NodeRef<'_, Node>) -> bool {
        self.structured.contains(&node.id())
    }

    fn flush(&mut self) {
        let raw = std::mem::take(&mut self.pending);
        let text = normalize_spaces(&raw);
        if text.is_empty() {
            return;
        }
        match self.stack.last_mut() {
            Some(open) => open.section.content.push(Content::Text(text)),
            None => self.preamble.push(Content::Text(text)),
        }
    }

    fn open(&mut self, level: u8, name: String) {
        if self.stack.is_empty() && !self.preamble.is_empty() {
            let mut untitled = Section::new("", "");
            untitled.content = std::mem::take(&mut self.preamble);
            self.root.push(untitled);
        }
        while self.stack.last().is_some_and(|top| top.level >= level) {
            self.close_top();
        }
        self.stack.push(OpenSection {
            level,
            section: Section::new(format!("section_h{}", level), name),
        });
    }

    fn close_top(&mut self) {
        let Some(open) = self.stack.pop() else {
            return;
        };
        if open.section.content.is_empty() {
            tracing::trace!(name = %open.section.name, "dropping section without text");
            return;
        }
        match self.stack.last_mut() {
            Some(parent) => parent.section.content.push(Content::Section(open.section)),
            None => self.root.push(open.section),
        }
    }

    fn finish(mut self) -> Vec<Section> {
        self.flush();
        while !self.stack.is_empty() {
            self.close_top();
        }
        if !self.preamble.is_empty() {
            let mut untitled = Section::new("", "");
            untitled.content = std::mem::take(&mut self.preamble);
            self.root.insert(0, untitled);
        }
        self.root
    }
}
