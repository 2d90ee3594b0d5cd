// ABOUTME: Mutable document model for paper markup: Node, Element, AttrValue and Document.
// ABOUTME: Wraps an ego_tree arena with selector search, text collection and sub-tree copies.

//! Document model.
//!
//! Raw markup is parsed once per document into an [`ego_tree::Tree`] of
//! [`Node`]s. The tree is owned by a [`Document`] and mutated in place by the
//! transformation stages; nodes are addressed by [`NodeId`], so parent links
//! are plain arena indices rather than owning pointers.
//!
//! Submodules:
//! - `decode`: byte-to-text decoding with charset sniffing.
//! - `parse`: HTML (html5ever via scraper) and XML (quick-xml) tree builders.
//! - `serialize`: writes a tree back out as markup.

pub mod decode;
mod parse;
mod serialize;

use std::borrow::Cow;
use std::fmt;

use ego_tree::iter::Edge;
use ego_tree::{NodeId, NodeMut, NodeRef, Tree};
use serde::Deserialize;

use crate::error::MarkupError;
use crate::rules::SelectorSet;

/// Which tree builder to use for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    #[default]
    Html,
    Xml,
}

impl fmt::Display for MarkupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarkupKind::Html => "html",
            MarkupKind::Xml => "xml",
        };
        write!(f, "{}", s)
    }
}

impl From<&str> for MarkupKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "xml" | "jats" => MarkupKind::Xml,
            _ => MarkupKind::Html,
        }
    }
}

/// An attribute value. Whitespace-separated HTML attributes such as `class`
/// are kept as lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Single(String),
    List(Vec<String>),
}

impl AttrValue {
    /// The individual items of the value; a single value is one item.
    pub fn items(&self) -> &[String] {
        match self {
            AttrValue::Single(s) => std::slice::from_ref(s),
            AttrValue::List(items) => items,
        }
    }

    /// The whole value, list items joined by single spaces.
    pub fn joined(&self) -> Cow<'_, str> {
        match self {
            AttrValue::Single(s) => Cow::Borrowed(s),
            AttrValue::List(items) => Cow::Owned(items.join(" ")),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.joined())
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Single(s.to_string())
    }
}

/// An element: tag name plus ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, AttrValue)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Looks up an attribute by exact name.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Heading level carried by the tag name (`h1` => 1 ... `h9` => 9).
    pub fn heading_level(&self) -> Option<u8> {
        let mut chars = self.name.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('h' | 'H'), Some(d @ '1'..='9'), None) => d.to_digit(10).map(|d| d as u8),
            _ => None,
        }
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Root,
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }
}

/// A parsed document. One instance per input; never shared across documents.
#[derive(Debug, Clone)]
pub struct Document {
    tree: Tree<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only the root node.
    pub fn new() -> Self {
        Self {
            tree: Tree::new(Node::Root),
        }
    }

    /// Parses markup with the given tree builder.
    pub fn parse(markup: &str, kind: MarkupKind) -> Result<Self, MarkupError> {
        match kind {
            MarkupKind::Html => Ok(Self::parse_html(markup)),
            MarkupKind::Xml => Self::parse_xml(markup),
        }
    }

    /// Parses HTML. html5ever recovers from any input, so this never fails.
    pub fn parse_html(markup: &str) -> Self {
        parse::build_html(markup)
    }

    /// Parses XML leniently: unmatched end tags are ignored and unclosed
    /// elements are closed at end of input.
    pub fn parse_xml(markup: &str) -> Result<Self, MarkupError> {
        parse::build_xml(markup)
    }

    pub fn root(&self) -> NodeRef<'_, Node> {
        self.tree.root()
    }

    pub fn root_id(&self) -> NodeId {
        self.tree.root().id()
    }

    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.tree.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<NodeMut<'_, Node>> {
        self.tree.get_mut(id)
    }

    /// All element nodes in document pre-order.
    pub fn elements(&self) -> impl Iterator<Item = NodeRef<'_, Node>> {
        self.tree.root().descendants().filter(|n| n.value().is_element())
    }

    /// First node in pre-order matching any selector in the set.
    pub fn find(&self, rules: &SelectorSet) -> Option<NodeId> {
        self.elements().find(|n| rules.matches(*n)).map(|n| n.id())
    }

    /// Every node matching the set, in pre-order.
    pub fn find_all(&self, rules: &SelectorSet) -> Vec<NodeId> {
        self.elements()
            .filter(|n| rules.matches(*n))
            .map(|n| n.id())
            .collect()
    }

    /// True while the node is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let root = self.root_id();
        match self.tree.get(id) {
            Some(node) => node.id() == root || node.ancestors().any(|a| a.id() == root),
            None => false,
        }
    }

    /// Concatenated descendant text of a node, as it appears in the source.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(node) = self.tree.get(id) {
            collect_text(node, &mut out);
        }
        out
    }

    /// Descendant text with whitespace runs collapsed and trimmed.
    pub fn normalized_text(&self, id: NodeId) -> String {
        normalize_spaces(&self.text(id))
    }

    /// Deep copy of the sub-tree rooted at `id` as a new document; the node
    /// itself becomes the single child of the new root.
    pub fn subtree(&self, id: NodeId) -> Document {
        let mut doc = Document::new();
        let Some(src) = self.tree.get(id) else {
            return doc;
        };
        let mut parents: Vec<NodeId> = vec![doc.root_id()];
        for edge in src.traverse() {
            match edge {
                Edge::Open(node) => {
                    let parent = *parents.last().unwrap_or(&doc.root_id());
                    let copy = match doc.tree.get_mut(parent) {
                        Some(mut p) => p.append(node.value().clone()).id(),
                        None => parent,
                    };
                    parents.push(copy);
                }
                Edge::Close(_) => {
                    parents.pop();
                }
            }
        }
        doc
    }

    /// Serializes the document back to markup.
    pub fn to_markup(&self) -> String {
        serialize::to_markup(self.tree.root())
    }
}

/// Appends the text of every descendant text run to `out`; `<br>` counts as a space.
pub(crate) fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for d in node.descendants() {
        match d.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) if el.name.eq_ignore_ascii_case("br") => out.push(' '),
            _ => {}
        }
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
