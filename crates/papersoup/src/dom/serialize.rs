// ABOUTME: Serializes a Document tree back into markup text.
// ABOUTME: The pipeline dumps the cleaned tree through it at trace level; tests compare against it.

use ego_tree::iter::Edge;
use ego_tree::NodeRef;

use super::Node;

pub(super) fn to_markup(root: NodeRef<'_, Node>) -> String {
    let mut output = String::new();
    for edge in root.traverse() {
        match edge {
            Edge::Open(node) => open_node(node, &mut output),
            Edge::Close(node) => close_node(node, &mut output),
        }
    }
    output
}

fn open_node(node: NodeRef<'_, Node>, output: &mut String) {
    match node.value() {
        Node::Root => {}
        Node::Text(text) => output.push_str(&escape_text(text)),
        Node::Element(el) => {
            output.push('<');
            output.push_str(&el.name);
            for (name, value) in &el.attrs {
                output.push(' ');
                output.push_str(name);
                output.push_str("=\"");
                output.push_str(&escape_attr(&value.joined()));
                output.push('"');
            }
            if is_self_closing(node) {
                output.push_str(" />");
            } else {
                output.push('>');
            }
        }
    }
}

fn close_node(node: NodeRef<'_, Node>, output: &mut String) {
    if let Node::Element(el) = node.value() {
        if !is_self_closing(node) {
            output.push_str("</");
            output.push_str(&el.name);
            output.push('>');
        }
    }
}

fn is_self_closing(node: NodeRef<'_, Node>) -> bool {
    match node.value() {
        Node::Element(el) => is_void_element(&el.name) && !node.has_children(),
        _ => false,
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}
