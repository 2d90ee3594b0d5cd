// ABOUTME: Tree builders that turn HTML (via scraper/html5ever) or XML (via quick-xml) into a Document.
// ABOUTME: Both builders are lenient: unknown tags become opaque elements, stray end tags are ignored.

use ego_tree::iter::Edge;
use ego_tree::NodeId;
use quick_xml::encoding::Decoder;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::reader::Reader;

use super::{AttrValue, Document, Element, Node};
use crate::error::MarkupError;

// HTML attributes whose values are whitespace-separated token lists
const LIST_ATTRS: &[&str] = &[
    "class",
    "rel",
    "rev",
    "headers",
    "accept-charset",
    "accesskey",
    "dropzone",
];

pub(super) fn build_html(markup: &str) -> Document {
    let html = scraper::Html::parse_document(markup);
    let mut doc = Document::new();
    // parent of whatever opens next; document and fragment nodes are transparent
    let mut parents: Vec<NodeId> = vec![doc.root_id()];
    for edge in html.tree.root().traverse() {
        match edge {
            Edge::Open(src) if src.parent().is_none() => {}
            Edge::Open(src) => {
                let parent = *parents.last().unwrap_or(&doc.root_id());
                let id = match src.value() {
                    scraper::Node::Element(el) => {
                        let mut element = Element::new(el.name());
                        for (name, value) in el.attrs() {
                            element.attrs.push((name.to_string(), html_attr_value(name, value)));
                        }
                        append(&mut doc, parent, Node::Element(element))
                    }
                    scraper::Node::Text(text) => {
                        append(&mut doc, parent, Node::Text(String::from(&**text)))
                    }
                    _ => parent,
                };
                parents.push(id);
            }
            Edge::Close(src) if src.parent().is_none() => {}
            Edge::Close(_) => {
                parents.pop();
            }
        }
    }
    doc
}

fn html_attr_value(name: &str, value: &str) -> AttrValue {
    if LIST_ATTRS.contains(&name) {
        AttrValue::List(value.split_whitespace().map(str::to_string).collect())
    } else {
        AttrValue::Single(value.to_string())
    }
}

pub(super) fn build_xml(markup: &str) -> Result<Document, MarkupError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;

    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = vec![doc.root_id()];

    loop {
        let top = *stack.last().unwrap_or(&doc.root_id());
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let id = append(&mut doc, top, Node::Element(xml_element(e, reader.decoder())));
                stack.push(id);
            }
            Ok(Event::Empty(ref e)) => {
                append(&mut doc, top, Node::Element(xml_element(e, reader.decoder())));
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                close_element(&doc, &mut stack, &name);
            }
            Ok(Event::Text(ref e)) => {
                let text = e.decode().map(|s| s.into_owned()).unwrap_or_default();
                push_text(&mut doc, top, &text);
            }
            Ok(Event::GeneralRef(ref e)) => {
                push_text(&mut doc, top, &resolve_reference(e));
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                push_text(&mut doc, top, &text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(MarkupError {
                    position: reader.buffer_position() as u64,
                    message: e.to_string(),
                })
            }
        }
    }

    if stack.len() > 1 {
        tracing::debug!(unclosed = stack.len() - 1, "closing unclosed XML elements at end of input");
    }
    Ok(doc)
}

fn xml_element(e: &BytesStart, decoder: Decoder) -> Element {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let mut element = Element::new(name);
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        // a value with a bare `&` or an unknown entity is kept as written
        let value = match attr.decode_and_unescape_value_with(decoder, resolve_html5_entity) {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        element.attrs.push((key, AttrValue::Single(value)));
    }
    element
}

fn append(doc: &mut Document, parent: NodeId, node: Node) -> NodeId {
    match doc.tree.get_mut(parent) {
        Some(mut p) => p.append(node).id(),
        None => doc.tree.root_mut().append(node).id(),
    }
}

/// Appends text under `parent`, merging with a trailing text run so that
/// entity references do not split text into several runs.
fn push_text(doc: &mut Document, parent: NodeId, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(mut p) = doc.tree.get_mut(parent) {
        if let Some(mut last) = p.last_child() {
            if let Node::Text(existing) = last.value() {
                existing.push_str(text);
                return;
            }
        }
        p.append(Node::Text(text.to_string()));
    }
}

/// Pops the stack back to the nearest open element named `name`; end tags
/// with no open counterpart are ignored.
fn close_element(doc: &Document, stack: &mut Vec<NodeId>, name: &str) {
    let position = stack.iter().rposition(|id| {
        doc.tree
            .get(*id)
            .and_then(|n| n.value().as_element())
            .is_some_and(|el| el.name == name)
    });
    match position {
        Some(idx) if idx > 0 => stack.truncate(idx),
        _ => tracing::warn!(tag = name, "ignoring end tag without matching start tag"),
    }
}

/// Resolves a character or named entity reference. HTML5 names are
/// accepted since publisher XML uses `&ndash;`, `&alpha;` and friends without
/// declaring them. Unknown references are kept as written.
fn resolve_reference(e: &BytesRef) -> String {
    if let Ok(Some(c)) = e.resolve_char_ref() {
        return c.to_string();
    }
    let name = e.decode().map(|s| s.into_owned()).unwrap_or_default();
    match resolve_html5_entity(&name) {
        Some(value) => value.to_string(),
        None => format!("&{};", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Selector;

    fn names(doc: &Document) -> Vec<String> {
        doc.elements()
            .map(|n| n.value().as_element().unwrap().name.clone())
            .collect()
    }

    #[test]
    fn html_class_is_a_list() {
        let doc = Document::parse_html(r#"<div class="figure  wide" id="f1">x</div>"#);
        let div = doc.find(&Selector::tag("div").into()).unwrap();
        let el = doc.get(div).unwrap().value().as_element().unwrap().clone();
        assert_eq!(
            el.attr("class"),
            Some(&AttrValue::List(vec!["figure".into(), "wide".into()]))
        );
        assert_eq!(el.attr("id"), Some(&AttrValue::Single("f1".into())));
    }

    #[test]
    fn html_keeps_unknown_tags() {
        let doc = Document::parse_html("<p>a <inline-formula>x</inline-formula> b</p>");
        assert!(names(&doc).contains(&"inline-formula".to_string()));
    }

    #[test]
    fn xml_preserves_structure_and_case() {
        let doc = Document::parse_xml(
            r#"<?xml version="1.0"?><article><body><sec id="s1"><title>Intro</title><p>Text &amp; more</p></sec></body></article>"#,
        )
        .unwrap();
        assert_eq!(names(&doc), vec!["article", "body", "sec", "title", "p"]);
        let p = doc.find(&Selector::tag("p").into()).unwrap();
        assert_eq!(doc.text(p), "Text & more");
        let p_node = doc.get(p).unwrap();
        assert_eq!(p_node.children().count(), 1);
    }

    #[test]
    fn xml_self_closing_elements_have_no_children() {
        let doc = Document::parse_xml("<p>before<xref ref-type=\"bibr\"/>after</p>").unwrap();
        let xref = doc.find(&Selector::tag("xref").into()).unwrap();
        assert!(!doc.get(xref).unwrap().has_children());
        let p = doc.find(&Selector::tag("p").into()).unwrap();
        assert_eq!(doc.text(p), "beforeafter");
    }

    #[test]
    fn xml_ignores_stray_end_tags() {
        let doc = Document::parse_xml("<sec><p>one</p></em><p>two</p></sec>").unwrap();
        let sec = doc.find(&Selector::tag("sec").into()).unwrap();
        assert_eq!(doc.get(sec).unwrap().children().count(), 2);
    }

    #[test]
    fn xml_closes_to_matching_ancestor() {
        let doc = Document::parse_xml("<sec><p>one<i>two</sec><p>three</p>").unwrap();
        let root_children: Vec<_> = doc
            .root()
            .children()
            .filter_map(|n| n.value().as_element().map(|e| e.name.clone()))
            .collect();
        assert_eq!(root_children, vec!["sec", "p"]);
    }

    #[test]
    fn xml_attribute_entities_are_resolved() {
        let doc = Document::parse_xml(r#"<a title="x &lt; y &#65;">t</a>"#).unwrap();
        let a = doc.find(&Selector::tag("a").into()).unwrap();
        let el = doc.get(a).unwrap().value().as_element().unwrap().clone();
        assert_eq!(el.attr("title"), Some(&AttrValue::Single("x < y A".into())));
    }

    #[test]
    fn xml_unterminated_tag_is_an_error() {
        let err = Document::parse_xml("<sec><title>Intro</title><p attr=\"open></sec>").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn xml_resolves_html_named_entities() {
        let doc = Document::parse_xml(
            r#"<p title="x &ndash; y">10&ndash;20 K and &alpha; phase &#x3B2;&#946; &bogus;</p>"#,
        )
        .unwrap();
        let p = doc.find(&Selector::tag("p").into()).unwrap();
        assert_eq!(doc.text(p), "10–20 K and α phase ββ &bogus;");
        let el = doc.get(p).unwrap().value().as_element().unwrap().clone();
        assert_eq!(el.attr("title"), Some(&AttrValue::Single("x – y".into())));
    }

    #[test]
    fn xml_attribute_with_bare_ampersand_is_kept() {
        let doc = Document::parse_xml(r#"<a title="R &amp; D" href="?a=1&b=2">t</a>"#).unwrap();
        let a = doc.find(&Selector::tag("a").into()).unwrap();
        let el = doc.get(a).unwrap().value().as_element().unwrap().clone();
        assert_eq!(el.attr("title"), Some(&AttrValue::Single("R & D".into())));
        assert_eq!(el.attr("href"), Some(&AttrValue::Single("?a=1&b=2".into())));
    }

    fn nested(depth: usize) -> String {
        format!("{}<p>x</p>{}", "<div>".repeat(depth), "</div>".repeat(depth))
    }

    #[test]
    fn deep_nesting_builds_without_recursion() {
        let xml = Document::parse_xml(&nested(10_000)).unwrap();
        let p = xml.find(&Selector::tag("p").into()).unwrap();
        assert_eq!(xml.text(p), "x");
        assert_eq!(xml.elements().count(), 10_001);

        // html5ever rescans the open-element stack per tag, so keep this one smaller
        let html = Document::parse_html(&nested(2_000));
        let p = html.find(&Selector::tag("p").into()).unwrap();
        assert_eq!(html.text(p), "x");
        assert!(html.elements().count() > 2_000);
    }
}
