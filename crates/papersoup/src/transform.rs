// ABOUTME: Tree transformation engine: remove, strip, flatten, rename and the two relational operations.
// ABOUTME: Each operation collects its matches in pre-order, then mutates; no match is a no-op.

//! In-place tree mutations driven by selectors.
//!
//! Every function returns how many nodes it changed. A selector that matches
//! nothing leaves the tree untouched: publishers vary, and a rule for a tag
//! that is absent from one document is not an error.

use ego_tree::NodeId;

use crate::dom::{collect_text, normalize_spaces, Document, Node};
use crate::rules::SelectorSet;

/// Deletes every matching node together with its sub-tree.
pub fn remove(doc: &mut Document, rules: &SelectorSet) -> usize {
    let mut removed = 0;
    for id in doc.find_all(rules) {
        if !doc.is_attached(id) {
            continue;
        }
        if let Some(mut node) = doc.get_mut(id) {
            node.detach();
            removed += 1;
        }
    }
    removed
}

/// Replaces every matching node by its children, spliced in at the node's
/// position in their original order.
pub fn strip(doc: &mut Document, rules: &SelectorSet) -> usize {
    let mut stripped = 0;
    for id in doc.find_all(rules) {
        if !doc.is_attached(id) {
            continue;
        }
        unwrap_node(doc, id);
        stripped += 1;
    }
    stripped
}

fn unwrap_node(doc: &mut Document, id: NodeId) {
    let children: Vec<NodeId> = match doc.get(id) {
        Some(node) => node.children().map(|c| c.id()).collect(),
        None => return,
    };
    for child in children {
        if let Some(mut node) = doc.get_mut(id) {
            node.insert_id_before(child);
        }
    }
    if let Some(mut node) = doc.get_mut(id) {
        node.detach();
    }
}

/// Replaces every matching node by a single text run holding its descendant
/// text, whitespace collapsed.
pub fn flatten(doc: &mut Document, rules: &SelectorSet) -> usize {
    let mut flattened = 0;
    for id in doc.find_all(rules) {
        if !doc.is_attached(id) {
            continue;
        }
        let mut text = String::new();
        if let Some(node) = doc.get(id) {
            collect_text(node, &mut text);
        }
        let text = normalize_spaces(&text);
        if let Some(mut node) = doc.get_mut(id) {
            node.insert_before(Node::Text(text));
            node.detach();
            flattened += 1;
        }
    }
    flattened
}

/// Changes the tag name of every matching node; attributes and children stay.
pub fn rename(doc: &mut Document, rules: &SelectorSet, new_name: &str) -> usize {
    let ids = doc.find_all(rules);
    rename_ids(doc, &ids, new_name)
}

fn rename_ids(doc: &mut Document, ids: &[NodeId], new_name: &str) -> usize {
    let mut renamed = 0;
    for id in ids {
        if let Some(mut node) = doc.get_mut(*id) {
            if let Node::Element(el) = node.value() {
                el.name = new_name.to_string();
                renamed += 1;
            }
        }
    }
    renamed
}

/// For every node matching `parent`, renames its direct children matching
/// `child`. Identically-tagged nodes elsewhere are left alone.
pub fn rename_child_if_parent_matches(
    doc: &mut Document,
    parent: &SelectorSet,
    child: &SelectorSet,
    new_name: &str,
) -> usize {
    let mut targets = Vec::new();
    for parent_id in doc.find_all(parent) {
        if let Some(node) = doc.get(parent_id) {
            targets.extend(
                node.children()
                    .filter(|c| child.matches(*c))
                    .map(|c| c.id()),
            );
        }
    }
    rename_ids(doc, &targets, new_name)
}

/// Deletes a matching node only when its next sibling matches `sibling`.
/// Whitespace-only text between the two is skipped; any other text run is a
/// sibling in its own right and never matches.
pub fn remove_if_next_sibling_matches(
    doc: &mut Document,
    node: &SelectorSet,
    sibling: &SelectorSet,
) -> usize {
    let targets: Vec<NodeId> = doc
        .find_all(node)
        .into_iter()
        .filter(|id| {
            doc.get(*id).is_some_and(|n| {
                let mut next = n.next_sibling();
                while let Some(candidate) = next {
                    match candidate.value() {
                        Node::Text(t) if t.trim().is_empty() => next = candidate.next_sibling(),
                        _ => break,
                    }
                }
                next.is_some_and(|s| sibling.matches(s))
            })
        })
        .collect();

    let mut removed = 0;
    for id in targets {
        if let Some(mut n) = doc.get_mut(id) {
            n.detach();
            removed += 1;
        }
    }
    removed
}

/// Replaces the document by a copy of the first node matched by the first
/// candidate set that matches anything, returning that candidate's index.
/// Returns `None` (leaving the document unchanged) when no candidate matches.
pub fn focus(doc: &mut Document, candidates: &[SelectorSet]) -> Option<usize> {
    let (index, id) = candidates
        .iter()
        .enumerate()
        .find_map(|(i, rules)| doc.find(rules).map(|id| (i, id)))?;
    *doc = doc.subtree(id);
    Some(index)
}
