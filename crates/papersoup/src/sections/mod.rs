// ABOUTME: Section hierarchy types (Section, Content, SectionLabel) produced by the section extractor.
// ABOUTME: Re-exports the extractor and the hierarchy post-processing passes.

//! Nested section/paragraph hierarchy.
//!
//! A [`Section`] holds an ordered `content` list whose items are either raw
//! leaf text or nested sections. Mixed lists are legal and kept as-is.

mod extract;
mod trim;

use serde::{Deserialize, Serialize};

pub use extract::{extract_sections, SectionOptions};
pub use trim::{label_leading_untitled, strip_enumerator, strip_enumerators, trim_after_ending};

/// One node of the extracted hierarchy. Fields are declared in sorted order
/// so serialized keys come out sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub content: Vec<Content>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// An item of a section's content list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Section(Section),
}

impl Section {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            content: Vec::new(),
            name: name.into(),
            kind: kind.into(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(Content::Text(text.into()));
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.content.push(Content::Section(section));
        self
    }

    /// True for the implicit section that collects text before the first heading.
    pub fn is_untitled(&self) -> bool {
        self.name.is_empty() && self.kind.is_empty()
    }

    /// Number of leaf text items anywhere below this section.
    pub fn leaf_count(&self) -> usize {
        self.content
            .iter()
            .map(|c| match c {
                Content::Text(_) => 1,
                Content::Section(s) => s.leaf_count(),
            })
            .sum()
    }
}

/// Total number of leaf text items in a hierarchy.
pub fn count_leaves(sections: &[Section]) -> usize {
    sections.iter().map(Section::leaf_count).sum()
}

/// A `{type, name}` pair supplied by a recipe for sections it creates or
/// relabels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SectionLabel {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

impl SectionLabel {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}
