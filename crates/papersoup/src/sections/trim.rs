// ABOUTME: Post-processing passes over an extracted hierarchy: enumerator stripping and trailing-section trimming.
// ABOUTME: Also relabels an untitled leading section when a recipe asks for it.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Content, Section, SectionLabel};

// "2.1. ", "3 ", "3.", "III. ", "A. "
static ENUMERATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\d+(?:\.\d+)*\.?\s+|\d+(?:\.\d+)*\.|(?:[IVXLCDM]+|[ivxlcdm]+|[A-Za-z])\.\s*)")
        .unwrap()
});

/// Removes one leading enumerator from a section name. A name that would
/// become empty is returned unchanged.
pub fn strip_enumerator(name: &str) -> String {
    let stripped = ENUMERATOR_RE.replace(name, "");
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        name.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Applies [`strip_enumerator`] to every section name, recursively.
pub fn strip_enumerators(sections: &mut [Section]) {
    for section in sections {
        section.name = strip_enumerator(&section.name);
        for item in &mut section.content {
            if let Content::Section(child) = item {
                strip_enumerators(std::slice::from_mut(child));
            }
        }
    }
}

/// Drops every leaf that comes after (or inside) the first section whose
/// name matches one of `endings`, in reading order. Sections that are left
/// without content are pruned.
pub fn trim_after_ending(sections: Vec<Section>, endings: &[Regex]) -> Vec<Section> {
    if endings.is_empty() {
        return sections;
    }
    let mut trimming = false;
    sections
        .into_iter()
        .filter_map(|s| trim_section(s, endings, &mut trimming))
        .collect()
}

fn trim_section(mut section: Section, endings: &[Regex], trimming: &mut bool) -> Option<Section> {
    if !*trimming && endings.iter().any(|re| re.is_match(&section.name)) {
        tracing::debug!(name = %section.name, "ending section reached");
        *trimming = true;
    }
    let content = std::mem::take(&mut section.content);
    for item in content {
        match item {
            Content::Text(text) => {
                if !*trimming {
                    section.content.push(Content::Text(text));
                }
            }
            Content::Section(child) => {
                if let Some(kept) = trim_section(child, endings, trimming) {
                    section.content.push(Content::Section(kept));
                }
            }
        }
    }
    if section.content.is_empty() {
        None
    } else {
        Some(section)
    }
}

/// Gives the first top-level section `label` when it is untitled and at
/// least one other section follows it.
pub fn label_leading_untitled(sections: &mut [Section], label: &SectionLabel) -> bool {
    match sections {
        [first, _, ..] if first.is_untitled() => {
            first.kind = label.kind.clone();
            first.name = label.name.clone();
            true
        }
        _ => false,
    }
}
