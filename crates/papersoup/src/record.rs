// ABOUTME: PaperRecord struct holding the metadata and section hierarchy produced for one document.
// ABOUTME: Serializes with sorted, publisher-neutral keys and offers the flattened paragraph view.

use serde::{Deserialize, Serialize};

use crate::flatten::{flatten_sections, Paragraph};
use crate::sections::{count_leaves, Section};

/// The result of running a recipe over one document.
///
/// Keys serialize in sorted order (`DOI`, `Journal`, `Keywords`, `Sections`,
/// `Title`); absent optional fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    #[serde(rename = "DOI", default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(rename = "Journal", default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(rename = "Keywords", default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(rename = "Sections", default)]
    pub sections: Vec<Section>,
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl PaperRecord {
    /// Flattened paragraph view of `sections`.
    pub fn paragraphs(&self) -> Vec<Paragraph> {
        flatten_sections(&self.sections)
    }

    pub fn leaf_count(&self) -> usize {
        count_leaves(&self.sections)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn skips_absent_fields_and_sorts_keys() {
        let record = PaperRecord {
            doi: Some("10.1/x".into()),
            sections: vec![Section::new("section_h1", "A").with_text("a")],
            ..Default::default()
        };
        assert_eq!(
            record.to_json().unwrap(),
            r#"{"DOI":"10.1/x","Sections":[{"content":["a"],"name":"A","type":"section_h1"}]}"#
        );
    }

    #[test]
    fn full_record_key_order() {
        let record = PaperRecord {
            doi: Some("d".into()),
            journal: Some("j".into()),
            keywords: Some(vec![]),
            sections: vec![],
            title: Some("t".into()),
        };
        let json = record.to_json().unwrap();
        let positions: Vec<usize> = ["\"DOI\"", "\"Journal\"", "\"Keywords\"", "\"Sections\"", "\"Title\""]
            .iter()
            .map(|k| json.find(k).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
        let back: PaperRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn paragraphs_cover_every_leaf() {
        let record = PaperRecord {
            sections: vec![
                Section::new("", "").with_text("lead"),
                Section::new("section_h1", "B")
                    .with_section(Section::new("section_h2", "C").with_text("c")),
            ],
            ..Default::default()
        };
        assert_eq!(record.paragraphs().len(), record.leaf_count());
    }
}
