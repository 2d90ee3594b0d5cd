// ABOUTME: Rule-based metadata extraction (DOI, Title, Journal, Keywords) from <meta> tags, element text or attributes.
// ABOUTME: Sources are tried in order; the first source yielding a non-empty value wins.

//! Metadata field extraction.
//!
//! A [`FieldSpec`] lists sources in priority order:
//! - `{"meta": "citation_doi"}` reads the `content` of `<meta name=...>` (or
//!   `property=...`);
//! - `{"text": <rules>}` reads the whitespace-normalized text of matching nodes;
//! - `{"attr": {"rules": <rules>, "name": "href"}}` reads an attribute.
//!
//! Values are optionally split on a delimiter, then passed through the
//! `capture` regex (group 1 if present, else the whole match); values the
//! regex does not match are discarded. With `allow_multiple` false only the
//! first value is kept.

use serde::Deserialize;

use crate::dom::{normalize_spaces, Document};
use crate::error::StageError;
use crate::record::PaperRecord;
use crate::rules::{SelectorSet, TextRegex};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Meta(String),
    Text(SelectorSet),
    Attr { rules: SelectorSet, name: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    pub sources: Vec<FieldSource>,
    pub allow_multiple: bool,
    pub required: bool,
    pub capture: Option<TextRegex>,
    pub split: Option<String>,
}

impl FieldSpec {
    pub fn new(sources: Vec<FieldSource>) -> Self {
        Self {
            sources,
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    pub fn with_capture(mut self, capture: TextRegex) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_split(mut self, delimiter: impl Into<String>) -> Self {
        self.split = Some(delimiter.into());
        self
    }

    fn refine(&self, raw: &str) -> Option<String> {
        let value = normalize_spaces(raw);
        let value = match self.capture {
            Some(ref re) => {
                let caps = re.captures(&value)?;
                let m = caps.get(1).or_else(|| caps.get(0))?;
                m.as_str().trim().to_string()
            }
            None => value,
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Which metadata fields a recipe collects. Absent fields are not touched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataSpec {
    pub doi: Option<FieldSpec>,
    pub title: Option<FieldSpec>,
    pub journal: Option<FieldSpec>,
    pub keywords: Option<FieldSpec>,
}

/// Extracts the values of one field, in document order.
pub fn extract_field(doc: &Document, field: &FieldSpec) -> Vec<String> {
    for source in &field.sources {
        let mut values: Vec<String> = source_values(doc, source)
            .iter()
            .flat_map(|raw| match field.split {
                Some(ref delim) => raw.split(delim.as_str()).map(str::to_string).collect(),
                None => vec![raw.clone()],
            })
            .filter_map(|raw| field.refine(&raw))
            .collect();
        if !values.is_empty() {
            if !field.allow_multiple {
                values.truncate(1);
            }
            return values;
        }
    }
    Vec::new()
}

/// First value of a field, if any.
pub fn extract_field_first(doc: &Document, field: &FieldSpec) -> Option<String> {
    extract_field(doc, field).into_iter().next()
}

fn source_values(doc: &Document, source: &FieldSource) -> Vec<String> {
    match source {
        FieldSource::Meta(key) => doc
            .elements()
            .filter_map(|node| node.value().as_element())
            .filter(|el| el.name.eq_ignore_ascii_case("meta"))
            .filter(|el| {
                ["name", "property"]
                    .iter()
                    .any(|attr| el.attr(attr).is_some_and(|v| v.joined() == key.as_str()))
            })
            .filter_map(|el| el.attr("content").map(|v| v.joined().into_owned()))
            .collect(),
        FieldSource::Text(rules) => doc
            .find_all(rules)
            .into_iter()
            .map(|id| doc.normalized_text(id))
            .collect(),
        FieldSource::Attr { rules, name } => doc
            .find_all(rules)
            .into_iter()
            .filter_map(|id| doc.get(id))
            .filter_map(|node| node.value().as_element())
            .filter_map(|el| el.attr(name).map(|v| v.joined().into_owned()))
            .collect(),
    }
}

/// Fills the record from `spec`. A required field with no value raises
/// MetadataNotFound; other missing fields leave the record untouched.
pub fn collect_metadata(
    doc: &Document,
    spec: &MetadataSpec,
    record: &mut PaperRecord,
) -> Result<(), StageError> {
    if let Some(ref field) = spec.doi {
        if let Some(doi) = first_or_fail(doc, field, "DOI")? {
            record.doi = Some(doi);
        }
    }
    if let Some(ref field) = spec.title {
        if let Some(title) = first_or_fail(doc, field, "Title")? {
            record.title = Some(title);
        }
    }
    if let Some(ref field) = spec.journal {
        if let Some(journal) = first_or_fail(doc, field, "Journal")? {
            record.journal = Some(journal);
        }
    }
    if let Some(ref field) = spec.keywords {
        let keywords = extract_field(doc, field);
        if keywords.is_empty() && field.required {
            return Err(StageError::MetadataNotFound("Keywords".to_string()));
        }
        record.keywords = Some(keywords);
    }
    Ok(())
}

fn first_or_fail(
    doc: &Document,
    field: &FieldSpec,
    label: &str,
) -> Result<Option<String>, StageError> {
    match extract_field_first(doc, field) {
        Some(value) => Ok(Some(value)),
        None if field.required => Err(StageError::MetadataNotFound(label.to_string())),
        None => {
            tracing::debug!(field = label, "metadata field not found");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Selector;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<html><head>
        <meta name="citation_doi" content="doi: 10.1038/nmat1234">
        <meta name="citation_title" content="A   study of
            oxides">
        <meta property="og:site_name" content="Nature Materials">
        <meta name="keywords" content="oxides, catalysis , thin films">
        </head><body>
        <div class="publicationContentCitation">J. Appl. Phys. <a href="https://doi.org/10.1063/1.5">https://doi.org/10.1063/1.5</a></div>
        <li class="topicTags">Oxides</li><li class="topicTags">Films</li>
        </body></html>"#;

    #[test]
    fn meta_with_capture() {
        let doc = Document::parse_html(PAGE);
        let field = FieldSpec::new(vec![FieldSource::Meta("citation_doi".into())])
            .with_capture(TextRegex::new(r"10\.\S+").unwrap());
        assert_eq!(extract_field_first(&doc, &field).as_deref(), Some("10.1038/nmat1234"));
    }

    #[test]
    fn falls_back_through_sources() {
        let doc = Document::parse_html(PAGE);
        let field = FieldSpec::new(vec![
            FieldSource::Meta("prism.doi".into()),
            FieldSource::Attr {
                rules: Selector::tag("a").into(),
                name: "href".into(),
            },
        ])
        .with_capture(TextRegex::new(r"doi\.org/(.+)").unwrap());
        assert_eq!(extract_field_first(&doc, &field).as_deref(), Some("10.1063/1.5"));
    }

    #[test]
    fn property_meta_and_whitespace() {
        let doc = Document::parse_html(PAGE);
        let journal = FieldSpec::new(vec![FieldSource::Meta("og:site_name".into())]);
        assert_eq!(extract_field_first(&doc, &journal).as_deref(), Some("Nature Materials"));
        let title = FieldSpec::new(vec![FieldSource::Meta("citation_title".into())]);
        assert_eq!(extract_field_first(&doc, &title).as_deref(), Some("A study of oxides"));
    }

    #[test]
    fn multiple_values_and_split() {
        let doc = Document::parse_html(PAGE);
        let tags = FieldSpec::new(vec![FieldSource::Text(
            Selector::tag("li").with_attr("class", "topicTags").into(),
        )])
        .multiple();
        assert_eq!(extract_field(&doc, &tags), vec!["Oxides", "Films"]);

        let split = FieldSpec::new(vec![FieldSource::Meta("keywords".into())])
            .multiple()
            .with_split(",");
        assert_eq!(extract_field(&doc, &split), vec!["oxides", "catalysis", "thin films"]);

        let single = FieldSpec::new(vec![FieldSource::Meta("keywords".into())]).with_split(",");
        assert_eq!(extract_field(&doc, &single), vec!["oxides"]);
    }

    #[test]
    fn required_field_missing_is_an_error() {
        let doc = Document::parse_html("<p>nothing</p>");
        let spec = MetadataSpec {
            doi: Some(FieldSpec::new(vec![FieldSource::Meta("citation_doi".into())]).required()),
            ..Default::default()
        };
        let mut record = PaperRecord::default();
        let err = collect_metadata(&doc, &spec, &mut record).unwrap_err();
        assert!(matches!(err, StageError::MetadataNotFound(ref f) if f == "DOI"));
    }

    #[test]
    fn optional_fields_fill_record() {
        let doc = Document::parse_html(PAGE);
        let spec: MetadataSpec = serde_json::from_str(
            r#"{
                "doi": {"sources": [{"meta": "citation_doi"}], "capture": "10\\.\\S+", "required": true},
                "title": {"sources": [{"meta": "citation_title"}]},
                "journal": {"sources": [{"meta": "citation_journal_title"}]},
                "keywords": {"sources": [{"text": {"name": "li", "class": "topicTags"}}], "allow_multiple": true}
            }"#,
        )
        .unwrap();
        let mut record = PaperRecord::default();
        collect_metadata(&doc, &spec, &mut record).unwrap();
        assert_eq!(record.doi.as_deref(), Some("10.1038/nmat1234"));
        assert_eq!(record.title.as_deref(), Some("A study of oxides"));
        assert_eq!(record.journal, None);
        assert_eq!(record.keywords, Some(vec!["Oxides".to_string(), "Films".to_string()]));
    }
}
