// ABOUTME: The Soup pipeline runner: applies a recipe's substitutions, parses, then folds the stages over the state.
// ABOUTME: Stage failures come back as SoupError tagged with the document id and "<index>:<op>" stage label.

use std::sync::Arc;

use regex::Regex;

use crate::dom::decode::decode_markup;
use crate::dom::Document;
use crate::error::{SoupError, StageError};
use crate::flatten::Paragraph;
use crate::metadata::collect_metadata;
use crate::options::SoupBuilder;
use crate::recipe::{CollectSpec, ContainerSpec, Recipe, Stage};
use crate::record::PaperRecord;
use crate::sections::{
    extract_sections, label_leading_untitled, strip_enumerators, trim_after_ending, Content,
    Section, SectionOptions,
};
use crate::transform;

/// What flows between stages: the working tree and the record built so far.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub doc: Document,
    pub record: PaperRecord,
}

impl PipelineState {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            record: PaperRecord::default(),
        }
    }
}

/// Runs one recipe over documents. Cheap to clone and safe to share across
/// threads; every call owns its own tree.
#[derive(Debug, Clone)]
pub struct Soup {
    recipe: Arc<Recipe>,
}

impl Soup {
    /// Start composing a recipe in code.
    pub fn builder(name: impl Into<String>) -> SoupBuilder {
        SoupBuilder::new(name)
    }

    pub fn new(recipe: Arc<Recipe>) -> Self {
        Self { recipe }
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Runs the recipe over `markup`. `doc_id` only labels errors and logs.
    pub fn parse(&self, doc_id: &str, markup: &str) -> Result<PaperRecord, SoupError> {
        let text = self.recipe.preprocess(markup);
        let doc = Document::parse(&text, self.recipe.markup)
            .map_err(|e| SoupError::malformed_markup(doc_id, "parse", Some(e.into())))?;

        let mut state = PipelineState::new(doc);
        for (i, stage) in self.recipe.stages.iter().enumerate() {
            let label = format!("{}:{}", i, stage.name());
            state = apply_stage(stage, state, &label)
                .map_err(|e| SoupError::from_stage(doc_id, label.as_str(), e))?;
        }
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(doc = doc_id, markup = %state.doc.to_markup(), "cleaned tree");
        }
        tracing::debug!(
            doc = doc_id,
            recipe = %self.recipe.name,
            leaves = state.record.leaf_count(),
            "document parsed"
        );
        Ok(state.record)
    }

    /// Decodes raw bytes (see [`decode_markup`]) and runs the recipe.
    pub fn parse_bytes(
        &self,
        doc_id: &str,
        bytes: &[u8],
        charset_hint: Option<&str>,
    ) -> Result<PaperRecord, SoupError> {
        let markup = decode_markup(bytes, charset_hint);
        self.parse(doc_id, &markup)
    }

    /// Like [`Soup::parse`], also returning the flattened paragraphs.
    pub fn parse_paragraphs(
        &self,
        doc_id: &str,
        markup: &str,
    ) -> Result<(PaperRecord, Vec<Paragraph>), SoupError> {
        let record = self.parse(doc_id, markup)?;
        let paragraphs = record.paragraphs();
        Ok((record, paragraphs))
    }
}

fn apply_stage(
    stage: &Stage,
    mut state: PipelineState,
    label: &str,
) -> Result<PipelineState, StageError> {
    let affected = match stage {
        Stage::Remove { rules } => transform::remove(&mut state.doc, rules),
        Stage::Strip { rules } => transform::strip(&mut state.doc, rules),
        Stage::Flatten { rules } => transform::flatten(&mut state.doc, rules),
        Stage::Rename { rules, to } => transform::rename(&mut state.doc, rules, to),
        Stage::RenameChildIfParentMatches { parent, child, to } => {
            transform::rename_child_if_parent_matches(&mut state.doc, parent, child, to)
        }
        Stage::RemoveIfNextSiblingMatches { node, sibling } => {
            transform::remove_if_next_sibling_matches(&mut state.doc, node, sibling)
        }
        Stage::Focus {
            candidates,
            required,
            cleanup,
        } => match transform::focus(&mut state.doc, candidates) {
            Some(index) => {
                let removed = cleanup
                    .get(index)
                    .and_then(Option::as_ref)
                    .map_or(0, |rules| transform::remove(&mut state.doc, rules));
                tracing::debug!(stage = label, candidate = index, removed, "focused");
                1
            }
            None if *required => return Err(StageError::StructuralNotFound(describe(candidates))),
            None => {
                tracing::warn!(stage = label, "no focus candidate matched, keeping whole document");
                0
            }
        },
        Stage::Metadata(spec) => {
            collect_metadata(&state.doc, spec, &mut state.record)?;
            0
        }
        Stage::Collect(spec) => {
            state.record.sections = collect(&state.doc, spec)?;
            state.record.leaf_count()
        }
    };
    tracing::debug!(stage = label, affected, "stage applied");
    Ok(state)
}

fn describe(candidates: &[crate::rules::SelectorSet]) -> String {
    candidates
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Extracts every container, then post-processes the combined hierarchy.
fn collect(doc: &Document, spec: &CollectSpec) -> Result<Vec<Section>, StageError> {
    let mut sections = Vec::new();
    if spec.containers.is_empty() {
        sections = extract_sections(doc, doc.root_id(), &spec.sections);
    }
    for container in &spec.containers {
        sections.extend(extract_container(doc, container, &spec.sections)?);
    }

    if spec.strip_enumerators {
        strip_enumerators(&mut sections);
    }
    let endings: Vec<Regex> = spec
        .ending_sections
        .iter()
        .map(|re| re.as_regex().clone())
        .collect();
    let mut sections = trim_after_ending(sections, &endings);
    if let Some(ref label) = spec.leading_untitled {
        label_leading_untitled(&mut sections, label);
    }
    Ok(sections)
}

fn extract_container(
    doc: &Document,
    container: &ContainerSpec,
    opts: &SectionOptions,
) -> Result<Vec<Section>, StageError> {
    let Some(id) = doc.find(&container.rules) else {
        if container.required {
            return Err(StageError::StructuralNotFound(container.rules.to_string()));
        }
        tracing::debug!(rules = %container.rules, "optional container absent");
        return Ok(Vec::new());
    };
    let extracted = extract_sections(doc, id, opts);
    let Some(ref label) = container.wrap else {
        return Ok(extracted);
    };

    // untitled parts are spliced straight into the wrapper
    let mut wrapper = Section::new(label.kind.clone(), label.name.clone());
    for section in extracted {
        if section.is_untitled() {
            wrapper.content.extend(section.content);
        } else {
            wrapper.content.push(Content::Section(section));
        }
    }
    if wrapper.content.is_empty() {
        Ok(Vec::new())
    } else {
        Ok(vec![wrapper])
    }
}
