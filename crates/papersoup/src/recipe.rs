// ABOUTME: Recipe data model: markup kind, raw-text substitutions and the ordered Stage list, plus RecipeRegistry.
// ABOUTME: Recipes are plain JSON interpreted by the generic pipeline runner; regexes compile at load time.

//! Per-publisher recipes.
//!
//! A recipe is the whole publisher-specific part of the pipeline, written as
//! data:
//!
//! ```json
//! {
//!   "name": "aip",
//!   "markup": "html",
//!   "preprocess": [{"pattern": "<br\\s*/?>", "replacement": " "}],
//!   "stages": [
//!     {"op": "remove", "rules": [{"name": "code"}, {"name": "table"}]},
//!     {"op": "focus", "candidates": [{"name": "fulltext"}]},
//!     {"op": "rename", "rules": {"name": "title"}, "to": "h1"},
//!     {"op": "collect", "containers": [{"rules": {"name": "body"}}]}
//!   ]
//! }
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::dom::MarkupKind;
use crate::error::SoupError;
use crate::metadata::MetadataSpec;
use crate::rules::{SelectorSet, TextRegex};
use crate::sections::{SectionLabel, SectionOptions};

/// A regex replacement applied to the raw markup before parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct Substitution {
    pub pattern: TextRegex,
    #[serde(default)]
    pub replacement: String,
}

impl Substitution {
    pub fn new(pattern: TextRegex, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
        }
    }

    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.pattern.replace_all(text, self.replacement.as_str())
    }
}

/// One step of a recipe. The JSON form is tagged by `op`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Stage {
    Remove {
        rules: SelectorSet,
    },
    Strip {
        rules: SelectorSet,
    },
    Flatten {
        rules: SelectorSet,
    },
    Rename {
        rules: SelectorSet,
        to: String,
    },
    RenameChildIfParentMatches {
        parent: SelectorSet,
        child: SelectorSet,
        to: String,
    },
    RemoveIfNextSiblingMatches {
        node: SelectorSet,
        sibling: SelectorSet,
    },
    /// Re-root the document at the first candidate that matches. `cleanup`
    /// is indexed like `candidates`: entry `i` is removed from the new root
    /// only when candidate `i` was the one focused.
    Focus {
        candidates: Vec<SelectorSet>,
        #[serde(default = "default_true")]
        required: bool,
        #[serde(default)]
        cleanup: Vec<Option<SelectorSet>>,
    },
    Metadata(MetadataSpec),
    Collect(CollectSpec),
}

fn default_true() -> bool {
    true
}

impl Stage {
    /// The `op` name, used in stage labels and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Remove { .. } => "remove",
            Stage::Strip { .. } => "strip",
            Stage::Flatten { .. } => "flatten",
            Stage::Rename { .. } => "rename",
            Stage::RenameChildIfParentMatches { .. } => "rename_child_if_parent_matches",
            Stage::RemoveIfNextSiblingMatches { .. } => "remove_if_next_sibling_matches",
            Stage::Focus { .. } => "focus",
            Stage::Metadata(_) => "metadata",
            Stage::Collect(_) => "collect",
        }
    }

    fn validate(&self) -> Result<(), String> {
        let sets: Vec<(&str, &SelectorSet)> = match self {
            Stage::Remove { rules } | Stage::Strip { rules } | Stage::Flatten { rules } => {
                vec![("rules", rules)]
            }
            Stage::Rename { rules, to } => {
                check_name(to)?;
                vec![("rules", rules)]
            }
            Stage::RenameChildIfParentMatches { parent, child, to } => {
                check_name(to)?;
                vec![("parent", parent), ("child", child)]
            }
            Stage::RemoveIfNextSiblingMatches { node, sibling } => {
                vec![("node", node), ("sibling", sibling)]
            }
            Stage::Focus {
                candidates,
                cleanup,
                ..
            } => {
                if candidates.is_empty() {
                    return Err("focus needs at least one candidate".to_string());
                }
                if cleanup.len() > candidates.len() {
                    return Err("focus has more cleanup entries than candidates".to_string());
                }
                candidates
                    .iter()
                    .map(|c| ("candidates", c))
                    .chain(cleanup.iter().flatten().map(|c| ("cleanup", c)))
                    .collect()
            }
            Stage::Metadata(_) => Vec::new(),
            Stage::Collect(spec) => spec.containers.iter().map(|c| ("containers", &c.rules)).collect(),
        };
        match sets.into_iter().find(|(_, set)| set.is_empty()) {
            Some((field, _)) => Err(format!("{} must not be empty", field)),
            None => Ok(()),
        }
    }
}

fn check_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        Err("target tag name must not be empty".to_string())
    } else {
        Ok(())
    }
}

/// A node to extract sections from.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerSpec {
    pub rules: SelectorSet,
    #[serde(default)]
    pub required: bool,
    /// Wrap everything extracted from this container in one labelled section.
    #[serde(default)]
    pub wrap: Option<SectionLabel>,
}

impl ContainerSpec {
    pub fn new(rules: impl Into<SelectorSet>) -> Self {
        Self {
            rules: rules.into(),
            required: false,
            wrap: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn wrap(mut self, label: SectionLabel) -> Self {
        self.wrap = Some(label);
        self
    }
}

/// Settings for the final collect stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectSpec {
    /// Containers in output order. Empty means the document root.
    pub containers: Vec<ContainerSpec>,
    pub sections: SectionOptions,
    /// Section names that end the useful text (acknowledgements, references).
    pub ending_sections: Vec<TextRegex>,
    pub leading_untitled: Option<SectionLabel>,
    pub strip_enumerators: bool,
}

impl Default for CollectSpec {
    fn default() -> Self {
        Self {
            containers: Vec::new(),
            sections: SectionOptions::default(),
            ending_sections: Vec::new(),
            leading_untitled: None,
            strip_enumerators: true,
        }
    }
}

/// A complete publisher pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub markup: MarkupKind,
    #[serde(default)]
    pub preprocess: Vec<Substitution>,
    pub stages: Vec<Stage>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, markup: MarkupKind) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            version: String::new(),
            markup,
            preprocess: Vec::new(),
            stages: Vec::new(),
        }
    }

    /// Parses and validates a recipe. `source` names it in errors.
    pub fn from_json(source: &str, json: &str) -> Result<Self, SoupError> {
        let recipe: Recipe = serde_json::from_str(json)
            .map_err(|e| SoupError::invalid_recipe(source, "load", Some(e.into())))?;
        recipe.validate().map_err(|msg| {
            SoupError::invalid_recipe(source, "load", Some(anyhow::anyhow!(msg)))
        })?;
        Ok(recipe)
    }

    /// Checks what serde cannot: non-empty rule sets and target names.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("recipe name must not be empty".to_string());
        }
        for (i, stage) in self.stages.iter().enumerate() {
            stage
                .validate()
                .map_err(|msg| format!("stage {}:{}: {}", i, stage.name(), msg))?;
        }
        Ok(())
    }

    /// Applies the substitutions in order.
    pub fn preprocess<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        let mut text = Cow::Borrowed(raw);
        for sub in &self.preprocess {
            let replaced = match sub.apply(&text) {
                Cow::Owned(s) => Some(s),
                Cow::Borrowed(_) => None,
            };
            if let Some(s) = replaced {
                text = Cow::Owned(s);
            }
        }
        text
    }
}

/// Recipes keyed by name and alias.
#[derive(Debug, Default, Clone)]
pub struct RecipeRegistry {
    map: HashMap<String, Arc<Recipe>>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a recipe under its name and every alias.
    pub fn register(&mut self, recipe: Recipe) {
        let shared = Arc::new(recipe);
        for alias in &shared.aliases {
            self.map.insert(alias.clone(), Arc::clone(&shared));
        }
        self.map.insert(shared.name.clone(), shared);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Recipe>> {
        self.map.get(name).cloned()
    }

    /// Canonical recipe names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .map
            .iter()
            .filter(|(key, recipe)| **key == recipe.name)
            .map(|(key, _)| key.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of name and alias mappings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
