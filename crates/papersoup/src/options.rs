// ABOUTME: SoupBuilder, a fluent API for composing a recipe in code instead of JSON.
// ABOUTME: build() validates the recipe the same way the JSON loader does and returns a ready Soup.

use std::sync::Arc;

use crate::dom::MarkupKind;
use crate::error::SoupError;
use crate::metadata::MetadataSpec;
use crate::pipeline::Soup;
use crate::recipe::{CollectSpec, Recipe, Stage, Substitution};
use crate::rules::{SelectorSet, TextRegex};

/// Builder for constructing a [`Soup`] stage by stage.
#[derive(Debug, Clone)]
pub struct SoupBuilder {
    recipe: Recipe,
}

impl SoupBuilder {
    /// Create a builder for an HTML recipe with no stages.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            recipe: Recipe::new(name, MarkupKind::Html),
        }
    }

    /// Set the parser used for input markup.
    pub fn markup(mut self, kind: MarkupKind) -> Self {
        self.recipe.markup = kind;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.recipe.version = version.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.recipe.aliases.push(alias.into());
        self
    }

    /// Add a raw-text substitution applied before parsing.
    pub fn substitute(mut self, pattern: TextRegex, replacement: impl Into<String>) -> Self {
        self.recipe
            .preprocess
            .push(Substitution::new(pattern, replacement));
        self
    }

    /// Append an arbitrary stage.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.recipe.stages.push(stage);
        self
    }

    pub fn remove(self, rules: impl Into<SelectorSet>) -> Self {
        self.stage(Stage::Remove {
            rules: rules.into(),
        })
    }

    pub fn strip(self, rules: impl Into<SelectorSet>) -> Self {
        self.stage(Stage::Strip {
            rules: rules.into(),
        })
    }

    pub fn flatten(self, rules: impl Into<SelectorSet>) -> Self {
        self.stage(Stage::Flatten {
            rules: rules.into(),
        })
    }

    pub fn rename(self, rules: impl Into<SelectorSet>, to: impl Into<String>) -> Self {
        self.stage(Stage::Rename {
            rules: rules.into(),
            to: to.into(),
        })
    }

    pub fn rename_child_if_parent_matches(
        self,
        parent: impl Into<SelectorSet>,
        child: impl Into<SelectorSet>,
        to: impl Into<String>,
    ) -> Self {
        self.stage(Stage::RenameChildIfParentMatches {
            parent: parent.into(),
            child: child.into(),
            to: to.into(),
        })
    }

    pub fn remove_if_next_sibling_matches(
        self,
        node: impl Into<SelectorSet>,
        sibling: impl Into<SelectorSet>,
    ) -> Self {
        self.stage(Stage::RemoveIfNextSiblingMatches {
            node: node.into(),
            sibling: sibling.into(),
        })
    }

    /// Re-root at the first matching candidate; fails the document when none match.
    pub fn focus(self, candidates: Vec<SelectorSet>) -> Self {
        self.stage(Stage::Focus {
            candidates,
            required: true,
            cleanup: Vec::new(),
        })
    }

    /// Re-root at the first matching candidate if any.
    pub fn try_focus(self, candidates: Vec<SelectorSet>) -> Self {
        self.stage(Stage::Focus {
            candidates,
            required: false,
            cleanup: Vec::new(),
        })
    }

    pub fn metadata(self, spec: MetadataSpec) -> Self {
        self.stage(Stage::Metadata(spec))
    }

    pub fn collect(self, spec: CollectSpec) -> Self {
        self.stage(Stage::Collect(spec))
    }

    /// Validate and return the recipe without wrapping it.
    pub fn into_recipe(self) -> Result<Recipe, SoupError> {
        let name = self.recipe.name.clone();
        self.recipe.validate().map_err(|msg| {
            SoupError::invalid_recipe(name, "build", Some(anyhow::anyhow!(msg)))
        })?;
        Ok(self.recipe)
    }

    /// Build the Soup with the configured stages.
    pub fn build(self) -> Result<Soup, SoupError> {
        Ok(Soup::new(Arc::new(self.into_recipe()?)))
    }
}
