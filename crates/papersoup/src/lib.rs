// ABOUTME: Main library entry point for papersoup, a cleaner for scientific-paper HTML/XML markup.
// ABOUTME: Re-exports the public API: Soup, SoupBuilder, Recipe, RecipeRegistry, PaperRecord, Paragraph and errors.

//! papersoup - turns per-publisher paper markup into a normalized section
//! hierarchy and a flat list of path-addressed paragraphs.
//!
//! Publisher knowledge lives in JSON recipes; one generic runner parses the
//! markup, applies the recipe's tree mutations and extracts sections.
//!
//! # Example
//!
//! ```no_run
//! use papersoup::{load_builtin_registry, Soup, SoupError};
//!
//! fn main() -> Result<(), SoupError> {
//!     let registry = load_builtin_registry()?;
//!     let recipe = registry.get("nature").expect("builtin recipe");
//!     let html = std::fs::read_to_string("paper.html")
//!         .map_err(|e| SoupError::io("paper.html", "read", e))?;
//!     let record = Soup::new(recipe).parse("paper.html", &html)?;
//!     for p in record.paragraphs() {
//!         println!("{} {}", p.path, p.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod dom;
pub mod error;
pub mod flatten;
pub mod loader;
pub mod metadata;
pub mod options;
pub mod pipeline;
pub mod recipe;
pub mod record;
pub mod rules;
pub mod sections;
pub mod transform;

pub use crate::dom::{Document, MarkupKind};
pub use crate::error::{ErrorCode, MarkupError, SoupError, StageError};
pub use crate::flatten::{flatten_sections, Paragraph, PATH_SEPARATOR};
pub use crate::loader::{load_builtin_registry, load_recipe_file, resolve_recipe};
pub use crate::metadata::{FieldSource, FieldSpec, MetadataSpec};
pub use crate::options::SoupBuilder;
pub use crate::pipeline::{PipelineState, Soup};
pub use crate::recipe::{CollectSpec, ContainerSpec, Recipe, RecipeRegistry, Stage, Substitution};
pub use crate::record::PaperRecord;
pub use crate::rules::{Pattern, Selector, SelectorSet, TextRegex};
pub use crate::sections::{count_leaves, extract_sections, Content, Section, SectionLabel, SectionOptions};
