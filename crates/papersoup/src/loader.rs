// ABOUTME: Loader for recipe registries from embedded JSON data and recipe files on disk.
// ABOUTME: Provides load_builtin_registry() with the aip, springer_nature and iop recipes.

//! Recipe loading.
//!
//! The built-in recipes live in `data/recipes.json` and are compiled into
//! the binary. Callers can also load a single recipe from a JSON file, or
//! resolve a CLI argument that is either a registered name or a path.

use std::path::Path;
use std::sync::Arc;

use crate::error::SoupError;
use crate::recipe::{Recipe, RecipeRegistry};

/// Embedded JSON holding every built-in recipe.
const BUILTIN_RECIPES_JSON: &str = include_str!("../data/recipes.json");

/// Parses a JSON array of recipes. `source` names the input in errors.
pub fn parse_recipes(source: &str, json: &str) -> Result<Vec<Recipe>, SoupError> {
    let recipes: Vec<Recipe> = serde_json::from_str(json)
        .map_err(|e| SoupError::invalid_recipe(source, "load", Some(e.into())))?;
    for recipe in &recipes {
        recipe.validate().map_err(|msg| {
            SoupError::invalid_recipe(
                source,
                "load",
                Some(anyhow::anyhow!("{}: {}", recipe.name, msg)),
            )
        })?;
    }
    Ok(recipes)
}

/// Loads the built-in registry from embedded JSON.
pub fn load_builtin_registry() -> Result<RecipeRegistry, SoupError> {
    let mut registry = RecipeRegistry::new();
    for recipe in parse_recipes("builtin", BUILTIN_RECIPES_JSON)? {
        tracing::trace!(recipe = %recipe.name, stages = recipe.stages.len(), "registering builtin recipe");
        registry.register(recipe);
    }
    Ok(registry)
}

/// Reads one recipe object from a JSON file.
pub fn load_recipe_file(path: &Path) -> Result<Recipe, SoupError> {
    let source = path.display().to_string();
    let json = std::fs::read_to_string(path).map_err(|e| SoupError::io(source.as_str(), "load", e))?;
    Recipe::from_json(&source, &json)
}

/// Resolves `spec` as a registered recipe name first, then as a file path.
pub fn resolve_recipe(registry: &RecipeRegistry, spec: &str) -> Result<Arc<Recipe>, SoupError> {
    if let Some(recipe) = registry.get(spec) {
        return Ok(recipe);
    }
    let path = Path::new(spec);
    if path.exists() {
        return load_recipe_file(path).map(Arc::new);
    }
    Err(SoupError::invalid_recipe(
        spec,
        "load",
        Some(anyhow::anyhow!(
            "unknown recipe (known: {})",
            registry.names().join(", ")
        )),
    ))
}
