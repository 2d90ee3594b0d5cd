// ABOUTME: CLI binary for papersoup.
// ABOUTME: Runs a built-in or file-based recipe over paper files and prints the records (or paragraphs) as JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use papersoup::{load_builtin_registry, resolve_recipe, MarkupKind, PaperRecord, Recipe, Soup, SoupError};
use serde_json::Value;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "papersoup")]
#[command(about = "Clean scientific-paper markup into sections and paragraphs")]
struct Args {
    /// Recipe name (aip, springer_nature, nature, springer, iop) or path to a recipe JSON file
    #[arg(short = 'r', long = "recipe")]
    recipe: String,

    /// Force the XML parser regardless of the recipe
    #[arg(long = "xml", conflicts_with = "html")]
    xml: bool,

    /// Force the HTML parser regardless of the recipe
    #[arg(long = "html")]
    html: bool,

    /// Print flattened paragraphs instead of the nested record
    #[arg(long = "paragraphs")]
    paragraphs: bool,

    /// Single-line JSON instead of pretty-printed
    #[arg(long = "compact")]
    compact: bool,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Paper files to process
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_soup(args: &Args) -> Result<Soup, SoupError> {
    let registry = load_builtin_registry()?;
    let recipe = resolve_recipe(&registry, &args.recipe)?;
    let forced = if args.xml {
        Some(MarkupKind::Xml)
    } else if args.html {
        Some(MarkupKind::Html)
    } else {
        None
    };
    match forced {
        Some(kind) if kind != recipe.markup => {
            let mut owned: Recipe = (*recipe).clone();
            owned.markup = kind;
            Ok(Soup::new(owned.into()))
        }
        _ => Ok(Soup::new(recipe)),
    }
}

fn render(record: &PaperRecord, paragraphs: bool) -> serde_json::Result<Value> {
    if paragraphs {
        serde_json::to_value(record.paragraphs())
    } else {
        serde_json::to_value(record)
    }
}

fn process(soup: &Soup, path: &Path, paragraphs: bool) -> Result<Value, SoupError> {
    let doc_id = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| SoupError::io(doc_id.as_str(), "read", e))?;
    let record = soup.parse_bytes(&doc_id, &bytes, None)?;
    debug!(doc = %doc_id, sections = record.sections.len(), "processed");
    render(&record, paragraphs)
        .map_err(|e| SoupError::invalid_recipe(doc_id.as_str(), "serialize", Some(e.into())))
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    let soup = match build_soup(&args) {
        Ok(soup) => soup,
        Err(e) => {
            error!(error = %e, "cannot load recipe");
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    let mut results: Vec<Value> = Vec::new();
    let mut had_error = false;
    for path in &args.files {
        match process(&soup, path, args.paragraphs) {
            Ok(value) => results.push(value),
            Err(e) => {
                error!(error = %e, "document failed");
                eprintln!("error: {}", e);
                had_error = true;
            }
        }
    }

    if !results.is_empty() {
        let value = if args.files.len() == 1 {
            results.remove(0)
        } else {
            Value::Array(results)
        };
        let rendered = if args.compact {
            serde_json::to_string(&value)
        } else {
            serde_json::to_string_pretty(&value)
        };
        let output_str = match rendered {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::from(1);
            }
        };

        if let Some(output_path) = &args.output {
            if let Err(e) = fs::write(output_path, format!("{}\n", output_str)) {
                eprintln!("error writing to {:?}: {}", output_path, e);
                had_error = true;
            }
        } else {
            println!("{}", output_str);
        }
    }

    if had_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
