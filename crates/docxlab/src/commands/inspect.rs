//! Inspect command - show the structure of a template archive

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use docxlab_core::{document_text, parse_template};

use crate::output;

pub fn run(template: PathBuf, json: bool, verbose: bool) -> Result<()> {
    let bytes = std::fs::read(&template)
        .with_context(|| format!("cannot read template '{}'", template.display()))?;
    let parsed = parse_template(bytes)?;
    let parts = parsed.store.part_names();
    let text = document_text(&parsed.tree, parsed.root);

    if json {
        let value = serde_json::json!({
            "mainDocument": parsed.main_document,
            "parts": parts,
            "text": text,
        });
        output::print_json(&serde_json::to_string_pretty(&value)?)?;
        return Ok(());
    }

    println!(
        "{} Main document: {}",
        "→".cyan(),
        parsed.main_document.bold()
    );
    println!("{} Parts:", "→".cyan());
    for part in &parts {
        println!("    {part}");
    }
    if verbose && !text.is_empty() {
        println!("{} Text content:", "→".cyan());
        output::print_text(&text)?;
    }
    Ok(())
}
