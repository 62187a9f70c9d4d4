//! Render command - expand a template against a JSON data binding

use anyhow::{anyhow, Result};
use colored::Colorize;
use docxlab_core::{create_report_from_file, Delimiters, ReportData, ReportOptions};

use crate::cli::RenderArgs;
use crate::data::load_data;

fn parse_delimiters(spec: &str) -> Result<Delimiters> {
    match spec.split_once(',') {
        Some((open, close)) if !open.is_empty() && !close.is_empty() => {
            Ok(Delimiters::new(open, close))
        }
        None if !spec.is_empty() => Ok(Delimiters::new(spec, spec)),
        _ => Err(anyhow!("invalid delimiter spec '{spec}' (expected open,close)")),
    }
}

pub fn run(args: RenderArgs, verbose: bool) -> Result<()> {
    let data = match &args.data {
        Some(path) => load_data(path)?,
        None => ReportData::new(),
    };

    let mut options = ReportOptions {
        fail_fast: args.fail_fast,
        fix_smart_quotes: args.fix_smart_quotes,
        reject_nullish: args.reject_nullish,
        ..Default::default()
    };
    if let Some(spec) = &args.delimiters {
        options.cmd_delimiter = parse_delimiters(spec)?;
    }
    if let Some(depth) = args.max_walk_depth {
        options.maximum_walk_depth = depth;
    }

    if verbose {
        println!(
            "{} Rendering '{}'",
            "→".cyan(),
            args.template.display()
        );
    }

    let bytes = create_report_from_file(&args.template, &data, &options)?;
    std::fs::write(&args.output, &bytes)?;

    println!(
        "{} Wrote '{}' ({} bytes)",
        "✓".green().bold(),
        args.output.display(),
        bytes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiters() {
        let d = parse_delimiters("{,}").unwrap();
        assert_eq!((d.open.as_str(), d.close.as_str()), ("{", "}"));

        let same = parse_delimiters("$$").unwrap();
        assert_eq!((same.open.as_str(), same.close.as_str()), ("$$", "$$"));

        assert!(parse_delimiters(",").is_err());
    }
}
