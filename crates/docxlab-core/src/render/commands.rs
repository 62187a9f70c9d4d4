//! Command normalisation and splitting
//!
//! Raw command text (the content between the two command delimiters) is
//! normalised into `NAME body` form before dispatch: shorthand prefixes are
//! expanded, bare expressions become INS, and typographic quotes are
//! optionally repaired.

use std::collections::BTreeMap;

use crate::error::{DocxlabError, Result};

pub const BUILT_IN_COMMANDS: &[&str] = &[
    "QUERY", "CMD_NODE", "ALIAS", "FOR", "END-FOR", "IF", "END-IF", "INS", "EXEC", "IMAGE",
    "LINK", "HTML",
];

fn first_token(cmd: &str) -> &str {
    cmd.split_whitespace().next().unwrap_or("")
}

fn is_built_in(cmd: &str) -> bool {
    let token = first_token(cmd).to_uppercase();
    BUILT_IN_COMMANDS.contains(&token.as_str())
}

fn fix_smart_quotes(cmd: &str) -> String {
    cmd.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' => '\'',
            other => other,
        })
        .collect()
}

/// Normalise a raw command body.
///
/// In order: `=` becomes `INS`, `!` becomes `EXEC`, `*name` expands the
/// shorthand registered by ALIAS, and anything whose first token is not a
/// built-in command is treated as an INS expression.
pub fn normalize_command(
    raw: &str,
    shorthands: &BTreeMap<String, String>,
    smart_quotes: bool,
) -> Result<String> {
    let trimmed = raw.trim();

    let mut cmd = if let Some(rest) = trimmed.strip_prefix('=') {
        format!("INS {rest}")
    } else if let Some(rest) = trimmed.strip_prefix('!') {
        format!("EXEC {rest}")
    } else if let Some(rest) = trimmed.strip_prefix('*') {
        let name = first_token(rest);
        match shorthands.get(name) {
            Some(expansion) => expansion.clone(),
            None => {
                return Err(DocxlabError::CommandSyntax(format!(
                    "unknown alias '*{name}'"
                )))
            }
        }
    } else if !is_built_in(trimmed) {
        format!("INS {trimmed}")
    } else {
        trimmed.to_string()
    };

    if smart_quotes {
        cmd = fix_smart_quotes(&cmd);
    }

    Ok(cmd.trim().to_string())
}

/// Split a normalised command into its uppercased name and trimmed body.
pub fn split_command(cmd: &str) -> (String, String) {
    match cmd.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_uppercase(), rest.trim().to_string()),
        None => (cmd.to_uppercase(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_shorthands() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    #[test]
    fn test_equals_prefix_is_ins() {
        let cmd = normalize_command("=name", &no_shorthands(), false).unwrap();
        assert_eq!(cmd, "INS name");
    }

    #[test]
    fn test_bang_prefix_is_exec() {
        let cmd = normalize_command("!length(items)", &no_shorthands(), false).unwrap();
        assert_eq!(cmd, "EXEC length(items)");
    }

    #[test]
    fn test_bare_expression_becomes_ins() {
        let cmd = normalize_command("name", &no_shorthands(), false).unwrap();
        assert_eq!(cmd, "INS name");
    }

    #[test]
    fn test_built_in_is_kept() {
        let cmd = normalize_command("FOR item IN items", &no_shorthands(), false).unwrap();
        assert_eq!(cmd, "FOR item IN items");
    }

    #[test]
    fn test_shorthand_expansion() {
        let mut shorthands = BTreeMap::new();
        shorthands.insert("row".to_string(), "INS $item.name".to_string());
        let cmd = normalize_command("*row", &shorthands, false).unwrap();
        assert_eq!(cmd, "INS $item.name");
    }

    #[test]
    fn test_unknown_shorthand_is_an_error() {
        let err = normalize_command("*nope", &no_shorthands(), false).unwrap_err();
        assert!(matches!(err, DocxlabError::CommandSyntax(_)));
    }

    #[test]
    fn test_smart_quote_fix() {
        let cmd = normalize_command("IF name == \u{2018}John\u{2019}", &no_shorthands(), true).unwrap();
        assert_eq!(cmd, "IF name == 'John'");
    }

    #[test]
    fn test_split_command() {
        let (name, rest) = split_command("for item IN items");
        assert_eq!(name, "FOR");
        assert_eq!(rest, "item IN items");

        let (name, rest) = split_command("END-IF");
        assert_eq!(name, "END-IF");
        assert_eq!(rest, "");
    }
}
