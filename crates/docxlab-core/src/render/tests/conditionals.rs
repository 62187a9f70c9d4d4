//! IF / END-IF expansion.

use super::helpers::*;

fn if_paragraph(condition: &str, body: &str) -> String {
    runs_paragraph(&[&format!("+++IF {condition}+++"), body, "+++END-IF+++"])
}

#[test]
fn test_boolean_conditions() {
    let body = format!(
        "{}{}",
        if_paragraph("isActive", "Active user"),
        if_paragraph("isInactive", "Inactive user"),
    );
    let result = render(&document(&body), &scalar_data());
    let text = rendered_text(&result);
    assert!(text.contains("Active user"));
    assert!(!text.contains("Inactive user"));
    assert!(result.errors.is_empty());
}

#[test]
fn test_string_comparisons() {
    let body = format!(
        "{}{}{}",
        if_paragraph("name == 'John'", "Name is John"),
        if_paragraph("name == 'Jane'", "Name is Jane"),
        if_paragraph("name != 'Sean'", "Name is not Sean"),
    );
    let result = render(&document(&body), &scalar_data());
    let text = rendered_text(&result);
    assert!(text.contains("Name is John"));
    assert!(text.contains("Name is not Sean"));
    assert!(!text.contains("Name is Jane"));
}

#[test]
fn test_numeric_comparisons() {
    let body = format!(
        "{}{}{}",
        if_paragraph("age > 18", "Adult"),
        if_paragraph("score >= 80", "High Score"),
        if_paragraph("score < 50", "Low Score"),
    );
    let result = render(&document(&body), &scalar_data());
    let text = rendered_text(&result);
    assert!(text.contains("Adult"));
    assert!(text.contains("High Score"));
    assert!(!text.contains("Low Score"));
}

#[test]
fn test_undefined_condition_is_falsy() {
    let result = render(
        &document(&if_paragraph("missingKey", "never")),
        &scalar_data(),
    );
    assert!(!rendered_text(&result).contains("never"));
    assert!(result.errors.is_empty());
}

#[test]
fn test_if_over_own_paragraphs_collapses_them() {
    let template = document_of(&["+++IF isActive+++", "visible", "+++END-IF+++", "tail"]);
    let result = render(&template, &scalar_data());
    let text = rendered_text(&result);
    assert_in_order(&text, &["visible", "tail"]);
    // Command-only paragraphs are gone.
    assert!(!text.contains("IF"));
}

#[test]
fn test_falsy_if_keeps_surrounding_text_of_its_paragraph() {
    // The paragraph itself held renderable text, so it survives even though
    // the branch body is suppressed.
    let template = document(&runs_paragraph(&[
        "start ",
        "+++IF isInactive+++",
        "hidden",
        "+++END-IF+++",
        " end",
    ]));
    let result = render(&template, &scalar_data());
    let text = rendered_text(&result);
    assert!(text.contains("start"));
    assert!(text.contains("end"));
    assert!(!text.contains("hidden"));
}

#[test]
fn test_sequential_ifs_match_their_own_ends() {
    let body = format!(
        "{}{}",
        if_paragraph("isActive", "first"),
        if_paragraph("isActive", "second"),
    );
    let result = render(&document(&body), &scalar_data());
    let text = rendered_text(&result);
    assert_in_order(&text, &["first", "second"]);
    assert!(result.errors.is_empty());
}

#[test]
fn test_nested_if_inside_if() {
    let template = document_of(&[
        "+++IF isActive+++",
        "outer",
        "+++IF name == 'John'+++",
        "inner",
        "+++END-IF+++",
        "+++END-IF+++",
    ]);
    let result = render(&template, &scalar_data());
    let text = rendered_text(&result);
    assert_in_order(&text, &["outer", "inner"]);
    assert!(result.errors.is_empty());
}
