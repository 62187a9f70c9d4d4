//! FOR loop expansion.

use super::helpers::*;
use crate::node::tags;
use crate::render::value::Value;

#[test]
fn test_for_loop_in_one_paragraph() {
    let template = document(&runs_paragraph(&[
        "+++FOR item IN items+++",
        "Name: +++INS $item.name+++ Value: +++INS $item.value+++",
        "+++END-FOR item+++",
    ]));
    let result = render(&template, &items_data());
    let text = rendered_text(&result);
    assert_in_order(
        &text,
        &["Item 1", "100", "Item 2", "200", "Item 3", "300"],
    );
    assert!(result.errors.is_empty());
}

#[test]
fn test_for_loop_over_paragraphs() {
    let template = document_of(&[
        "+++FOR item IN items+++",
        "row: +++INS $item.name+++",
        "+++END-FOR item+++",
    ]);
    let result = render(&template, &items_data());
    let text = rendered_text(&result);
    assert_in_order(&text, &["row: Item 1", "row: Item 2", "row: Item 3"]);
    // The paragraphs holding only the FOR/END-FOR commands collapse.
    assert!(!text.contains("FOR"));
}

#[test]
fn test_nested_for_loops() {
    let template = document(&runs_paragraph(&[
        "+++FOR category IN categories+++",
        "Category: +++INS $category.name+++",
        "+++FOR subitem IN $category.subitems+++",
        "  - +++INS $subitem+++",
        "+++END-FOR subitem+++",
        "+++END-FOR category+++",
    ]));
    let result = render(&template, &categories_data());
    let text = rendered_text(&result);
    assert_in_order(
        &text,
        &[
            "Category 1",
            "Sub 1.1",
            "Sub 1.2",
            "Category 2",
            "Sub 2.1",
            "Sub 2.2",
        ],
    );
    assert!(result.errors.is_empty());
}

#[test]
fn test_for_over_empty_list() {
    let mut data = items_data();
    data.insert("empty", Value::List(vec![]));
    let template = document_of(&[
        "before",
        "+++FOR item IN empty+++",
        "body: +++INS $item+++",
        "+++END-FOR item+++",
        "after",
    ]);
    let result = render(&template, &data);
    let text = rendered_text(&result);
    assert_in_order(&text, &["before", "after"]);
    assert!(!text.contains("body"));
    assert!(result.errors.is_empty());
}

#[test]
fn test_end_for_without_variable_name() {
    let template = document_of(&[
        "+++FOR item IN items+++",
        "+++INS $item.name+++",
        "+++END-FOR+++",
    ]);
    let result = render(&template, &items_data());
    assert_in_order(&rendered_text(&result), &["Item 1", "Item 2", "Item 3"]);
    assert!(result.errors.is_empty());
}

#[test]
fn test_loop_variable_shadowing_between_iterations() {
    // $item always refers to the current iteration's element.
    let template = document_of(&[
        "+++FOR item IN items+++",
        "+++IF $item.value >= 200+++",
        "big: +++INS $item.name+++",
        "+++END-IF+++",
        "+++END-FOR item+++",
    ]);
    let result = render(&template, &items_data());
    let text = rendered_text(&result);
    assert!(!text.contains("Item 1"));
    assert_in_order(&text, &["big: Item 2", "big: Item 3"]);
    assert!(result.errors.is_empty());
}

#[test]
fn test_table_row_loop() {
    let cell = |content: &str| {
        format!("<w:tc><w:p><w:r><w:t xml:space=\"preserve\">{content}</w:t></w:r></w:p></w:tc>")
    };
    let body = format!(
        "<w:tbl><w:tr>{}</w:tr><w:tr>{}{}</w:tr><w:tr>{}</w:tr></w:tbl>",
        cell("+++FOR item IN items+++"),
        cell("+++INS $item.name+++"),
        cell("+++INS $item.value+++"),
        cell("+++END-FOR item+++"),
    );
    let template = document(&body);
    let result = render(&template, &items_data());
    let text = rendered_text(&result);
    assert_in_order(
        &text,
        &["Item 1", "100", "Item 2", "200", "Item 3", "300"],
    );
}

#[test]
fn test_empty_loop_leaves_no_empty_cell_without_paragraph() {
    // A cell whose paragraphs all collapsed still satisfies the invariant
    // that no w:tc ends the walk without a block child.
    let mut data = items_data();
    data.insert("empty", Value::List(vec![]));
    let body = "<w:tbl><w:tr><w:tc>\
                <w:p><w:r><w:t>keep +++FOR item IN empty+++</w:t></w:r></w:p>\
                <w:p><w:r><w:t>x +++INS $item+++</w:t></w:r></w:p>\
                <w:p><w:r><w:t>+++END-FOR item+++</w:t></w:r></w:p>\
                </w:tc></w:tr></w:tbl>";
    let template = document(body);
    let result = render(&template, &data);

    // Every w:tc in the output holds at least one w:p or w:altChunk.
    let tree = &result.tree;
    for id in tree.descendants(result.root) {
        if tree.tag(id) == Some(tags::TC) {
            let has_block = tree
                .children(id)
                .iter()
                .any(|&c| matches!(tree.tag(c), Some(tags::P) | Some(tags::ALTCHUNK)));
            assert!(has_block, "w:tc without block child in output");
        }
    }
}
