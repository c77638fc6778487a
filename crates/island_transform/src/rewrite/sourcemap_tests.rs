// --- Sourcemap tests ---

// Test sources are small; line/column counts never exceed u32.
#![allow(clippy::cast_possible_truncation)]

use oxc_sourcemap::SourceMap;

use super::tests::transform_with_options;
use crate::{SourcemapOption, TransformOptions, TransformResult};

const SOURCE: &str = "<script setup>\nconst n = 1\n</script>\n<template>\n  <h1>Title</h1>\n  <slot name=\"body\">fallback</slot>\n  <p>after</p>\n</template>\n";

fn transform_with_sourcemap(source: &str, sourcemap: SourcemapOption) -> TransformResult {
    transform_with_options(source, TransformOptions::new().with_sourcemap(sourcemap))
}

/// Find the (line, column) of the first occurrence of `needle`, UTF-16 columns.
fn position_of(text: &str, needle: &str) -> (u32, u32) {
    let offset = text.find(needle).unwrap();
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = text[line_start..offset].encode_utf16().count() as u32;
    (line, column)
}

/// The original (line, column) the token at exactly `generated` maps to.
fn original_position(map: &SourceMap, generated: (u32, u32)) -> Option<(u32, u32)> {
    map.get_tokens()
        .find(|t| (t.get_dst_line(), t.get_dst_col()) == generated)
        .map(|t| (t.get_src_line(), t.get_src_col()))
}

#[test]
fn test_sourcemap_external_produces_json() {
    let result = transform_with_sourcemap(SOURCE, SourcemapOption::External);
    let parsed: serde_json::Value =
        serde_json::from_str(&result.map).expect("sourcemap should be valid JSON");
    assert_eq!(parsed["version"], 3);
    let sources = parsed["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0], "/app/components/Card.vue");
    assert_eq!(parsed["sourcesContent"][0], SOURCE);
    assert!(!result.code.unwrap().contains("sourceMappingURL"));
}

#[test]
fn test_sourcemap_none_produces_empty_map() {
    let result = transform_with_sourcemap(SOURCE, SourcemapOption::None);
    assert!(result.is_changed());
    assert!(result.map.is_empty());
}

#[test]
fn test_sourcemap_inline_appends_data_url() {
    let result = transform_with_sourcemap(SOURCE, SourcemapOption::Inline);
    assert!(result.map.is_empty());
    assert!(
        result
            .code
            .unwrap()
            .contains("\n//# sourceMappingURL=data:application/json;")
    );
}

#[test]
fn test_sourcemap_both() {
    let result = transform_with_sourcemap(SOURCE, SourcemapOption::Both);
    assert!(!result.map.is_empty());
    assert!(result.code.unwrap().contains("//# sourceMappingURL=data:"));
}

#[test]
fn test_unchanged_file_has_no_map() {
    let source = "<template><p>plain</p></template>";
    let result = transform_with_sourcemap(source, SourcemapOption::Both);
    assert!(!result.is_changed());
    assert!(result.map.is_empty());
}

#[test]
fn test_unedited_lines_map_to_themselves() {
    let result = transform_with_sourcemap(SOURCE, SourcemapOption::External);
    let code = result.code.unwrap();
    let map = SourceMap::from_json_string(&result.map).unwrap();

    for needle in ["const n = 1", "  <h1>Title</h1>", "  <p>after</p>"] {
        let generated = position_of(&code, needle);
        let original = position_of(SOURCE, needle);
        assert_eq!(
            original_position(&map, generated),
            Some(original),
            "{needle:?} should map back to its original line"
        );
    }
}

#[test]
fn test_rewritten_slot_maps_to_original_slot() {
    let result = transform_with_sourcemap(SOURCE, SourcemapOption::External);
    let code = result.code.unwrap();
    let map = SourceMap::from_json_string(&result.map).unwrap();

    let generated = position_of(&code, "<IslandSlot");
    assert_eq!(
        original_position(&map, generated),
        Some(position_of(SOURCE, "<slot"))
    );
}

#[test]
fn test_lookup_after_rewrite_on_same_line() {
    let source = "<template><slot /><i>x</i></template>";
    let result = transform_with_sourcemap(source, SourcemapOption::External);
    let code = result.code.unwrap();
    let map = SourceMap::from_json_string(&result.map).unwrap();

    let (line, column) = position_of(&code, "<i>x</i>");
    let lookup = map.generate_lookup_table();
    let token = map.lookup_token(&lookup, line, column).unwrap();
    assert_eq!(
        (token.get_src_line(), token.get_src_col()),
        position_of(source, "<i>x</i>")
    );
}

#[test]
fn test_columns_after_multibyte_text() {
    let source = "<template>\n  <p>héllo 😀</p><slot />\n  <b>z</b>\n</template>";
    let result = transform_with_sourcemap(source, SourcemapOption::External);
    let code = result.code.unwrap();
    let map = SourceMap::from_json_string(&result.map).unwrap();

    let generated = position_of(&code, "<IslandSlot");
    assert_eq!(
        original_position(&map, generated),
        Some(position_of(source, "<slot />"))
    );
}
