//! Island transform snapshot tests.
//!
//! Uses `insta::glob!` to discover `.vue` fixture files and compare the
//! transformed output against co-located `.snap` snapshot files.

use std::fmt::Write as _;
use std::fs;

use island_transform::{SourcemapOption, TransformOptions, transform_component};

fn transform_fixture(name: &str, source: &str) -> String {
    let options = TransformOptions::new()
        .with_client_boundaries(true)
        .with_sourcemap(SourcemapOption::None);
    let id = format!("/app/components/{name}.vue");
    let result = transform_component(&id, source, &options);

    let mut output = result
        .code
        .unwrap_or_else(|| format!("<!-- unchanged -->\n{source}"));
    for diagnostic in &result.diagnostics {
        let _ = write!(output, "\n<!-- {:?}: {} -->", diagnostic.severity, diagnostic.text);
    }
    output
}

#[test]
fn snapshots() {
    insta::glob!("fixtures/*.vue", |path| {
        let source_text = fs::read_to_string(path).unwrap();
        let name = path.file_stem().unwrap().to_str().unwrap();
        let output = transform_fixture(name, &source_text);

        insta::with_settings!({
            snapshot_path => path.parent().unwrap(),
            prepend_module_to_snapshot => false,
            snapshot_suffix => "",
            omit_expression => true,
            filters => vec![(r#"to="([A-Za-z0-9_-]+?)-[a-z2-7]{8}""#, r#"to="${1}-[id]""#)],
        }, {
            insta::assert_snapshot!(name, output);
        });
    });
}
