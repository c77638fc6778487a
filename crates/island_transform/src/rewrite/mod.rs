//! Island rewriting of component templates.
//!
//! The driver locates the template block, parses it, lets the
//! [`IslandScanner`](crate::scanner::IslandScanner) pick the elements to
//! rewrite and records one overwrite per element in an [`EditBuffer`]. The
//! buffer is rendered once, at the end, together with the source map.

pub mod bindings;
mod boundary;
mod escape;
mod result;
mod slots;

#[cfg(test)]
mod sourcemap_tests;

use oxc_span::Span;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::diagnostic::Diagnostic;
use crate::edits::{EditBuffer, EditError};
use crate::markup::{Attribute, Element, parse_template};
use crate::options::{SourcemapOption, TransformOptions};
use crate::registry::{self, ComponentRegistry, RegistryError};
use crate::scanner::{self, BoundaryPolicy, ElementClass, IslandScanner, RewriteTarget};
use crate::sfc::{SfcBlocks, locate_blocks};

pub use boundary::stable_id;
pub use result::TransformResult;

/// Names referenced by the generated markup and imports.
mod runtime {
    pub const ISLAND_SLOT: &str = "IslandSlot";
    pub const ISLAND_BOUNDARY: &str = "IslandBoundary";
    pub const MERGE_PROPS: &str = "__mergeProps";
    pub const ITER_TO_ARRAY: &str = "__iterToArray";
}

/// Why a single element could not be rewritten. The element is left as is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("`v-for` value {directive:?} has no `in` or `of` clause")]
    InvalidRepetition { directive: String },

    #[error("bound attribute `{name}` has no expression")]
    EmptyBinding { name: String },

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// The island transform, bound to a component registry and build options.
///
/// Holds no per-file state, so one instance can serve any number of
/// concurrent transforms.
pub struct IslandTransform<R> {
    registry: R,
    options: TransformOptions,
}

impl<R: ComponentRegistry> IslandTransform<R> {
    pub fn new(registry: R, options: TransformOptions) -> Self {
        Self { registry, options }
    }

    /// Whether `id` should be transformed, against a fresh registry snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry snapshot is inconsistent.
    pub fn is_eligible(&self, id: &str) -> Result<bool, RegistryError> {
        registry::is_eligible(id, &self.registry)
    }

    /// Transform the component `id` with full source text `source`.
    ///
    /// Files that are not island components come back unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry snapshot is inconsistent.
    #[instrument(skip(self, source), fields(len = source.len()))]
    pub fn transform(&self, id: &str, source: &str) -> Result<TransformResult, RegistryError> {
        if !self.is_eligible(id)? {
            debug!("not an island component");
            return Ok(TransformResult::unchanged(Vec::new()));
        }
        Ok(transform_component(id, source, &self.options))
    }
}

/// Rewrite the slots and client boundaries of one component, without the
/// eligibility check.
pub fn transform_component(id: &str, source: &str, options: &TransformOptions) -> TransformResult {
    let blocks = locate_blocks(source);
    let Some(template) = blocks.template else {
        debug!("no template block");
        return TransformResult::unchanged(Vec::new());
    };

    let markup = template.content.source_text(source);
    if !scanner::may_contain_rewrites(markup) {
        debug!("template has no slot or client marker");
        return TransformResult::unchanged(Vec::new());
    }

    let nodes = match parse_template(markup) {
        Ok(nodes) => nodes,
        Err(error) => {
            warn!(%error, "template failed to parse, leaving file unchanged");
            return TransformResult::unchanged(vec![Diagnostic::from_oxc(
                source,
                template.content.start,
                &error,
            )]);
        }
    };

    let scan = IslandScanner::new(BoundaryPolicy::from_options(options)).scan(&nodes);

    let mut rewriter = Rewriter::new(id, source, template.content, options);
    for target in &scan.targets {
        rewriter.rewrite(target);
    }
    if let Some(open_span) = scan.unsupported_boundary {
        rewriter.warn_unsupported_boundary(open_span);
    }
    rewriter.finish(&blocks)
}

/// Per-file rewrite state.
struct Rewriter<'s, 'o> {
    id: &'s str,
    source: &'s str,
    /// The template markup; element spans point into it.
    markup: &'s str,
    /// Offset of `markup` in `source`.
    base: u32,
    options: &'o TransformOptions,
    edits: EditBuffer<'s>,
    diagnostics: Vec<Diagnostic>,
    slots: Vec<String>,
    client_boundaries: Vec<String>,
}

impl<'s, 'o> Rewriter<'s, 'o> {
    fn new(id: &'s str, source: &'s str, content: Span, options: &'o TransformOptions) -> Self {
        Self {
            id,
            source,
            markup: content.source_text(source),
            base: content.start,
            options,
            edits: EditBuffer::new(source),
            diagnostics: Vec::new(),
            slots: Vec::new(),
            client_boundaries: Vec::new(),
        }
    }

    fn rewrite(&mut self, target: &RewriteTarget<'_>) {
        let el = target.element;
        if let Err(error) = self.try_rewrite(target.class, el) {
            warn!(tag = %el.tag_name, %error, "element left unchanged");
            self.diagnostics.push(Diagnostic::warning(
                format!("Could not rewrite `<{}>`: {error}", el.tag_name),
                "The element is left unchanged.",
                self.base + el.open_span.start,
                self.base + el.open_span.end,
                self.source,
            ));
        }
    }

    fn try_rewrite(&mut self, class: ElementClass, el: &Element) -> Result<(), RewriteError> {
        let start = self.base + el.span.start;
        let end = self.base + el.span.end;
        match class {
            ElementClass::Slot => {
                let rewrite = slots::rewrite_slot(self.markup, el)?;
                self.edits.overwrite(start, end, rewrite.text)?;
                debug!(name = rewrite.name.as_str(), "rewrote slot");
                self.slots.push(rewrite.name.as_str().to_string());
            }
            ElementClass::ClientBoundary => {
                let rewrite = boundary::rewrite_boundary(
                    self.markup,
                    el,
                    self.id,
                    self.base,
                    self.options.boundary_root_dir(),
                )?;
                self.edits.overwrite(start, end, rewrite.text)?;
                debug!(to = %rewrite.target, "rewrote client boundary");
                self.client_boundaries.push(rewrite.target);
            }
            ElementClass::Plain => {}
        }
        Ok(())
    }

    fn warn_unsupported_boundary(&mut self, open_span: Span) {
        let bundler = self.options.bundler.as_str();
        warn!(bundler, "client boundaries are not supported by this bundler");
        self.diagnostics.push(Diagnostic::warning(
            format!(
                "Client boundaries are not supported when building with {bundler}; elements marked with `{}` are rendered on the server.",
                scanner::CLIENT_MARKER
            ),
            "Build with Vite to hydrate marked elements independently.",
            self.base + open_span.start,
            self.base + open_span.end,
            self.source,
        ));
    }

    fn finish(mut self, blocks: &SfcBlocks) -> TransformResult {
        let diagnostics = std::mem::take(&mut self.diagnostics);
        if !self.edits.has_changes() {
            return TransformResult::unchanged(diagnostics);
        }

        let imports = import_statements(self.options.get_runtime_url());
        match blocks.import_target() {
            Some(script) => {
                if let Err(error) = self.edits.append_right(script.open_tag.end, imports) {
                    // Spans come from the same source, so this is unreachable in practice
                    warn!(%error, "could not insert imports, leaving file unchanged");
                    return TransformResult::unchanged(diagnostics);
                }
            }
            None => self
                .edits
                .prepend(format!("<script setup>{imports}\n</script>\n")),
        }

        let (code, map) = self.render();
        debug!(
            slots = self.slots.len(),
            client_boundaries = self.client_boundaries.len(),
            "transformed"
        );
        TransformResult {
            code: Some(code),
            map,
            diagnostics,
            slots: self.slots,
            client_boundaries: self.client_boundaries,
        }
    }

    fn render(&self) -> (String, String) {
        if self.options.sourcemap == SourcemapOption::None {
            return (self.edits.render(), String::new());
        }

        let source_path = self.id.split_once('?').map_or(self.id, |(path, _)| path);
        let (mut code, sourcemap) = self.edits.render_with_sourcemap(source_path);
        let map = match self.options.sourcemap {
            SourcemapOption::Inline => {
                code.push_str("\n//# sourceMappingURL=");
                code.push_str(&sourcemap.to_data_url());
                String::new()
            }
            SourcemapOption::Both => {
                code.push_str("\n//# sourceMappingURL=");
                code.push_str(&sourcemap.to_data_url());
                sourcemap.to_json_string()
            }
            SourcemapOption::External | SourcemapOption::None => sourcemap.to_json_string(),
        };
        (code, map)
    }
}

/// The import block inserted into the component's script.
fn import_statements(runtime_url: &str) -> String {
    format!(
        "\nimport {{ mergeProps as {} }} from 'vue'\
         \nimport {{ iterToArray as {} }} from '{runtime_url}/utils'\
         \nimport {} from '{runtime_url}/island-boundary'\
         \nimport {} from '{runtime_url}/island-slot'",
        runtime::MERGE_PROPS,
        runtime::ITER_TO_ARRAY,
        runtime::ISLAND_BOUNDARY,
        runtime::ISLAND_SLOT,
    )
}

/// `v-if`, `v-else-if` and `v-else`, which move onto the wrapper.
fn is_conditional(name: &str) -> bool {
    matches!(name, "v-if" | "v-else-if" | "v-else")
}

/// The span removed when stripping `attr`: the attribute and the whitespace before it.
fn attribute_removal(markup: &str, attr: &Attribute) -> Span {
    let leading = markup[..attr.span.start as usize]
        .bytes()
        .rev()
        .take_while(u8::is_ascii_whitespace)
        .count();
    #[expect(clippy::cast_possible_truncation)]
    let start = attr.span.start - leading as u32;
    Span::new(start, attr.span.end)
}

/// Copy `range` of `markup`, leaving out the `removals`.
fn slice_without(markup: &str, range: Span, mut removals: Vec<Span>) -> String {
    removals.sort_unstable_by_key(|span| span.start);
    let mut out = String::with_capacity(range.size() as usize);
    let mut pos = range.start;
    for removal in removals {
        if removal.start < pos || removal.end > range.end {
            continue;
        }
        out.push_str(&markup[pos as usize..removal.start as usize]);
        pos = removal.end;
    }
    out.push_str(&markup[pos as usize..range.end as usize]);
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticSeverity;
    use crate::options::Bundler;
    use crate::registry::{ComponentDescriptor, ComponentMode};

    const ID: &str = "/app/components/Card.vue";

    pub(crate) fn transform_with_options(source: &str, options: TransformOptions) -> TransformResult {
        transform_component(ID, source, &options)
    }

    fn transform(source: &str) -> TransformResult {
        transform_with_options(source, TransformOptions::new().with_sourcemap(SourcemapOption::None))
    }

    fn boundaries() -> TransformOptions {
        TransformOptions::new()
            .with_client_boundaries(true)
            .with_sourcemap(SourcemapOption::None)
    }

    #[test]
    fn test_no_rewrites_is_unchanged() {
        let source = "<script setup>\nconst a = 1\n</script>\n<template>\n  <div>{{ a }}</div>\n</template>\n";
        let result = transform(source);
        assert!(!result.is_changed());
        assert!(result.map.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_no_template_is_unchanged() {
        assert!(!transform("<script setup>\nconst slot = '<slot />'\n</script>\n").is_changed());
    }

    #[test]
    fn test_slot_rewrite_with_existing_script() {
        let source = "<script setup>\nconst a = 1\n</script>\n<template>\n  <div><slot name=\"foo\" /></div>\n</template>\n";
        let result = transform(source);
        assert_eq!(
            result.code.as_deref(),
            Some(
                "<script setup>\
                 \nimport { mergeProps as __mergeProps } from 'vue'\
                 \nimport { iterToArray as __iterToArray } from '#islands/utils'\
                 \nimport IslandBoundary from '#islands/island-boundary'\
                 \nimport IslandSlot from '#islands/island-slot'\
                 \nconst a = 1\n</script>\n<template>\n  <div><IslandSlot name=\"foo\" :props=\"undefined\"></IslandSlot></div>\n</template>\n"
            )
        );
        assert_eq!(result.slots, vec!["foo"]);
    }

    #[test]
    fn test_script_is_synthesized() {
        let source = "<template><slot /></template>\n";
        let result = transform_with_options(
            source,
            TransformOptions::new()
                .with_runtime_url("~/islands")
                .with_sourcemap(SourcemapOption::None),
        );
        let code = result.code.unwrap();
        assert!(code.starts_with("<script setup>\nimport { mergeProps as __mergeProps } from 'vue'\n"));
        assert!(code.contains("import IslandSlot from '~/islands/island-slot'\n</script>\n<template><IslandSlot"));
    }

    #[test]
    fn test_imports_prefer_script_setup() {
        let source = "<script>\nexport default {}\n</script>\n<script setup lang=\"ts\">\n</script>\n<template><slot /></template>";
        let code = transform(source).code.unwrap();
        assert!(code.starts_with("<script>\nexport default {}\n</script>\n<script setup lang=\"ts\">\nimport {"));
    }

    #[test]
    fn test_unrelated_content_is_untouched() {
        let source = "<template>\n  <header>{{ title }}</header>\n  <slot />\n  <footer class=\"f\">x</footer>\n</template>\n<style scoped>\n.f { color: red }\n</style>\n";
        let code = transform(source).code.unwrap();
        let without_imports = code
            .split_once("</script>\n")
            .map(|(_, rest)| rest)
            .unwrap();
        assert_eq!(
            without_imports,
            source.replace(
                "<slot />",
                "<IslandSlot name=\"default\" :props=\"undefined\"></IslandSlot>"
            )
        );
    }

    #[test]
    fn test_client_boundary_rewrite() {
        let source = "<template>\n  <button island-client>+</button>\n</template>\n";
        let result = transform_with_options(source, boundaries());
        let code = result.code.unwrap();
        // The opening tag spans 13..35 of the file
        let target = format!("button-{}", stable_id(ID, 13, 35));
        assert_eq!(result.client_boundaries, vec![target.clone()]);
        assert!(code.contains(&format!(
            "<IslandBoundary to=\"{target}\" :island-client=\"true\"><button>+</button></IslandBoundary>"
        )));
    }

    #[test]
    fn test_boundaries_are_stable_across_runs() {
        let source = "<template><div island-client /><p island-client /></template>";
        let first = transform_with_options(source, boundaries());
        let second = transform_with_options(source, boundaries());
        assert_eq!(first.code, second.code);
        assert_eq!(first.client_boundaries.len(), 2);
        assert_ne!(first.client_boundaries[0], first.client_boundaries[1]);
    }

    #[test]
    fn test_root_dir_in_development() {
        let source = "<template><div island-client /></template>";
        let options = boundaries()
            .with_development_mode(true)
            .with_root_directory("/app");
        let code = transform_with_options(source, options).code.unwrap();
        assert!(code.contains(" root-dir=\"/app\" "));
    }

    #[test]
    fn test_boundaries_disabled_by_default() {
        let source = "<template><div island-client /></template>";
        let result = transform(source);
        assert!(!result.is_changed());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_unsupported_bundler_warns_once() {
        let source = "<template><div island-client /><p island-client /><slot /></template>";
        let result = transform_with_options(source, boundaries().with_bundler(Bundler::Webpack));
        let code = result.code.unwrap();
        assert!(code.contains("<div island-client /><p island-client /><IslandSlot"));
        assert_eq!(result.diagnostics.len(), 1);
        let warning = &result.diagnostics[0];
        assert_eq!(warning.severity, DiagnosticSeverity::Warning);
        assert!(warning.text.contains("webpack"));
        assert_eq!(warning.labels[0].start, 10);
    }

    #[test]
    fn test_unsupported_bundler_without_slots_is_unchanged() {
        let source = "<template><div island-client /></template>";
        let result = transform_with_options(source, boundaries().with_bundler(Bundler::Rspack));
        assert!(!result.is_changed());
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn test_parse_error_leaves_file_unchanged() {
        let source = "<template>\n  <div><slot></div>\n</template>\n";
        let result = transform(source);
        assert!(!result.is_changed());
        assert!(result.has_errors());
        // Labels are reported against the full file
        let label = &result.diagnostics[0].labels[0];
        assert_eq!(label.line, 2);
        assert!(label.start >= 13);
    }

    #[test]
    fn test_invalid_element_does_not_block_siblings() {
        let source = "<template><slot v-for=\"items\" /><slot name=\"ok\" /></template>";
        let result = transform(source);
        let code = result.code.unwrap();
        assert!(code.contains("<slot v-for=\"items\" /><IslandSlot name=\"ok\""));
        assert_eq!(result.slots, vec!["ok"]);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].severity, DiagnosticSeverity::Warning);
    }

    #[test]
    fn test_nested_rewritables_stay_verbatim() {
        let source = "<template><slot><p island-client><slot name=\"inner\" /></p></slot></template>";
        let result = transform_with_options(source, boundaries());
        let code = result.code.unwrap();
        assert!(code.contains(
            "<template #fallback><p island-client><slot name=\"inner\" /></p></template>"
        ));
        assert_eq!(result.slots, vec!["default"]);
        assert!(result.client_boundaries.is_empty());
    }

    #[test]
    fn test_transform_checks_eligibility() {
        let registry = vec![ComponentDescriptor::new(
            "Card",
            ID,
            ComponentMode::Server,
            false,
        )];
        let transform = IslandTransform::new(registry, TransformOptions::new());
        let source = "<template><slot /></template>";
        assert!(transform.transform(ID, source).unwrap().is_changed());
        assert!(!transform.transform("/app/components/Other.vue", source).unwrap().is_changed());
        assert!(!transform
            .transform(&format!("{ID}?vue&type=template"), source)
            .unwrap()
            .is_changed());
    }

    #[test]
    fn test_transform_propagates_registry_errors() {
        let registry = || -> Vec<ComponentDescriptor> {
            vec![
                ComponentDescriptor::new("Card", ID, ComponentMode::Server, false),
                ComponentDescriptor::new("Card", "/other/Card.vue", ComponentMode::Server, false),
            ]
        };
        let transform = IslandTransform::new(registry, TransformOptions::new());
        assert!(matches!(
            transform.transform(ID, "<template><slot /></template>"),
            Err(RegistryError::DuplicateDescriptor { .. })
        ));
    }

    #[test]
    fn test_concurrent_transforms() {
        let registry = vec![ComponentDescriptor::new("Card", ID, ComponentMode::All, true)];
        let transform = IslandTransform::new(registry, boundaries());
        let source = "<template><slot name=\"a\" /><b island-client /></template>";
        let expected = transform.transform(ID, source).unwrap().code;
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| transform.transform(ID, source).unwrap().code))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_slice_without() {
        let markup = "<a x=\"1\" key=\"k\">t</a>";
        let removal = Span::new(8, 16);
        assert_eq!(
            slice_without(markup, Span::new(0, 22), vec![removal]),
            "<a x=\"1\">t</a>"
        );
    }
}
