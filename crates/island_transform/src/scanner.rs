//! Template scanner.
//!
//! Pre-analyzes a parsed template in a single pass to find the elements the
//! rewriter has to touch. This separates the analysis phase from the edit
//! phase: the rewriter consumes the targets without walking the tree again.

use oxc_span::Span;

use crate::markup::{Attribute, Element, MarkupNode};
use crate::options::TransformOptions;

/// Plain form of the client-only marker attribute.
pub const CLIENT_MARKER: &str = "island-client";

/// All spellings of the client-only marker (plain and bound).
const CLIENT_MARKER_FORMS: [&str; 3] = [CLIENT_MARKER, ":island-client", "v-bind:island-client"];

/// Whether `name` is one of the client-only marker spellings.
pub fn is_client_marker(name: &str) -> bool {
    CLIENT_MARKER_FORMS.contains(&name)
}

/// Cheap text pre-check run before parsing.
///
/// Returns `false` only when `template` can contain neither a `<slot>` tag
/// nor a client marker, in which case the whole transform can be skipped.
pub fn may_contain_rewrites(template: &str) -> bool {
    template.contains(CLIENT_MARKER) || contains_slot_tag(template)
}

fn contains_slot_tag(template: &str) -> bool {
    template.match_indices("<slot").any(|(i, needle)| {
        template[i + needle.len()..]
            .chars()
            .next()
            .is_none_or(|c| c.is_ascii_whitespace() || c == '>' || c == '/')
    })
}

/// Classification of a template element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementClass {
    /// A `<slot>` element.
    Slot,
    /// An element carrying the client-only marker.
    ClientBoundary,
    Plain,
}

/// Classify an element once, before any rewrite is dispatched.
pub fn classify(el: &Element) -> ElementClass {
    if el.tag_name == "slot" {
        ElementClass::Slot
    } else if client_marker(el).is_some() {
        ElementClass::ClientBoundary
    } else {
        ElementClass::Plain
    }
}

/// The first client marker attribute of `el`, in any spelling.
pub fn client_marker(el: &Element) -> Option<&Attribute> {
    el.attributes
        .iter()
        .find(|attr| is_client_marker(&attr.name))
}

/// What happens to elements carrying the client-only marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Rewrite them into boundary wrappers.
    Rewrite,
    /// Boundaries were requested but the output format cannot address them:
    /// leave the elements as they are and warn.
    Unsupported,
    /// Boundaries are disabled; the marker is ignored.
    Disabled,
}

impl BoundaryPolicy {
    pub fn from_options(options: &TransformOptions) -> Self {
        if !options.allow_client_boundaries {
            Self::Disabled
        } else if options.bundler.supports_client_boundaries() {
            Self::Rewrite
        } else {
            Self::Unsupported
        }
    }
}

/// An element the rewriter will replace.
#[derive(Debug, Clone, Copy)]
pub struct RewriteTarget<'n> {
    pub class: ElementClass,
    pub element: &'n Element,
}

/// Result of scanning a template.
#[derive(Debug, Default)]
pub struct ScanResult<'n> {
    /// Outermost rewritable elements, in document order.
    pub targets: Vec<RewriteTarget<'n>>,
    /// Opening tag of the first marked element that could not be rewritten
    /// because the output format does not support boundaries.
    pub unsupported_boundary: Option<Span>,
}

/// Walks a template depth-first, pre-order, collecting rewrite targets.
///
/// A rewritten element is replaced as a whole, so the walk does not descend
/// into it: nested slots and boundaries are carried over verbatim as part of
/// the outer element's source. Marked elements that are not rewritten are
/// descended into like any other element.
pub struct IslandScanner<'n> {
    policy: BoundaryPolicy,
    result: ScanResult<'n>,
}

impl<'n> IslandScanner<'n> {
    pub fn new(policy: BoundaryPolicy) -> Self {
        Self {
            policy,
            result: ScanResult::default(),
        }
    }

    /// Run the scanner over the template's top-level nodes.
    pub fn scan(mut self, nodes: &'n [MarkupNode]) -> ScanResult<'n> {
        self.visit_nodes(nodes);
        self.result
    }

    fn visit_nodes(&mut self, nodes: &'n [MarkupNode]) {
        for node in nodes {
            if let MarkupNode::Element(el) = node {
                self.visit_element(el);
            }
        }
    }

    fn visit_element(&mut self, el: &'n Element) {
        let class = classify(el);
        let rewrite = match class {
            ElementClass::Slot => true,
            ElementClass::ClientBoundary => match self.policy {
                BoundaryPolicy::Rewrite => true,
                BoundaryPolicy::Unsupported => {
                    if self.result.unsupported_boundary.is_none() {
                        self.result.unsupported_boundary = Some(el.open_span);
                    }
                    false
                }
                BoundaryPolicy::Disabled => false,
            },
            ElementClass::Plain => false,
        };

        if rewrite {
            self.result.targets.push(RewriteTarget { class, element: el });
        } else {
            self.visit_nodes(&el.children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_template;
    use crate::options::Bundler;

    fn target_tags(source: &str, policy: BoundaryPolicy) -> Vec<(ElementClass, String)> {
        let nodes = parse_template(source).unwrap();
        IslandScanner::new(policy)
            .scan(&nodes)
            .targets
            .iter()
            .map(|t| (t.class, t.element.tag_name.clone()))
            .collect()
    }

    #[test]
    fn test_pre_check() {
        assert!(may_contain_rewrites("<div><slot /></div>"));
        assert!(may_contain_rewrites("<slot>"));
        assert!(may_contain_rewrites("<button island-client>x</button>"));
        assert!(may_contain_rewrites("<b :island-client=\"true\" />"));
        assert!(!may_contain_rewrites("<div><slots-list /></div>"));
        assert!(!may_contain_rewrites("<p>plain</p>"));
    }

    #[test]
    fn test_classify() {
        let nodes = parse_template(
            "<slot /><button island-client /><b v-bind:island-client=\"x\" /><p />",
        )
        .unwrap();
        let classes: Vec<_> = nodes
            .iter()
            .filter_map(MarkupNode::as_element)
            .map(classify)
            .collect();
        assert_eq!(
            classes,
            vec![
                ElementClass::Slot,
                ElementClass::ClientBoundary,
                ElementClass::ClientBoundary,
                ElementClass::Plain
            ]
        );
    }

    #[test]
    fn test_outermost_slot_wins() {
        let targets = target_tags(
            "<div><slot name=\"a\"><slot name=\"b\" /><i island-client /></slot></div>",
            BoundaryPolicy::Rewrite,
        );
        assert_eq!(targets, vec![(ElementClass::Slot, "slot".to_string())]);
    }

    #[test]
    fn test_slot_inside_boundary_is_not_a_target() {
        let targets = target_tags(
            "<section island-client><slot /></section><slot name=\"x\" />",
            BoundaryPolicy::Rewrite,
        );
        assert_eq!(
            targets,
            vec![
                (ElementClass::ClientBoundary, "section".to_string()),
                (ElementClass::Slot, "slot".to_string())
            ]
        );
    }

    #[test]
    fn test_disabled_boundaries_are_descended_into() {
        let targets = target_tags(
            "<section island-client><slot /></section>",
            BoundaryPolicy::Disabled,
        );
        assert_eq!(targets, vec![(ElementClass::Slot, "slot".to_string())]);
    }

    #[test]
    fn test_unsupported_boundary_is_recorded_once() {
        let source = "<a island-client /><b island-client />";
        let nodes = parse_template(source).unwrap();
        let result = IslandScanner::new(BoundaryPolicy::Unsupported).scan(&nodes);
        assert!(result.targets.is_empty());
        assert_eq!(
            result.unsupported_boundary.unwrap().source_text(source),
            "<a island-client />"
        );
    }

    #[test]
    fn test_policy_from_options() {
        let options = TransformOptions::new();
        assert_eq!(BoundaryPolicy::from_options(&options), BoundaryPolicy::Disabled);
        let options = options.with_client_boundaries(true);
        assert_eq!(BoundaryPolicy::from_options(&options), BoundaryPolicy::Rewrite);
        let options = options.with_bundler(Bundler::Webpack);
        assert_eq!(
            BoundaryPolicy::from_options(&options),
            BoundaryPolicy::Unsupported
        );
    }
}
