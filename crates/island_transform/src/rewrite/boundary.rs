//! Client boundary rewriting.
//!
//! An element carrying the client-only marker is wrapped in an
//! `IslandBoundary` addressed by a stable identifier, so that it can be
//! hydrated independently of the server-rendered island around it.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use super::escape::{quote_attribute_value, to_base32_like};
use super::{RewriteError, attribute_removal, is_conditional, runtime, slice_without};
use crate::markup::Element;
use crate::scanner::is_client_marker;

/// Deterministic identifier for the boundary opened at `open_start..open_end`
/// (full-file offsets) of the file `id`.
pub fn stable_id(id: &str, open_start: u32, open_end: u32) -> String {
    let mut hasher = FxHasher::default();
    id.hash(&mut hasher);
    open_start.hash(&mut hasher);
    open_end.hash(&mut hasher);
    to_base32_like(hasher.finish())
}

/// Replacement markup for one marked element.
pub(super) struct BoundaryRewrite {
    pub text: String,
    /// The wrapper's `to` value.
    pub target: String,
}

/// Build the `IslandBoundary` markup replacing `el`.
///
/// `template` is the template text the element's spans point into and
/// `base` is the template's offset in the file `id`.
pub(super) fn rewrite_boundary(
    template: &str,
    el: &Element,
    id: &str,
    base: u32,
    root_dir: Option<&str>,
) -> Result<BoundaryRewrite, RewriteError> {
    let marker_value = marker_value(el)?;
    let target = format!(
        "{}-{}",
        el.tag_name,
        stable_id(id, base + el.open_span.start, base + el.open_span.end)
    );

    let mut text = format!("<{}", runtime::ISLAND_BOUNDARY);
    for attr in el.attributes.iter().filter(|attr| is_conditional(&attr.name)) {
        text.push(' ');
        text.push_str(attr.span.source_text(template));
    }
    text.push_str(" to=");
    text.push_str(&quote_attribute_value(&target));
    if let Some(root_dir) = root_dir {
        text.push_str(" root-dir=");
        text.push_str(&quote_attribute_value(root_dir));
    }
    text.push_str(" :island-client=");
    text.push_str(&quote_attribute_value(&marker_value));
    text.push('>');

    // Every marker goes, nested ones included; lifted conditionals only on the element itself
    let removals = std::iter::once(el)
        .chain(el.descendants())
        .flat_map(|node| &node.attributes)
        .filter(|attr| is_client_marker(&attr.name))
        .chain(el.attributes.iter().filter(|attr| is_conditional(&attr.name)))
        .map(|attr| attribute_removal(template, attr))
        .collect();
    text.push_str(&slice_without(template, el.span, removals));

    text.push_str("</");
    text.push_str(runtime::ISLAND_BOUNDARY);
    text.push('>');

    Ok(BoundaryRewrite { text, target })
}

/// The expression forwarded as `:island-client`.
///
/// A valueless plain marker means `true`; a plain value and a bound
/// expression are forwarded as written.
fn marker_value(el: &Element) -> Result<String, RewriteError> {
    let Some(marker) = el.attributes.iter().find(|attr| is_client_marker(&attr.name)) else {
        return Ok("true".to_string());
    };
    let value = marker.value_or_empty().trim();
    if !value.is_empty() {
        return Ok(value.to_string());
    }
    if marker.name.starts_with(':') || marker.name.starts_with("v-bind:") {
        return Err(RewriteError::EmptyBinding {
            name: marker.name.clone(),
        });
    }
    Ok("true".to_string())
}
