//! Slot rewriting.
//!
//! A `<slot>` becomes an `IslandSlot` wrapper whose content can be filled
//! remotely at render time. The slot's own children are kept as the
//! wrapper's `#fallback` section.

use oxc_span::Span;

use super::bindings::{BindingSpec, is_list_key};
use super::escape::quote_attribute_value;
use super::{RewriteError, attribute_removal, is_conditional, runtime, slice_without};
use crate::markup::{Attribute, Element};

/// A slot name: static (`name="header"`) or dynamic (`:name="expr"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SlotName {
    Static(String),
    /// The raw expression text.
    Dynamic(String),
}

impl SlotName {
    fn from_element(el: &Element) -> Self {
        for attr in &el.attributes {
            match attr.name.as_str() {
                "name" => return Self::Static(attr.value_or_empty().to_string()),
                ":name" | "v-bind:name" => {
                    return Self::Dynamic(attr.value_or_empty().trim().to_string());
                }
                _ => {}
            }
        }
        Self::Static("default".to_string())
    }

    /// The name as reported in the transform result.
    pub(super) fn as_str(&self) -> &str {
        match self {
            Self::Static(name) | Self::Dynamic(name) => name,
        }
    }

    fn to_attribute(&self) -> String {
        match self {
            Self::Static(name) => format!("name={}", quote_attribute_value(name)),
            Self::Dynamic(expr) => format!(":name={}", quote_attribute_value(expr)),
        }
    }
}

fn is_slot_name(attr: &Attribute) -> bool {
    matches!(attr.name.as_str(), "name" | ":name" | "v-bind:name")
}

/// Replacement markup for one slot element.
pub(super) struct SlotRewrite {
    pub text: String,
    pub name: SlotName,
}

/// Build the `IslandSlot` markup replacing `el`.
///
/// `template` is the template text the element's spans point into.
pub(super) fn rewrite_slot(template: &str, el: &Element) -> Result<SlotRewrite, RewriteError> {
    let name = SlotName::from_element(el);
    if let SlotName::Dynamic(expr) = &name
        && expr.is_empty()
    {
        return Err(RewriteError::EmptyBinding {
            name: ":name".to_string(),
        });
    }

    let spec = BindingSpec::from_attributes(
        el.attributes
            .iter()
            .filter(|attr| !is_slot_name(attr) && !is_conditional(&attr.name)),
    )?;

    let mut text = format!("<{}", runtime::ISLAND_SLOT);
    for attr in el.attributes.iter().filter(|attr| is_conditional(&attr.name)) {
        text.push(' ');
        text.push_str(attr.span.source_text(template));
    }
    text.push(' ');
    text.push_str(&name.to_attribute());
    text.push_str(" :props=");
    text.push_str(&quote_attribute_value(&spec.serialize()));
    text.push('>');

    if let Some(inner) = el.inner_span().filter(|_| !el.children.is_empty()) {
        let fallback = fallback_markup(template, el, inner);
        text.push_str("<template #fallback>");
        match &spec.repetition {
            Some(repetition) => {
                text.push_str("<template v-for=");
                text.push_str(&quote_attribute_value(&repetition.directive));
                text.push('>');
                text.push_str(&fallback);
                text.push_str("</template>");
            }
            None => text.push_str(&fallback),
        }
        text.push_str("</template>");
    }

    text.push_str("</");
    text.push_str(runtime::ISLAND_SLOT);
    text.push('>');

    Ok(SlotRewrite { text, name })
}

/// The slot's children as written, minus every list key attribute.
fn fallback_markup(template: &str, el: &Element, inner: Span) -> String {
    let removals = el
        .descendants()
        .flat_map(|child| &child.attributes)
        .filter(|attr| is_list_key(&attr.name))
        .map(|attr| attribute_removal(template, attr))
        .collect();
    slice_without(template, inner, removals)
}
