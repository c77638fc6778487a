//! Prop-binding serialization.
//!
//! Turns the attributes of a rewritten element into an expression that
//! evaluates, at render time, to an array of prop objects: one object for a
//! plain element, one object per iteration for an element carrying `v-for`.
//! Expressions are copied verbatim; nothing here evaluates or validates them.

use super::RewriteError;
use super::escape::{js_string_literal, object_key};
use super::runtime;
use crate::markup::Attribute;

/// A single serialized prop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingValue {
    /// `:key="expr"`, copied as raw expression text.
    Expression(String),
    /// `key="text"`, emitted as a string literal.
    Literal(String),
}

/// The name of a serialized prop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropKey {
    /// `foo`, `:foo`, `v-bind:foo`.
    Named(String),
    /// `:[expr]` / `v-bind:[expr]`, resolved at render time.
    Computed(String),
}

impl PropKey {
    fn to_object_key(&self) -> String {
        match self {
            Self::Named(name) => object_key(name),
            Self::Computed(expr) => format!("[{expr}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub key: PropKey,
    pub value: BindingValue,
}

/// A parsed `v-for` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repetition {
    /// The directive text as written, reused for the fallback wrapper.
    pub directive: String,
    /// The loop alias, e.g. `item` or `(item, index)`.
    pub alias: String,
    /// The iterated expression.
    pub iterable: String,
}

impl Repetition {
    /// Split `alias in iterable` (or `alias of iterable`).
    ///
    /// Returns `None` when the directive has no top-level `in`/`of` separator
    /// or either side is empty.
    pub fn parse(directive: &str) -> Option<Self> {
        let (alias, iterable) = split_repetition(directive)?;
        let alias = alias.trim();
        let iterable = iterable.trim();
        if alias.is_empty() || iterable.is_empty() {
            return None;
        }
        Some(Self {
            directive: directive.to_string(),
            alias: alias.to_string(),
            iterable: iterable.to_string(),
        })
    }

    /// The alias as an arrow-function parameter list.
    fn parameters(&self) -> String {
        if self.alias.starts_with('(') {
            self.alias.clone()
        } else {
            format!("({})", self.alias)
        }
    }
}

/// Find the top-level `in` or `of` keyword of a `v-for` directive.
fn split_repetition(directive: &str) -> Option<(&str, &str)> {
    let bytes = directive.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => continue,
            None => match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                _ if depth == 0 && b.is_ascii_whitespace() => {
                    let rest = &directive[i + 1..];
                    let keyword_follows = (rest.starts_with("in") || rest.starts_with("of"))
                        && rest[2..]
                            .chars()
                            .next()
                            .is_some_and(|c| c.is_ascii_whitespace());
                    if keyword_follows {
                        return Some((&directive[..i], &rest[2..]));
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// The attributes of one element, split into props, an optional spread
/// source and an optional repetition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingSpec {
    pub bindings: Vec<Binding>,
    pub spread: Option<String>,
    pub repetition: Option<Repetition>,
}

impl BindingSpec {
    /// Collect props from element attributes.
    ///
    /// Directives other than `v-bind` and `v-for` (event listeners, `v-if`,
    /// `v-show`, slot shorthands) are not props and are skipped, as are list
    /// keys. Callers remove attributes they handle themselves beforehand.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed `v-for` and for bound attributes
    /// without an expression.
    pub fn from_attributes<'a>(
        attributes: impl IntoIterator<Item = &'a Attribute>,
    ) -> Result<Self, RewriteError> {
        let mut spec = Self::default();
        for attr in attributes {
            let name = attr.name.as_str();
            if is_list_key(name) {
                continue;
            }
            if name == "v-for" {
                let value = attr.value_or_empty();
                spec.repetition = Some(Repetition::parse(value).ok_or_else(|| {
                    RewriteError::InvalidRepetition {
                        directive: value.to_string(),
                    }
                })?);
                continue;
            }
            if name == "v-bind" {
                spec.spread = Some(bound_expression(attr)?.to_string());
                continue;
            }
            if let Some(key) = bound_key(name) {
                spec.bindings.push(Binding {
                    key,
                    value: BindingValue::Expression(bound_expression(attr)?.to_string()),
                });
                continue;
            }
            if is_directive(name) {
                continue;
            }
            spec.bindings.push(Binding {
                key: PropKey::Named(name.to_string()),
                value: BindingValue::Literal(attr.value_or_empty().to_string()),
            });
        }
        Ok(spec)
    }

    /// Serialize into a prop-array expression.
    pub fn serialize(&self) -> String {
        if self.bindings.is_empty() && self.spread.is_none() && self.repetition.is_none() {
            return "undefined".to_string();
        }

        let object = self.object_literal();
        let data = match &self.spread {
            Some(spread) => format!("{}({spread}, {object})", runtime::MERGE_PROPS),
            None => object,
        };

        match &self.repetition {
            None => format!("[{data}]"),
            Some(repetition) => format!(
                "{}({}).map({} => ({data}))",
                runtime::ITER_TO_ARRAY,
                repetition.iterable,
                repetition.parameters()
            ),
        }
    }

    fn object_literal(&self) -> String {
        if self.bindings.is_empty() {
            return "{}".to_string();
        }
        let entries = self
            .bindings
            .iter()
            .map(|binding| {
                let value = match &binding.value {
                    BindingValue::Expression(expr) => expr.clone(),
                    BindingValue::Literal(text) => js_string_literal(text),
                };
                format!("{}: {value}", binding.key.to_object_key())
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{ {entries} }}")
    }
}

/// `key`, `:key` and `v-bind:key`.
pub fn is_list_key(name: &str) -> bool {
    matches!(name, "key" | ":key" | "v-bind:key")
}

/// The prop name of a `:foo` / `v-bind:foo` attribute, without modifiers.
///
/// A dynamic argument (`:[expr]`) gives a computed key.
pub fn bound_key(name: &str) -> Option<PropKey> {
    let argument = name
        .strip_prefix(':')
        .or_else(|| name.strip_prefix("v-bind:"))?;
    if let Some(dynamic) = argument.strip_prefix('[') {
        let expr = dynamic[..dynamic.find(']')?].trim();
        return (!expr.is_empty()).then(|| PropKey::Computed(expr.to_string()));
    }
    let key = argument.split('.').next().unwrap_or(argument);
    (!key.is_empty()).then(|| PropKey::Named(key.to_string()))
}

fn is_directive(name: &str) -> bool {
    name.starts_with("v-") || name.starts_with('@') || name.starts_with('#')
}

fn bound_expression(attr: &Attribute) -> Result<&str, RewriteError> {
    let expr = attr.value_or_empty().trim();
    if expr.is_empty() {
        return Err(RewriteError::EmptyBinding {
            name: attr.name.clone(),
        });
    }
    Ok(expr)
}
