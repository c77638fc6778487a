//! Template markup parser.
//!
//! Parses the markup inside a component's `<template>` block into a tree of
//! located nodes. All spans are byte offsets relative to the parsed text; the
//! caller shifts them when the markup was cut out of a larger file.
//!
//! The parser is deliberately structural: it understands tags, attributes,
//! comments and `{{ }}` interpolations well enough to produce exact spans, and
//! leaves the meaning of directives and expressions to later passes.

use std::borrow::Cow;

use oxc_diagnostics::{LabeledSpan, OxcDiagnostic};
use oxc_span::Span;
use oxc_syntax::xml_entities::XML_ENTITIES;

/// A parsed attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The raw attribute name, including any directive prefix (`:foo`, `v-bind:foo`, `@click`).
    pub name: String,
    /// The value without quotes and with character references decoded, or
    /// `None` for a valueless attribute.
    pub value: Option<String>,
    /// From the first character of the name to the end of the value (closing quote included).
    pub span: Span,
}

impl Attribute {
    /// The value, or an empty string for a valueless attribute.
    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

/// An element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag_name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<MarkupNode>,
    /// The opening tag, `<` through `>`.
    pub open_span: Span,
    /// The closing tag, when the element has one.
    pub close_span: Option<Span>,
    /// The whole element including children and the closing tag.
    pub span: Span,
}

impl Element {
    /// The first attribute called `name`.
    ///
    /// Later duplicates are ignored, as in HTML.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// The markup between the opening and closing tags, or `None` for
    /// self-closing and void elements.
    pub fn inner_span(&self) -> Option<Span> {
        self.close_span
            .map(|close| Span::new(self.open_span.end, close.start))
    }

    /// Iterate over all descendant elements, depth-first pre-order.
    pub fn descendants(&self) -> impl Iterator<Item = &Element> {
        let mut stack: Vec<&Element> = self.child_elements().rev().collect();
        std::iter::from_fn(move || {
            let el = stack.pop()?;
            stack.extend(el.child_elements().rev());
            Some(el)
        })
    }

    fn child_elements(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.children.iter().filter_map(MarkupNode::as_element)
    }
}

/// A node of the template tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(Element),
    /// Text, including any `{{ }}` interpolations.
    Text(Span),
    /// Comments, doctypes and other `<!...>` markup.
    Comment(Span),
}

impl MarkupNode {
    pub fn span(&self) -> Span {
        match self {
            Self::Element(el) => el.span,
            Self::Text(span) | Self::Comment(span) => *span,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// Returns `true` for HTML void elements that never have a closing tag.
pub fn is_void_element(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose content is raw text rather than markup.
fn is_raw_text_element(name: &str) -> bool {
    matches!(name.to_ascii_lowercase().as_str(), "script" | "style")
}

/// Parse template markup into a list of top-level nodes.
///
/// # Errors
///
/// Returns a diagnostic labeled at the offending markup for unterminated
/// tags, comments, or attribute values, unclosed elements, and closing tags
/// that do not match the open element.
pub fn parse_template(source: &str) -> Result<Vec<MarkupNode>, OxcDiagnostic> {
    let mut parser = MarkupParser::new(source);
    parser.parse_children(None).map(|(nodes, _)| nodes)
}

struct MarkupParser<'a> {
    source: &'a str,
    pos: usize,
}

/// An element whose children are being parsed.
struct OpenElement<'s> {
    name: &'s str,
    open_span: Span,
}

impl<'a> MarkupParser<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek_byte(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    /// Parse nodes until the closing tag of `parent` (or the end of input at the top level).
    ///
    /// Returns the nodes and the span of the consumed closing tag.
    fn parse_children(
        &mut self,
        parent: Option<&OpenElement<'_>>,
    ) -> Result<(Vec<MarkupNode>, Option<Span>), OxcDiagnostic> {
        let mut nodes = Vec::new();

        loop {
            if self.at_end() {
                return match parent {
                    Some(open) => Err(unclosed_element(open)),
                    None => Ok((nodes, None)),
                };
            }

            let rest = self.rest();
            if rest.starts_with("<!--") {
                nodes.push(self.parse_comment()?);
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                nodes.push(self.parse_bogus_comment()?);
            } else if rest.starts_with("</") && self.is_tag_name_start(2) {
                let (name, close_span) = self.parse_closing_tag()?;
                return match parent {
                    Some(open) if open.name.eq_ignore_ascii_case(name) => Ok((nodes, Some(close_span))),
                    Some(open) => Err(mismatched_closing_tag(name, close_span, open)),
                    None => Err(unexpected_closing_tag(name, close_span)),
                };
            } else if rest.starts_with('<') && self.is_tag_name_start(1) {
                nodes.push(MarkupNode::Element(self.parse_element()?));
            } else {
                nodes.push(self.parse_text());
            }
        }
    }

    fn is_tag_name_start(&self, offset: usize) -> bool {
        self.source
            .as_bytes()
            .get(self.pos + offset)
            .is_some_and(u8::is_ascii_alphabetic)
    }

    fn parse_comment(&mut self) -> Result<MarkupNode, OxcDiagnostic> {
        let start = self.pos;
        let Some(end) = self.source[start + 4..].find("-->") else {
            return Err(OxcDiagnostic::error("Unterminated comment")
                .with_label(label("comment starts here", start, start + 4)));
        };
        self.pos = start + 4 + end + 3;
        Ok(MarkupNode::Comment(span(start, self.pos)))
    }

    fn parse_bogus_comment(&mut self) -> Result<MarkupNode, OxcDiagnostic> {
        let start = self.pos;
        let Some(end) = self.source[start..].find('>') else {
            return Err(OxcDiagnostic::error("Unterminated declaration")
                .with_label(label("declaration starts here", start, start + 2)));
        };
        self.pos = start + end + 1;
        Ok(MarkupNode::Comment(span(start, self.pos)))
    }

    /// Text runs until the next tag, comment or closing tag. `{{ }}` interpolations
    /// are skipped as a whole so that `<` inside an expression stays text.
    fn parse_text(&mut self) -> MarkupNode {
        let start = self.pos;
        let bytes = self.source.as_bytes();
        // Always consume at least one byte so a stray `<` becomes text
        let mut i = start + 1;
        if bytes[start] == b'{' && bytes.get(start + 1) == Some(&b'{') {
            i = self.skip_interpolation(start);
        }
        while i < bytes.len() {
            match bytes[i] {
                b'<' => {
                    let next = bytes.get(i + 1).copied();
                    let starts_markup = next.is_some_and(|b| {
                        b.is_ascii_alphabetic() || b == b'!' || b == b'?'
                    }) || (next == Some(b'/')
                        && bytes.get(i + 2).is_some_and(u8::is_ascii_alphabetic));
                    if starts_markup {
                        break;
                    }
                    i += 1;
                }
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    i = self.skip_interpolation(i);
                }
                _ => i += 1,
            }
        }
        self.pos = i;
        MarkupNode::Text(span(start, i))
    }

    /// Returns the offset just past the `}}` closing the interpolation at `start`,
    /// or the end of input when it is never closed.
    fn skip_interpolation(&self, start: usize) -> usize {
        self.source[start + 2..]
            .find("}}")
            .map_or(self.source.len(), |end| start + 2 + end + 2)
    }

    fn parse_tag_name(&mut self) -> &'a str {
        let start = self.pos;
        let end = self.source[start..]
            .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
            .map_or(self.source.len(), |i| start + i);
        self.pos = end;
        &self.source[start..end]
    }

    fn skip_whitespace(&mut self) {
        while self.peek_byte().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_closing_tag(&mut self) -> Result<(&'a str, Span), OxcDiagnostic> {
        let start = self.pos;
        self.pos += 2;
        let name = self.parse_tag_name();
        self.skip_whitespace();
        if self.peek_byte() != Some(b'>') {
            return Err(OxcDiagnostic::error(format!("Malformed closing tag `</{name}`"))
                .with_label(label("closing tag starts here", start, self.pos)));
        }
        self.pos += 1;
        Ok((name, span(start, self.pos)))
    }

    fn parse_element(&mut self) -> Result<Element, OxcDiagnostic> {
        let start = self.pos;
        self.pos += 1;
        let tag_name = self.parse_tag_name();
        let mut attributes = Vec::new();

        let self_closing = loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(OxcDiagnostic::error(format!("Unterminated tag `<{tag_name}`"))
                    .with_label(label("tag starts here", start, start + 1 + tag_name.len()))
                    .with_help("Add `>` to close the opening tag"));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            if rest.starts_with('/') {
                // A stray slash between attributes
                self.pos += 1;
                continue;
            }
            attributes.push(self.parse_attribute()?);
        };

        let open_span = span(start, self.pos);

        if self_closing || is_void_element(tag_name) {
            return Ok(Element {
                tag_name: tag_name.to_string(),
                attributes,
                children: Vec::new(),
                open_span,
                close_span: None,
                span: open_span,
            });
        }

        let open = OpenElement {
            name: tag_name,
            open_span,
        };

        let (children, close_span) = if is_raw_text_element(tag_name) {
            self.parse_raw_text(&open)?
        } else {
            self.parse_children(Some(&open))?
        };

        Ok(Element {
            tag_name: tag_name.to_string(),
            attributes,
            children,
            open_span,
            close_span,
            span: span(start, self.pos),
        })
    }

    fn parse_raw_text(
        &mut self,
        open: &OpenElement<'_>,
    ) -> Result<(Vec<MarkupNode>, Option<Span>), OxcDiagnostic> {
        let start = self.pos;
        let closing = format!("</{}", open.name);
        let haystack = self.source.as_bytes();
        let mut from = start;
        let close_start = loop {
            let found = (from..haystack.len().saturating_sub(closing.len() - 1)).find(|&i| {
                haystack[i..i + closing.len()].eq_ignore_ascii_case(closing.as_bytes())
            });
            let Some(candidate) = found else {
                return Err(unclosed_element(open));
            };
            // `</scripts>` shares the prefix but is text
            self.pos = candidate + 2;
            if self.parse_tag_name().eq_ignore_ascii_case(open.name) {
                break candidate;
            }
            from = candidate + 1;
        };
        self.pos = close_start;
        let (_, close_span) = self.parse_closing_tag()?;
        let children = if close_start > start {
            vec![MarkupNode::Text(span(start, close_start))]
        } else {
            Vec::new()
        };
        Ok((children, Some(close_span)))
    }

    fn parse_attribute(&mut self) -> Result<Attribute, OxcDiagnostic> {
        let start = self.pos;
        let bytes = self.source.as_bytes();
        let mut end = start;
        while end < bytes.len() {
            let b = bytes[end];
            if b.is_ascii_whitespace()
                || b == b'>'
                || (b == b'=' && end > start)
                || (b == b'/' && bytes.get(end + 1) == Some(&b'>'))
            {
                break;
            }
            end += 1;
        }
        let name = self.source[start..end].to_string();
        self.pos = end;

        // Look past whitespace for `=`
        let name_end = self.pos;
        self.skip_whitespace();
        if self.peek_byte() != Some(b'=') {
            self.pos = name_end;
            return Ok(Attribute {
                name,
                value: None,
                span: span(start, name_end),
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek_byte() {
            Some(quote @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                let Some(len) = self.source[value_start..].find(quote as char) else {
                    return Err(OxcDiagnostic::error(format!(
                        "Unterminated value for attribute `{name}`"
                    ))
                    .with_label(label("value starts here", self.pos, value_start)));
                };
                self.pos = value_start + len + 1;
                decode_entities(&self.source[value_start..value_start + len]).into_owned()
            }
            _ => {
                let value_start = self.pos;
                let len = self.source[value_start..]
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(self.source.len() - value_start);
                self.pos = value_start + len;
                decode_entities(&self.source[value_start..self.pos]).into_owned()
            }
        };

        Ok(Attribute {
            name,
            value: Some(value),
            span: span(start, self.pos),
        })
    }
}

/// Decode character references (`&quot;`, `&#34;`, `&#x22;`) in an attribute value.
///
/// Only terminated references are decoded; anything else after `&` is kept as written.
fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let reference = after
            .find(';')
            .filter(|&end| {
                end > 0
                    && after[..end]
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'#')
            })
            .and_then(|end| decode_entity(&after[..end]).map(|c| (end, c)));
        match reference {
            Some((end, c)) => {
                decoded.push(c);
                rest = &after[end + 1..];
            }
            None => {
                decoded.push('&');
                rest = after;
            }
        }
    }
    decoded.push_str(rest);
    Cow::Owned(decoded)
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = name.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    XML_ENTITIES.get(name).copied()
}

#[expect(clippy::cast_possible_truncation)]
fn span(start: usize, end: usize) -> Span {
    Span::new(start as u32, end as u32)
}

fn label(text: &str, start: usize, end: usize) -> LabeledSpan {
    LabeledSpan::new(Some(text.to_string()), start, end.saturating_sub(start))
}

fn labeled(text: &str, span: Span) -> LabeledSpan {
    label(text, span.start as usize, span.end as usize)
}

fn unclosed_element(open: &OpenElement<'_>) -> OxcDiagnostic {
    OxcDiagnostic::error(format!("Element `<{}>` is missing its end tag", open.name))
        .with_label(labeled("opened here", open.open_span))
        .with_help(format!("Add `</{}>` or make the element self-closing", open.name))
}

fn mismatched_closing_tag(name: &str, close_span: Span, open: &OpenElement<'_>) -> OxcDiagnostic {
    OxcDiagnostic::error(format!(
        "Closing tag `</{name}>` does not match the open element `<{}>`",
        open.name
    ))
    .with_labels([
        labeled("unexpected closing tag", close_span),
        labeled("open element", open.open_span),
    ])
}

fn unexpected_closing_tag(name: &str, close_span: Span) -> OxcDiagnostic {
    OxcDiagnostic::error(format!("Unexpected closing tag `</{name}>`"))
        .with_label(labeled("no element is open", close_span))
}
