//! Single-file component block location.
//!
//! Finds the top-level `<template>` block and `<script>` blocks of a
//! component without parsing their contents. Offsets are byte offsets into
//! the full component source.

use oxc_span::Span;

/// The top-level template block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateBlock {
    /// The whole block, from `<template` to the end of `</template>`.
    pub span: Span,
    /// The markup between the opening and closing tags.
    pub content: Span,
}

/// A top-level script block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptBlock {
    /// The opening `<script ...>` tag.
    pub open_tag: Span,
    /// Whether the block is `<script setup>`.
    pub setup: bool,
}

/// Top-level blocks of a component source.
#[derive(Debug, Default, Clone)]
pub struct SfcBlocks {
    pub template: Option<TemplateBlock>,
    pub scripts: Vec<ScriptBlock>,
}

impl SfcBlocks {
    /// The script block that should receive generated imports:
    /// `<script setup>` when present, otherwise the first script block.
    pub fn import_target(&self) -> Option<&ScriptBlock> {
        self.scripts
            .iter()
            .find(|script| script.setup)
            .or_else(|| self.scripts.first())
    }
}

/// Locate the top-level blocks of `source`.
pub fn locate_blocks(source: &str) -> SfcBlocks {
    let mut blocks = SfcBlocks::default();
    let mut pos = 0;

    while let Some(offset) = source[pos..].find('<') {
        let start = pos + offset;
        let rest = &source[start..];

        if rest.starts_with("<!--") {
            pos = rest.find("-->").map_or(source.len(), |end| start + end + 3);
            continue;
        }

        if let Some(name) = ["template", "script", "style"]
            .into_iter()
            .find(|name| starts_with_tag(&rest[1..], name))
        {
            let Some(open_end) = find_tag_end(source, start) else {
                break;
            };
            let open_tag = &source[start..open_end];
            let self_closing = open_tag.ends_with("/>");

            match name {
                "template" => {
                    if self_closing {
                        pos = open_end;
                        continue;
                    }
                    let Some((close_start, close_end)) = find_template_close(source, open_end)
                    else {
                        break;
                    };
                    if blocks.template.is_none() {
                        blocks.template = Some(TemplateBlock {
                            span: span(start, close_end),
                            content: span(open_end, close_start),
                        });
                    }
                    pos = close_end;
                }
                _ => {
                    if name == "script" {
                        blocks.scripts.push(ScriptBlock {
                            open_tag: span(start, open_end),
                            setup: has_bare_attribute(open_tag, "setup"),
                        });
                    }
                    if self_closing {
                        pos = open_end;
                        continue;
                    }
                    let closing = format!("</{name}");
                    pos = find_ascii_case_insensitive(source, open_end, &closing)
                        .and_then(|close_start| {
                            source[close_start..].find('>').map(|end| close_start + end + 1)
                        })
                        .unwrap_or(source.len());
                }
            }
            continue;
        }

        pos = start + 1;
    }

    blocks
}

#[expect(clippy::cast_possible_truncation)]
fn span(start: usize, end: usize) -> Span {
    Span::new(start as u32, end as u32)
}

/// `rest` (without the leading `<`) opens a tag called `name`.
fn starts_with_tag(rest: &str, name: &str) -> bool {
    rest.len() >= name.len()
        && rest.as_bytes()[..name.len()].eq_ignore_ascii_case(name.as_bytes())
        && rest[name.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_whitespace() || c == '>' || c == '/')
}

/// Find the end (exclusive) of the tag opened at `start`, honouring quoted
/// attribute values.
pub(crate) fn find_tag_end(source: &str, start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in source.as_bytes()[start..].iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(start + i + 1),
            None => {}
        }
    }
    None
}

/// Find the `</template>` matching a template opened before `from`, counting
/// nested `<template>` elements. Returns `(close_start, close_end)`.
fn find_template_close(source: &str, from: usize) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    let mut pos = from;

    while let Some(offset) = source[pos..].find('<') {
        let start = pos + offset;
        let rest = &source[start + 1..];

        if rest.starts_with("!--") {
            pos = rest.find("-->").map_or(source.len(), |end| start + 1 + end + 3);
            continue;
        }

        if let Some(after_slash) = rest.strip_prefix('/')
            && starts_with_tag(after_slash, "template")
        {
            let end = source[start..].find('>').map(|end| start + end + 1)?;
            depth -= 1;
            if depth == 0 {
                return Some((start, end));
            }
            pos = end;
            continue;
        }

        if starts_with_tag(rest, "template") {
            let end = find_tag_end(source, start)?;
            if !source[start..end].ends_with("/>") {
                depth += 1;
            }
            pos = end;
            continue;
        }

        pos = start + 1;
    }

    None
}

fn find_ascii_case_insensitive(source: &str, from: usize, needle: &str) -> Option<usize> {
    let haystack = &source.as_bytes()[from..];
    let needle = needle.as_bytes();
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|i| from + i)
}

/// Whether an opening tag carries a valueless attribute `name`.
fn has_bare_attribute(open_tag: &str, name: &str) -> bool {
    let inner = open_tag
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');
    let mut quote: Option<char> = None;
    let mut token = String::new();
    let mut tokens = Vec::new();
    for c in inner.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c.is_ascii_whitespace() => tokens.push(std::mem::take(&mut token)),
            None => token.push(c),
        }
    }
    tokens.push(token);
    // The first token is the tag name
    tokens.iter().skip(1).any(|token| token == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_template_and_script() {
        let source = "<script setup lang=\"ts\">\nconst a = 1\n</script>\n<template>\n  <div />\n</template>\n";
        let blocks = locate_blocks(source);

        let template = blocks.template.unwrap();
        assert_eq!(template.content.source_text(source), "\n  <div />\n");
        assert!(template.span.source_text(source).starts_with("<template>"));
        assert!(template.span.source_text(source).ends_with("</template>"));

        assert_eq!(blocks.scripts.len(), 1);
        assert!(blocks.scripts[0].setup);
        assert_eq!(
            blocks.scripts[0].open_tag.source_text(source),
            "<script setup lang=\"ts\">"
        );
    }

    #[test]
    fn test_nested_templates_are_balanced() {
        let source = "<template><Comp><template #header>h</template></Comp></template><style>a{}</style>";
        let blocks = locate_blocks(source);
        let template = blocks.template.unwrap();
        assert_eq!(
            template.content.source_text(source),
            "<Comp><template #header>h</template></Comp>"
        );
    }

    #[test]
    fn test_template_inside_script_is_ignored() {
        let source = "<script>\nconst t = '<template>x</template>'\n</script>\n<template><p /></template>";
        let blocks = locate_blocks(source);
        assert_eq!(blocks.template.unwrap().content.source_text(source), "<p />");
    }

    #[test]
    fn test_import_target_prefers_setup() {
        let source = "<script>export default {}</script>\n<script setup>\n</script>\n<template><p /></template>";
        let blocks = locate_blocks(source);
        assert_eq!(blocks.scripts.len(), 2);
        let target = blocks.import_target().unwrap();
        assert!(target.setup);
        assert_eq!(target.open_tag.source_text(source), "<script setup>");
    }

    #[test]
    fn test_setup_detection_ignores_attribute_values() {
        let source = "<script lang=\"setup\"></script>";
        let blocks = locate_blocks(source);
        assert!(!blocks.scripts[0].setup);
    }

    #[test]
    fn test_no_template() {
        let blocks = locate_blocks("<script setup></script>");
        assert!(blocks.template.is_none());
    }
}
