//! Non-destructive edit buffer.
//!
//! Edits are recorded against byte offsets of the original source and are
//! only applied when the buffer is rendered. Rendering never mutates the
//! buffer, so a transform that gives up halfway simply drops it.

mod sourcemap_builder;

use oxc_sourcemap::SourceMap;
use thiserror::Error;

pub use sourcemap_builder::EditSourcemapBuilder;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("edit range {start}..{end} is outside the source (length {len})")]
    OutOfBounds { start: u32, end: u32, len: u32 },

    #[error("edit offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: u32 },

    #[error("cannot overwrite the empty range at {offset}")]
    EmptyRange { offset: u32 },

    #[error("overwrite {start}..{end} partially overlaps the overwrite {other_start}..{other_end}")]
    Overlap {
        start: u32,
        end: u32,
        other_start: u32,
        other_end: u32,
    },
}

/// Which neighbour an insert sticks to. At the same offset, left inserts
/// render before right inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Insert {
    offset: u32,
    side: Side,
    text: String,
}

#[derive(Debug, Clone)]
struct Overwrite {
    start: u32,
    end: u32,
    text: String,
}

/// Accumulates edits for one source text.
#[derive(Debug, Clone)]
pub struct EditBuffer<'s> {
    source: &'s str,
    /// In insertion order; rendered latest first.
    prepends: Vec<String>,
    /// In insertion order.
    inserts: Vec<Insert>,
    /// Sorted by start, pairwise disjoint.
    overwrites: Vec<Overwrite>,
}

impl<'s> EditBuffer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            prepends: Vec::new(),
            inserts: Vec::new(),
            overwrites: Vec::new(),
        }
    }

    /// Whether any edit was recorded.
    pub fn has_changes(&self) -> bool {
        !(self.prepends.is_empty() && self.inserts.is_empty() && self.overwrites.is_empty())
    }

    /// Insert `text` at the very start of the output, before every earlier prepend.
    pub fn prepend(&mut self, text: impl Into<String>) {
        self.prepends.push(text.into());
    }

    /// Insert `text` at `offset`, attached to the text on its left.
    pub fn append_left(&mut self, offset: u32, text: impl Into<String>) -> Result<(), EditError> {
        self.insert(offset, Side::Left, text.into())
    }

    /// Insert `text` at `offset`, attached to the text on its right.
    pub fn append_right(&mut self, offset: u32, text: impl Into<String>) -> Result<(), EditError> {
        self.insert(offset, Side::Right, text.into())
    }

    fn insert(&mut self, offset: u32, side: Side, text: String) -> Result<(), EditError> {
        self.check_offset(offset, offset)?;
        self.inserts.push(Insert { offset, side, text });
        Ok(())
    }

    /// Replace `start..end` of the source with `text`.
    ///
    /// An overwrite that contains earlier overwrites replaces them. Inserts
    /// strictly inside the range are dropped at render time. On error the
    /// buffer is left untouched.
    pub fn overwrite(
        &mut self,
        start: u32,
        end: u32,
        text: impl Into<String>,
    ) -> Result<(), EditError> {
        self.check_offset(start, end)?;
        if start == end {
            return Err(EditError::EmptyRange { offset: start });
        }

        if let Some(other) = self.overwrites.iter().find(|o| {
            let disjoint = o.end <= start || end <= o.start;
            let contained = start <= o.start && o.end <= end;
            !disjoint && !contained
        }) {
            return Err(EditError::Overlap {
                start,
                end,
                other_start: other.start,
                other_end: other.end,
            });
        }

        self.overwrites
            .retain(|o| !(start <= o.start && o.end <= end));
        let index = self.overwrites.partition_point(|o| o.start < start);
        self.overwrites.insert(
            index,
            Overwrite {
                start,
                end,
                text: text.into(),
            },
        );
        Ok(())
    }

    #[expect(clippy::cast_possible_truncation)]
    fn check_offset(&self, start: u32, end: u32) -> Result<(), EditError> {
        let len = self.source.len() as u32;
        if start > end || end > len {
            return Err(EditError::OutOfBounds { start, end, len });
        }
        for offset in [start, end] {
            if !self.source.is_char_boundary(offset as usize) {
                return Err(EditError::NotCharBoundary { offset });
            }
        }
        Ok(())
    }

    /// Render the patched text.
    pub fn render(&self) -> String {
        self.render_impl(None)
    }

    /// Render the patched text and a source map pointing back at the
    /// original source, registered under `source_path`.
    pub fn render_with_sourcemap(&self, source_path: &str) -> (String, SourceMap) {
        let mut builder = EditSourcemapBuilder::new(source_path, self.source);
        let code = self.render_impl(Some(&mut builder));
        (code, builder.into_sourcemap())
    }

    fn render_impl(&self, mut map: Option<&mut EditSourcemapBuilder<'s>>) -> String {
        let mut out = String::with_capacity(self.source.len());
        for text in self.prepends.iter().rev() {
            out.push_str(text);
        }

        // Stable sort keeps insertion order within one offset and side
        let mut inserts: Vec<&Insert> = self.inserts.iter().collect();
        inserts.sort_by_key(|insert| (insert.offset, insert.side));
        let mut inserts = inserts.into_iter().peekable();

        let mut cursor = 0u32;
        for overwrite in &self.overwrites {
            let mut chunk = Chunk {
                source: self.source,
                out: &mut out,
                map: map.as_deref_mut(),
            };
            chunk.emit_source(cursor, overwrite.start, &mut inserts);
            chunk.map(overwrite.start);
            chunk.out.push_str(&overwrite.text);
            while inserts.next_if(|insert| insert.offset < overwrite.end).is_some() {}
            cursor = overwrite.end;
        }

        #[expect(clippy::cast_possible_truncation)]
        let len = self.source.len() as u32;
        Chunk {
            source: self.source,
            out: &mut out,
            map: map.as_deref_mut(),
        }
        .emit_source(cursor, len, &mut inserts);

        out
    }
}

/// Output cursor used while rendering.
struct Chunk<'a, 's> {
    source: &'s str,
    out: &'a mut String,
    map: Option<&'a mut EditSourcemapBuilder<'s>>,
}

impl<'s> Chunk<'_, 's> {
    fn map(&mut self, original_position: u32) {
        if let Some(map) = self.map.as_deref_mut() {
            map.add_source_mapping(self.out.as_bytes(), original_position);
        }
    }

    /// Copy `from..to` of the source, interleaving the inserts that fall in
    /// `from..=to`.
    fn emit_source<'i>(
        &mut self,
        from: u32,
        to: u32,
        inserts: &mut std::iter::Peekable<impl Iterator<Item = &'i Insert>>,
    ) {
        let mut pos = from;
        while let Some(insert) = inserts.next_if(|insert| insert.offset <= to) {
            self.copy(pos, insert.offset);
            pos = pos.max(insert.offset);
            self.out.push_str(&insert.text);
        }
        self.copy(pos, to);
    }

    /// Copy unedited source, mapping its start and every line start inside it.
    #[expect(clippy::cast_possible_truncation)]
    fn copy(&mut self, from: u32, to: u32) {
        if from >= to {
            return;
        }
        let text = &self.source[from as usize..to as usize];
        self.map(from);
        let mut written = 0;
        for (i, _) in text.match_indices('\n') {
            let line_start = i + 1;
            if line_start >= text.len() {
                break;
            }
            self.out.push_str(&text[written..line_start]);
            written = line_start;
            self.map(from + line_start as u32);
        }
        self.out.push_str(&text[written..]);
    }
}
