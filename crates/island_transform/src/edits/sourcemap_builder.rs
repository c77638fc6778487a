//! Sourcemap builder for rendered edit buffers.
//!
//! Maps positions in the patched output back to byte offsets of the original
//! component source. The generated position is tracked incrementally from the
//! output buffer, so callers only report "the output so far maps to offset N".

use oxc_sourcemap::{SourceMap, SourceMapBuilder};

/// Tracks the mapping between positions in the rendered output and positions
/// in the original source file.
pub struct EditSourcemapBuilder<'s> {
    /// The source id assigned by the inner sourcemap builder.
    source_id: u32,
    /// The original source text (used for byte-offset → line/column conversion).
    original_source: &'s str,
    /// `line_starts[i]` is the byte offset of the first character on line `i` (0-indexed).
    line_starts: Vec<u32>,
    inner: SourceMapBuilder,

    /// Output length at the last generated-position update.
    last_generated_update: usize,
    /// Current generated line (0-indexed).
    generated_line: u32,
    /// Current generated column (0-indexed, in UTF-16 code units).
    generated_column: u32,
    /// Last original position a mapping was emitted for.
    last_position: Option<u32>,
}

impl<'s> EditSourcemapBuilder<'s> {
    /// `source_path` is the filename used in the sourcemap's `sources` array.
    pub fn new(source_path: &str, source_text: &'s str) -> Self {
        let mut inner = SourceMapBuilder::default();
        let source_id = inner.set_source_and_content(source_path, source_text);
        Self {
            source_id,
            original_source: source_text,
            line_starts: Self::compute_line_starts(source_text),
            inner,
            last_generated_update: 0,
            generated_line: 0,
            generated_column: 0,
            last_position: None,
        }
    }

    pub fn into_sourcemap(self) -> SourceMap {
        self.inner.into_sourcemap()
    }

    /// Add a mapping from the end of `output` to `original_position`.
    ///
    /// `output` must be the whole output rendered so far; it only ever grows.
    pub fn add_source_mapping(&mut self, output: &[u8], original_position: u32) {
        if self.last_position == Some(original_position) {
            return;
        }
        self.update_generated_line_and_column(output);

        let original_position =
            original_position.min(self.original_source.len().try_into().unwrap_or(u32::MAX));
        let (original_line, original_column) = self.byte_offset_to_line_column(original_position);

        self.inner.add_token(
            self.generated_line,
            self.generated_column,
            original_line,
            original_column,
            Some(self.source_id),
            None,
        );

        self.last_position = Some(original_position);
    }

    /// Convert a byte offset in the original source to (line, column), both 0-indexed.
    /// Column is counted in UTF-16 code units.
    #[expect(clippy::cast_possible_truncation)]
    fn byte_offset_to_line_column(&self, byte_offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&byte_offset) {
            Ok(exact) => exact,
            Err(insert_pos) => insert_pos.saturating_sub(1),
        };

        let line_start = self.line_starts[line] as usize;
        let end = (byte_offset as usize).min(self.original_source.len());
        let segment = &self.original_source.as_bytes()[line_start..end];

        let column = if segment.is_ascii() {
            segment.len() as u32
        } else {
            self.original_source
                .get(line_start..end)
                .map_or(0, |s| s.encode_utf16().count() as u32)
        };

        (line as u32, column)
    }

    /// Advance the generated line/column over the bytes appended to `output`
    /// since the last update.
    #[expect(clippy::cast_possible_truncation)]
    fn update_generated_line_and_column(&mut self, output: &[u8]) {
        let start = self.last_generated_update;
        self.last_generated_update = output.len();
        if start >= output.len() {
            return;
        }

        let new_bytes = &output[start..];

        let mut last_newline_pos = None;
        let mut newline_count: u32 = 0;
        let mut i = 0;
        while i < new_bytes.len() {
            match new_bytes[i] {
                b'\n' => {
                    newline_count += 1;
                    last_newline_pos = Some(i);
                }
                b'\r' => {
                    newline_count += 1;
                    if new_bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    last_newline_pos = Some(i);
                }
                _ => {}
            }
            i += 1;
        }

        let utf16_len = |bytes: &[u8]| -> u32 {
            if bytes.is_ascii() {
                bytes.len() as u32
            } else {
                std::str::from_utf8(bytes).map_or(0, |s| s.encode_utf16().count() as u32)
            }
        };

        if let Some(last_nl) = last_newline_pos {
            self.generated_line += newline_count;
            self.generated_column = utf16_len(&new_bytes[last_nl + 1..]);
        } else {
            self.generated_column += utf16_len(new_bytes);
        }
    }

    /// Compute line start byte offsets for the source text.
    #[expect(clippy::cast_possible_truncation)]
    fn compute_line_starts(source: &str) -> Vec<u32> {
        let mut starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                starts.push((i + 1) as u32);
            } else if b == b'\r' {
                if source.as_bytes().get(i + 1) == Some(&b'\n') {
                    continue;
                }
                starts.push((i + 1) as u32);
            }
        }
        starts
    }
}
