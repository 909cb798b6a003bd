//! Line index of a source text.

use std::fmt;

use text_size::{TextRange, TextSize};

/// A 0-indexed line/column position; displayed 1-indexed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
pub struct LineCol {
    pub line: u32,
    /// Column in UTF-8 bytes.
    pub col: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Debug for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The LINE_INFO fact of a source: start offset of every line.
///
/// Offsets past the end of the text clamp to the last position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineInfo {
    line_starts: Vec<TextSize>,
    len: TextSize,
}

impl LineInfo {
    pub fn new(text: &str) -> Self {
        let line_starts = std::iter::once(TextSize::new(0))
            .chain(
                text.match_indices('\n')
                    .map(|(offset, _)| TextSize::new(offset as u32 + 1)),
            )
            .collect();
        Self {
            line_starts,
            len: TextSize::of(text),
        }
    }

    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        LineCol {
            line: line as u32,
            col: (offset - self.line_starts[line]).into(),
        }
    }

    /// Start and end positions of a range.
    pub fn range(&self, range: TextRange) -> (LineCol, LineCol) {
        (self.line_col(range.start()), self.line_col(range.end()))
    }

    /// Inverse of [`line_col`](Self::line_col); `None` if the line does not exist.
    pub fn offset(&self, position: LineCol) -> Option<TextSize> {
        let start = *self.line_starts.get(position.line as usize)?;
        Some((start + TextSize::new(position.col)).min(self.len))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn text_len(&self) -> TextSize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_multi_line() {
        let info = LineInfo::new("ab\ncd\n\nef");
        assert_eq!(info.line_count(), 4);
        assert_eq!(info.line_col(TextSize::new(0)), LineCol::new(0, 0));
        assert_eq!(info.line_col(TextSize::new(2)), LineCol::new(0, 2));
        assert_eq!(info.line_col(TextSize::new(3)), LineCol::new(1, 0));
        assert_eq!(info.line_col(TextSize::new(6)), LineCol::new(2, 0));
        assert_eq!(info.line_col(TextSize::new(8)), LineCol::new(3, 1));
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let info = LineInfo::new("abc");
        assert_eq!(info.line_col(TextSize::new(40)), LineCol::new(0, 3));
        assert_eq!(info.offset(LineCol::new(0, 10)), Some(TextSize::new(3)));
        assert_eq!(info.offset(LineCol::new(5, 0)), None);
    }

    #[test]
    fn test_offset_inverts_line_col() {
        let info = LineInfo::new("one\ntwo\nthree");
        let offset = TextSize::new(9);
        assert_eq!(info.offset(info.line_col(offset)), Some(offset));
    }

    #[test]
    fn test_display_is_one_indexed() {
        assert_eq!(LineCol::new(4, 0).to_string(), "5:1");
    }
}
