//! Line cursor over the source text.
//!
//! The block parser works line by line and backtracks with [`LineCursor::rewind`].
//! Conditional header blocks are spliced back in with [`LineCursor::insert`].

/// A position in an ordered sequence of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineCursor {
    lines: Vec<String>,
    offset: usize,
}

impl LineCursor {
    /// Create a cursor over `lines`, positioned on the first one.
    #[must_use]
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines, offset: 0 }
    }

    /// Split `text` on line feeds, dropping a trailing carriage return from each line.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::new(
            text.split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                .collect(),
        )
    }

    /// 1-based number of the line that the next call to [`next_line`](Self::next_line) returns.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.offset + 1
    }

    /// Whether every line was consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.lines.len()
    }

    /// Return to the first line.
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Step back one line. No-op at the start.
    pub fn rewind(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }

    /// The current line without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<&str> {
        self.lines.get(self.offset).map(String::as_str)
    }

    /// Consume and return the current line.
    pub fn next_line(&mut self) -> Option<String> {
        let line = self.lines.get(self.offset)?.clone();
        self.offset += 1;
        Some(line)
    }

    /// Replace the most recently consumed line, so a later rewind sees `value`.
    pub fn set_previous_line(&mut self, value: impl Into<String>) {
        if let Some(line) = self
            .offset
            .checked_sub(1)
            .and_then(|index| self.lines.get_mut(index))
        {
            *line = value.into();
        }
    }

    /// Splice `lines` in front of the current position; they are read next.
    pub fn insert(&mut self, lines: Vec<String>) {
        let at = self.offset.min(self.lines.len());
        self.lines.splice(at..at, lines);
    }

    /// Skip blank lines, `//` line comments and `////` comment blocks, returning the
    /// first meaningful line consumed.
    pub fn skip_comments_and_blank_lines(&mut self) -> Option<String> {
        while let Some(line) = self.next_line() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "////" {
                self.skip_comment_block();
                continue;
            }
            if is_comment(&line) {
                continue;
            }
            return Some(line);
        }
        None
    }

    /// Consume lines up to and including the closing `////`, or to the end.
    fn skip_comment_block(&mut self) {
        while let Some(line) = self.next_line() {
            if line.trim() == "////" {
                return;
            }
        }
    }

    /// Consume the remaining lines.
    pub fn remaining(&mut self) -> Vec<String> {
        let rest = self.lines.split_off(self.offset.min(self.lines.len()));
        self.offset = self.lines.len();
        rest
    }
}

/// A `//` line comment (but not the `////` block delimiter).
#[must_use]
pub fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") && trimmed.trim_end() != "////"
}
