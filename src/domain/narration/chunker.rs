//! Word-safe splitting of text into bounded-size units.
//!
//! A chunk ends at the first whitespace character at or after the target
//! offset (the whitespace itself starts the next chunk), or at end-of-text.
//! The target counts characters, not bytes, so multi-byte text is cut at the
//! same lengths as ASCII.
//! The same text and target size always produce the same sequence, which the
//! synthesis driver relies on to re-derive chunk indices on every invocation.

/// Splits text at a fixed target size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    target_size: usize,
}

impl TextChunker {
    /// A target of zero is treated as one
    pub fn new(target_size: usize) -> Self {
        Self {
            target_size: target_size.max(1),
        }
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Lazy sequence of chunks; clone it to restart from the beginning
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            target_size: self.target_size,
            position: 0,
        }
    }

    pub fn count(&self, text: &str) -> usize {
        self.chunks(text).count()
    }
}

#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    target_size: usize,
    position: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.text.len();
        if self.position >= len {
            return None;
        }

        let end = self.text[self.position..]
            .char_indices()
            .nth(self.target_size)
            .map(|(offset, _)| self.position + offset)
            .unwrap_or(len);

        let end = self.text[end..]
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map(|(offset, _)| end + offset)
            .unwrap_or(len);

        let chunk = &self.text[self.position..end];
        self.position = end;
        Some(chunk)
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}
