/// Owned iterator over consecutive `size`-character slices of a string.
///
/// Splits on character boundaries, so multi-byte text is never cut mid-codepoint and the
/// concatenation of all chunks is byte-identical to the input.
#[derive(Debug, Clone)]
pub struct TextChunks {
    text: String,
    offset: usize,
    size: usize,
}

impl TextChunks {
    pub fn new(text: String, size: usize) -> Self {
        Self {
            text,
            offset: 0,
            size: size.max(1),
        }
    }
}

impl Iterator for TextChunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.offset >= self.text.len() {
            return None;
        }

        let rest = &self.text[self.offset..];
        let end = rest
            .char_indices()
            .nth(self.size)
            .map_or(rest.len(), |(idx, _)| idx);
        self.offset += end;
        Some(rest[..end].to_string())
    }
}
