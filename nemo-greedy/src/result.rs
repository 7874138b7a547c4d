//! Decoded tokens for one utterance

/// Greedy search output for one utterance.
///
/// `tokens[i]` was emitted at encoder frame `timestamps[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeResult {
    pub tokens: Vec<i32>,
    pub timestamps: Vec<usize>,
}

impl DecodeResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, token: i32, frame: usize) {
        self.tokens.push(token);
        self.timestamps.push(frame);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Append the result of a later chunk.
    ///
    /// `frame_offset` is the number of encoder frames consumed before that
    /// chunk; its chunk-local timestamps are shifted by it.
    pub fn extend_from_chunk(&mut self, chunk: DecodeResult, frame_offset: usize) {
        self.tokens.extend(chunk.tokens);
        self.timestamps
            .extend(chunk.timestamps.into_iter().map(|t| t + frame_offset));
    }
}
