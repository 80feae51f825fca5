//! Fixed-window character chunker.
//!
//! Windows are `size` characters long and start every `size - overlap`
//! characters, so neighbours share exactly `overlap` characters. The last
//! window may be shorter but is always emitted, which keeps every character of
//! the input inside at least one segment. Boundaries are purely positional.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Segment, SegmentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { size: 512, overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        let config = Self { size, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidConfig("chunk size must be greater than 0".into()));
        }
        if self.overlap >= self.size {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.size
            )));
        }
        Ok(())
    }

    /// Distance between the starts of two consecutive windows.
    pub fn step(&self) -> usize {
        self.size - self.overlap
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Number of segments `chunk` would produce for `text`.
    pub fn window_count(&self, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }
        let n = text.chars().count();
        if n <= self.config.size {
            return 1;
        }
        let step = self.config.step();
        1 + (n - self.config.size).div_ceil(step)
    }

    /// Character ranges of every window over `text`.
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let n = text.chars().count();
        let step = self.config.step();
        let mut spans = Vec::with_capacity(self.window_count(text));
        let mut start = 0usize;
        loop {
            let end = (start + self.config.size).min(n);
            spans.push(start..end);
            if end == n {
                break;
            }
            start += step;
        }
        spans
    }

    /// Split `text` into segments labelled with `source`, numbering ids from `first_id`.
    pub fn chunk(&self, text: &str, source: &str, first_id: SegmentId) -> Vec<Segment> {
        let spans = self.spans(text);
        if spans.is_empty() {
            return Vec::new();
        }
        // byte offset of every char boundary, plus the end of the string
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        spans
            .into_iter()
            .enumerate()
            .map(|(ordinal, span)| Segment {
                id: first_id + ordinal as SegmentId,
                text: text[boundaries[span.start]..boundaries[span.end]].to_string(),
                source: source.to_string(),
                ordinal,
                char_start: span.start,
                char_end: span.end,
            })
            .collect()
    }
}
