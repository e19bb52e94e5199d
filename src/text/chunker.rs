//! Overlapping chunking of long plain text
//!
//! Windows end on a sentence or clause boundary where one exists in the back
//! half of the window. Consecutive chunks overlap so that an entity cut by one
//! boundary appears whole in the next chunk.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Boundary characters, highest priority first.
const BOUNDARY_CHARS: [char; 13] = [
    '。', '.', '！', '!', '？', '?', '；', ';', '，', ',', ' ', '\n', '\r',
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Target window length in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub overlap: usize,
    /// Non-final chunks with fewer trimmed characters are skipped
    pub min_chunk_chars: usize,
    pub max_chunks: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 100,
            min_chunk_chars: 20,
            max_chunks: 200,
        }
    }
}

/// A window of the plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub index: usize,
    /// Character offset of the chunk in the full plain text
    pub start: usize,
    pub end: usize,
    pub text: String,
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

/// CJK Unified Ideographs block
fn is_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split `text` into overlapping chunks in text order.
    ///
    /// Chunk starts are strictly increasing and every chunk maps back to the
    /// full text via `start`.
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let size = self.config.chunk_size.max(1);
        let min_chars = self.config.min_chunk_chars;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + size).min(len);

            if end < len {
                end = self.find_boundary(&chars, start, end);
                if end - start < min_chars {
                    end = (start + min_chars).min(len);
                }
            }

            let is_final = end >= len;
            let window: String = chars[start..end].iter().collect();
            let trimmed_len = window.trim().chars().count();
            if trimmed_len >= min_chars || (is_final && trimmed_len > 0) {
                chunks.push(TextChunk {
                    index: chunks.len(),
                    start,
                    end,
                    text: window,
                });
            }

            if is_final {
                break;
            }
            if chunks.len() >= self.config.max_chunks {
                warn!(max_chunks = self.config.max_chunks, text_len = len, "chunk cap reached, remaining text skipped");
                break;
            }
            start = (start + 1).max(end.saturating_sub(self.config.overlap));
        }

        if chunks.is_empty() && len > 0 {
            let end = size.min(len);
            chunks.push(TextChunk {
                index: 0,
                start: 0,
                end,
                text: chars[..end].iter().collect(),
            });
        }

        chunks
    }

    fn find_boundary(&self, chars: &[char], start: usize, end: usize) -> usize {
        let size = self.config.chunk_size;
        let half = start + size / 2;
        for boundary in BOUNDARY_CHARS {
            if let Some(idx) = chars[..end].iter().rposition(|&c| c == boundary) {
                if idx > half {
                    return idx + 1;
                }
            }
        }

        // Avoid cutting a run of ideographs: back off to the last
        // non-ideograph in the final 30% of the window.
        if is_ideograph(chars[end]) {
            let floor = start + size * 7 / 10;
            for i in (floor + 1..end).rev() {
                if !is_ideograph(chars[i]) {
                    return i + 1;
                }
            }
        }
        end
    }
}
