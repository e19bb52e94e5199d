//! Plain-text handling: normalization, offsets, chunking and segmentation

pub mod chunker;
pub mod normalize;
pub mod offsets;
pub mod segments;

pub use chunker::{Chunker, ChunkerConfig, TextChunk};
pub use normalize::{detect_format, normalize_whitespace, to_plain_text, to_plain_text_as, ContentFormat};
pub use offsets::{char_len, char_slice, find_all, locate_selection};
pub use segments::{segments, Segment, SegmentAnnotation};
