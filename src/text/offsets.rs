//! Character offsets into plain text
//!
//! Annotation offsets count Unicode scalar values, not bytes. These helpers
//! translate between the two so callers never slice a `&str` on a byte index
//! that falls inside a multi-byte character.

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the character at `char_idx`, or of the end of the text when
/// `char_idx` equals its length.
pub fn byte_offset(text: &str, char_idx: usize) -> Option<usize> {
    if char_idx == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte_idx, _) in text.char_indices() {
        if count == char_idx {
            return Some(byte_idx);
        }
        count += 1;
    }
    (count == char_idx).then_some(text.len())
}

/// Slice `text` by character range `[start, end)`.
///
/// Returns `None` unless `start < end <= char_len(text)`.
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if start >= end {
        return None;
    }
    let from = byte_offset(text, start)?;
    let to = byte_offset(text, end)?;
    Some(&text[from..to])
}

/// Resolve a selected string to its first occurrence in `plain_text`.
///
/// Returns the character range of the match. Empty or whitespace-only
/// selections resolve to nothing.
pub fn locate_selection(plain_text: &str, selected: &str) -> Option<(usize, usize)> {
    if selected.trim().is_empty() {
        return None;
    }
    let byte_start = plain_text.find(selected)?;
    let start = plain_text[..byte_start].chars().count();
    Some((start, start + char_len(selected)))
}

/// Every occurrence of `needle` in `haystack` as character ranges, left to
/// right and non-overlapping.
pub fn find_all(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    if needle.is_empty() {
        return Vec::new();
    }
    let needle_len = char_len(needle);
    let mut ranges = Vec::new();
    let mut chars_before = 0;
    let mut last_byte = 0;
    for (byte_idx, _) in haystack.match_indices(needle) {
        chars_before += haystack[last_byte..byte_idx].chars().count();
        ranges.push((chars_before, chars_before + needle_len));
        chars_before += needle_len;
        last_byte = byte_idx + needle.len();
    }
    ranges
}
