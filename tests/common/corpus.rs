//! Classical text fixtures for integration tests

use guji::text::find_all;

/// The worked example used throughout: 10 characters, all ideographs and
/// full-width punctuation.
pub const JIAZI: &str = "甲子年，张三往洛阳。";

/// Opening of 史記·項羽本紀 with person, place and time entities.
pub const XIANG_YU: &str = "項籍者，下相人也，字羽。初起時，年二十四。其季父項梁，梁父即楚將項燕，為秦將王翦所戮者也。";

/// Filler without sentence or clause marks, so chunk windows fall at fixed
/// offsets.
const FILLER: &str = "天地玄黃宇宙洪荒日月盈昃";

/// `len` filler ideographs with `names` written over it at the given char
/// offsets.
pub fn long_text(len: usize, names: &[(usize, &str)]) -> String {
    let mut chars: Vec<char> = FILLER.chars().cycle().take(len).collect();
    for (at, name) in names {
        for (i, c) in name.chars().enumerate() {
            chars[at + i] = c;
        }
    }
    chars.into_iter().collect()
}

/// Char range of the `nth` occurrence of `needle` in `text`.
pub fn range_of(text: &str, needle: &str, nth: usize) -> (usize, usize) {
    find_all(text, needle)[nth]
}
