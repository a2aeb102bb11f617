//! Codepoint-aware string helpers shared by filters and the highlighter.

use memchr::memmem;

/// Lowercase one codepoint at a time.
///
/// Unlike `str::to_lowercase` this has no context-sensitive rules, so a
/// substring of the input always folds to a substring of the folded input.
pub fn fold_case(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Whether any codepoint is uppercase
pub fn has_uppercase(s: &str) -> bool {
    s.chars().any(char::is_uppercase)
}

/// Escape text for embedding in HTML element content
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Byte offset of every codepoint boundary in `s`, including the end.
///
/// Index `i` holds the byte offset of codepoint `i`; the last entry is
/// `s.len()`.
pub fn char_boundaries(s: &str) -> Vec<usize> {
    s.char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(s.len()))
        .collect()
}

/// Convert a byte offset on a char boundary to a codepoint offset
pub fn char_offset(boundaries: &[usize], byte: usize) -> usize {
    boundaries.partition_point(|&b| b < byte)
}

/// Codepoint extents of non-overlapping occurrences of `needle`.
///
/// An empty needle finds nothing. Case-insensitive matching folds both sides
/// per codepoint before searching.
pub fn find_extents(haystack: &str, needle: &str, case_sensitive: bool) -> Vec<(usize, usize)> {
    if needle.is_empty() {
        return Vec::new();
    }

    if case_sensitive {
        return byte_matches_to_extents(haystack, haystack, needle);
    }

    // Folding can change byte lengths, so map through the folded string's
    // own codepoints; folding is one codepoint to one or more.
    let folded_needle = fold_case(needle);
    let mut folded = String::with_capacity(haystack.len());
    let mut origin = Vec::with_capacity(haystack.len());
    for (idx, ch) in haystack.chars().enumerate() {
        for lower in ch.to_lowercase() {
            folded.push(lower);
            origin.push(idx);
        }
    }
    let total = haystack.chars().count();
    byte_matches_to_extents(&folded, &folded, &folded_needle)
        .into_iter()
        .map(|(start, end)| {
            let start = origin.get(start).copied().unwrap_or(total);
            let end = if end == 0 {
                0
            } else {
                origin.get(end - 1).map(|i| i + 1).unwrap_or(total)
            };
            (start, end)
        })
        .collect()
}

fn byte_matches_to_extents(text: &str, haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    let boundaries = char_boundaries(text);
    let needle_chars = needle.chars().count();
    memmem::find_iter(haystack.as_bytes(), needle.as_bytes())
        .map(|byte| {
            let start = char_offset(&boundaries, byte);
            (start, start + needle_chars)
        })
        .collect()
}
