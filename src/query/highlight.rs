//! Rendering of highlighted result text.

use crate::error::InvalidExtent;
use crate::utils::text::escape_html;

/// Half-open `(start, end)` range of codepoints to highlight
pub type Extent = (usize, usize);

/// Sort extents and merge the ones that overlap or touch.
///
/// The result covers exactly the same codepoints as the input, in order,
/// with no two extents sharing or abutting a position.
pub fn merge_extents(extents: impl IntoIterator<Item = Extent>) -> Result<Vec<Extent>, InvalidExtent> {
    let mut sorted: Vec<Extent> = extents.into_iter().collect();
    if let Some(&(start, end)) = sorted.iter().find(|(start, end)| start > end) {
        return Err(InvalidExtent { start, end });
    }
    sorted.sort_unstable();

    let mut merged: Vec<Extent> = Vec::with_capacity(sorted.len());
    for (start, end) in sorted {
        match merged.last_mut() {
            Some(cur) if start <= cur.1 => cur.1 = cur.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    Ok(merged)
}

/// Return `content` with the union of `extents` wrapped in `<b>` tags.
///
/// All literal text is HTML-escaped. Offsets are in codepoints and clamp to
/// the end of `content`. Leading whitespace is stripped from the result.
pub fn highlight(content: &str, extents: impl IntoIterator<Item = Extent>) -> Result<String, InvalidExtent> {
    let merged = merge_extents(extents)?;
    let chars: Vec<char> = content.chars().collect();
    let slice = |start: usize, end: usize| -> String {
        let start = start.min(chars.len());
        let end = end.min(chars.len());
        chars[start..end].iter().collect()
    };

    let mut out = String::with_capacity(content.len() + merged.len() * 7);
    let mut before = 0;
    for (start, end) in merged {
        out.push_str(&escape_html(&slice(before, start)));
        out.push_str("<b>");
        out.push_str(&escape_html(&slice(start, end)));
        out.push_str("</b>");
        before = end;
    }
    out.push_str(&escape_html(&slice(before, chars.len())));

    Ok(out.trim_start().to_string())
}
