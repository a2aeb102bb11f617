#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (&str, Vec<(u16, u16)>)| {
    // Arbitrary extents are either rejected or produce balanced markup
    let (content, extents) = input;
    let extents = extents.into_iter().map(|(s, e)| (s as usize, e as usize));
    if let Ok(out) = srcx::query::highlight(content, extents) {
        assert_eq!(out.matches("<b>").count(), out.matches("</b>").count());
    }
});
