//! Icon classes for result rows.

use std::path::Path;

/// Icon class for folder rows
pub const FOLDER: &str = "folder";

/// Icon class for a file path, by extension.
///
/// Binary files get `binary`; anything unrecognized gets `unknown`.
pub fn icon(path: &str, is_binary: bool) -> &'static str {
    if is_binary {
        return "binary";
    }

    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("c") => "c",
        Some("cc" | "cpp" | "cxx" | "c++") => "cpp",
        Some("h" | "hh" | "hpp" | "hxx" | "inl") => "h",
        Some("js" | "jsm" | "mjs" | "cjs" | "jsx") => "js",
        Some("ts" | "tsx") => "ts",
        Some("py" | "pyw") => "py",
        Some("rs") => "rs",
        Some("go") => "go",
        Some("java") => "java",
        Some("html" | "htm" | "xhtml") => "html",
        Some("css" | "scss" | "less") => "css",
        Some("xml" | "xul" | "svg") => "xml",
        Some("idl" | "webidl") => "idl",
        Some("json") => "json",
        Some("sh" | "bash" | "zsh") => "sh",
        Some("md" | "markdown") => "md",
        Some("rst" | "txt") => "txt",
        Some("png" | "jpg" | "jpeg" | "gif" | "ico" | "bmp" | "webp") => "image",
        Some("mk") => "mk",
        _ => match Path::new(path).file_name().and_then(|n| n.to_str()) {
            Some("Makefile" | "makefile" | "GNUmakefile") => "mk",
            _ => "unknown",
        },
    }
}
