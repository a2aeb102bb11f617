use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A trigram is a 3-byte sequence stored as u32 (only lower 24 bits used)
pub type Trigram = u32;

/// Position of a record inside one collection of the in-memory index
pub type DocId = u32;

/// Which collection a filter, query or record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Whole files and folders
    File,
    /// Individual lines of text files
    Line,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::File => f.write_str("file"),
            Domain::Line => f.write_str("line"),
        }
    }
}

/// A structural annotation on a line, e.g. a function definition.
///
/// `start`/`end` are codepoint offsets into the line's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Needle {
    pub name: String,
    #[serde(default)]
    pub qualname: Option<String>,
    pub start: usize,
    pub end: usize,
}

impl Needle {
    pub fn new(name: &str, qualname: Option<&str>, start: usize, end: usize) -> Self {
        Self {
            name: name.to_string(),
            qualname: qualname.map(str::to_string),
            start,
            end,
        }
    }

    /// Qualified name, falling back to the bare name
    pub fn qualname(&self) -> &str {
        self.qualname.as_deref().unwrap_or(&self.name)
    }
}

/// One row of the search index: a file, a folder or a line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub path: String,
    /// 1-based line number; present only on line records
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub is_binary: bool,
    /// Target of a cross-reference link (reference-only file rows)
    #[serde(default)]
    pub link: Option<String>,
    /// Filename extension without the dot; derived from `path` when absent
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub needles: BTreeMap<String, Vec<Needle>>,
}

impl Record {
    pub fn file(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ext: extension_of(path),
            ..Self::default()
        }
    }

    pub fn folder(path: &str) -> Self {
        Self {
            path: path.to_string(),
            is_folder: true,
            ..Self::default()
        }
    }

    pub fn line(path: &str, number: u32, content: &str) -> Self {
        Self {
            path: path.to_string(),
            number: Some(number),
            content: Some(content.to_string()),
            ext: extension_of(path),
            ..Self::default()
        }
    }

    /// Attach a needle, builder-style
    pub fn with_needle(mut self, key: &str, needle: Needle) -> Self {
        self.needles.entry(key.to_string()).or_default().push(needle);
        self
    }

    pub fn domain(&self) -> Domain {
        if self.number.is_some() {
            Domain::Line
        } else {
            Domain::File
        }
    }

    /// Needles stored under `key`, empty when there are none
    pub fn needles(&self, key: &str) -> &[Needle] {
        self.needles.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The record's extension, explicit or derived from the path
    pub fn extension(&self) -> Option<String> {
        self.ext.clone().or_else(|| extension_of(&self.path))
    }
}

/// Extension of the last path component, without the dot
pub fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

/// Convert 3 bytes to a trigram
#[inline]
pub fn bytes_to_trigram(b0: u8, b1: u8, b2: u8) -> Trigram {
    ((b0 as u32) << 16) | ((b1 as u32) << 8) | (b2 as u32)
}
