//! Utility functions shared across the engine.
//!
//! ## Modules
//!
//! - [`app_data`] - Engine configuration in the app data directory (XDG-compliant)
//! - [`progress`] - Progress bars, no-op without the `progress` feature
//! - [`text`] - Codepoint-aware case folding, substring search and HTML escaping
//! - [`trigram`] - 3-byte sequence extraction and glob literal runs
//!
//! ```no_run
//! use srcx::utils::{extract_trigrams, find_extents};
//!
//! // Trigrams for substring narrowing
//! let trigrams = extract_trigrams(b"hello world");
//!
//! // Codepoint extents of case-insensitive occurrences
//! let extents = find_extents("Hello hello", "hello", false);
//! assert_eq!(extents, vec![(0, 5), (6, 11)]);
//! ```

pub mod app_data;
pub mod progress;
pub mod text;
pub mod trigram;

pub use app_data::*;
pub use text::*;
pub use trigram::*;
