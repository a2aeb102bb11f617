//! # srcx - Source Search Query Engine
//!
//! srcx turns a compact query language (`path:*.c +function:Stack::Push -regexp:"^#if"`)
//! into structured search requests, runs them against an index of files and
//! lines, and highlights the matching parts of every result.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`query`] - Query parsing, filter compilation, execution and highlighting
//! - [`plugins`] - Filter and direct-search registrations (`core`, `clang`, `js`)
//! - [`index`] - Search request model, the backend trait and an in-memory backend
//! - [`output`] - Terminal and JSON rendering of result rows
//! - [`mime`] - Icon classes for result rows
//! - [`utils`] - Configuration, trigrams and codepoint-aware text helpers
//!
//! ## Quick Start
//!
//! ```no_run
//! use srcx::index::build::index_tree;
//! use srcx::plugins::Catalog;
//! use srcx::query::Query;
//! use std::path::Path;
//!
//! let index = index_tree(Path::new("/path/to/codebase"), true).unwrap();
//! let catalog = Catalog::builtin(8);
//! let plugins = catalog.plugin_set(&["core", "clang", "js"]);
//!
//! let query = Query::new(&index, "path:*.c main", plugins).unwrap();
//! let (total, rows) = query.results(0, 100).unwrap();
//! println!("{} matches", total);
//! for row in rows {
//!     let row = row.unwrap();
//!     println!("{}", row.path);
//! }
//! ```
//!
//! ## Search model
//!
//! Every term becomes one or more filters. Filters of the same term are
//! OR'ed and terms are AND'ed, so `var:foo` matches C and JS variables alike
//! while `var:foo var:bar` needs both. Queries touching line content run in
//! the line domain; everything else runs over files and folders.

pub mod error;
pub mod index;
pub mod mime;
pub mod output;
pub mod plugins;
pub mod query;
pub mod utils;
