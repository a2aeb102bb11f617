//! Query language, compilation and execution.
//!
//! - [`parser`] - Turns a query string into [`Term`]s using a plugin-derived [`Grammar`]
//! - [`filters`] - The [`Filter`] trait every plugin filter implements
//! - [`compiler`] - Groups filters and folds them into one backend predicate
//! - [`executor`] - Runs queries against a [`SearchBackend`](crate::index::SearchBackend)
//! - [`highlight`] - Wraps codepoint extents in `<b>` tags

pub mod compiler;
pub mod executor;
pub mod filters;
pub mod highlight;
pub mod parser;

pub use executor::{LineRow, MixedResults, Promoted, Query, Rows, SearchRow};
pub use filters::Filter;
pub use highlight::{highlight, merge_extents, Extent};
pub use parser::{parse_query, Grammar, Term};
