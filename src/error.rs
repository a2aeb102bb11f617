//! Error types shared by the query engine.
//!
//! Parse and filter-argument failures are user errors and carry a
//! display-ready reason. Backend failures are propagated untouched and never
//! expose the query body that caused them.

use std::time::Duration;
use thiserror::Error;

/// The query string could not be consumed by the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} (at offset {offset})")]
pub struct ParseError {
    pub reason: String,
    /// Byte offset into the query string where parsing stopped
    pub offset: usize,
}

impl ParseError {
    pub fn new<S: Into<String>>(reason: S, offset: usize) -> Self {
        Self {
            reason: reason.into(),
            offset,
        }
    }
}

/// A filter argument could not be turned into a backend predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct BadTerm {
    pub reason: String,
}

impl BadTerm {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failures reported by a search backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend rejected the query body as structurally invalid
    #[error("malformed query body: {0}")]
    Malformed(String),

    #[error("search backend unavailable: {0}")]
    Unavailable(String),

    #[error("search backend timed out after {0:?}")]
    Timeout(Duration),
}

/// An extent whose start lies after its end was handed to the highlighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("extent start {start} is after its end {end}")]
pub struct InvalidExtent {
    pub start: usize,
    pub end: usize,
}

/// Everything that can go wrong while building or running a query.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("malformed query: {0}")]
    MalformedQuery(#[from] ParseError),

    #[error("{0}")]
    BadTerm(#[from] BadTerm),

    #[error("search failed")]
    Backend(#[source] BackendError),

    #[error(transparent)]
    InvalidExtent(#[from] InvalidExtent),
}

impl From<BackendError> for SearchError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Malformed(reason) => SearchError::BadTerm(BadTerm { reason }),
            other => SearchError::Backend(other),
        }
    }
}

impl SearchError {
    /// Reason suitable for showing to the person who typed the query.
    ///
    /// Returns `None` for failures that are not the user's fault.
    pub fn user_reason(&self) -> Option<&str> {
        match self {
            SearchError::MalformedQuery(e) => Some(&e.reason),
            SearchError::BadTerm(e) => Some(&e.reason),
            SearchError::Backend(_) | SearchError::InvalidExtent(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
