pub mod body;
pub mod build;
pub mod memory;
pub mod types;

pub use body::{Field, NeedleProperty, Predicate, SearchQuery, SearchRequest, Sort};
pub use memory::MemoryIndex;
pub use types::*;

use crate::error::BackendError;

/// Records returned for one request
#[derive(Debug, Clone, Default)]
pub struct SearchHits {
    /// Number of matching records, regardless of offset and limit
    pub total: u64,
    pub records: Vec<Record>,
}

/// A search index that can answer structured requests.
///
/// Calls are blocking. A body the backend cannot interpret must be reported
/// as [`BackendError::Malformed`] so the caller can surface it to the user.
pub trait SearchBackend: Send + Sync {
    fn search(&self, request: &SearchRequest) -> Result<SearchHits, BackendError>;
}

impl<T: SearchBackend + ?Sized> SearchBackend for &T {
    fn search(&self, request: &SearchRequest) -> Result<SearchHits, BackendError> {
        (**self).search(request)
    }
}

impl<T: SearchBackend + ?Sized> SearchBackend for std::sync::Arc<T> {
    fn search(&self, request: &SearchRequest) -> Result<SearchHits, BackendError> {
        (**self).search(request)
    }
}
