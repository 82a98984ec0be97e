//! Service operations behind the HTTP surface.
//!
//! Every function takes an [`ApiContext`] and returns `Result<_, ApiError>`.
//! Expected misses are reported as values (`Option`, `bool`, a specific
//! [`ErrorCode`]); only unexpected store failures become
//! [`ErrorCode::Internal`].

use shared::{
    error::{ApiError, ErrorCode},
    pagination::DEFAULT_PAGE_SIZE,
};
use storage::Storage;

pub mod campaigns;
pub mod lists;
pub mod templates;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    /// Page size used when a request does not name one.
    pub page_size: u32,
}

impl ApiContext {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %format!("{err:#}"), "store operation failed");
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
async fn test_context() -> ApiContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    ApiContext::new(storage)
}
