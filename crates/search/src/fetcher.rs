use crate::error::Result;
use async_trait::async_trait;
use prospect_core::Candidate;

/// Injected paging capability: turns a query and page index into raw
/// candidate records.
///
/// An empty page means the source may have run out of results; the
/// orchestrator treats consecutive empty pages as a stop signal. Fetch
/// errors are absorbed as empty pages; any per-page retrying belongs to the
/// implementation, not the exploration loop.
#[async_trait]
pub trait Fetcher<P>: Send + Sync {
    async fn fetch_page(&self, query: &str, page_index: u32) -> Result<Vec<Candidate<P>>>;
}
