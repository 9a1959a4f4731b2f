//! # Prospect Search
//!
//! Page-by-page exploration loop driving candidates from an injected
//! [`Fetcher`] through scoring into the bounded ranking heap, with the
//! budget controller consulted after every page.
//!
//! ## Run lifecycle
//!
//! ```text
//! Idle ──> Paging ──> { Extending | Plateaued | BudgetExhausted | TargetMet } ──> Stopped
//! ```
//!
//! The loop is sequential across pages (each budget decision depends on the
//! cumulative heap statistics), while scoring **within** a page fans out to
//! a bounded worker pool. Cancellation and the wall-clock budget are checked
//! only at page boundaries; partial results are always valid output.

mod error;
mod fetcher;
mod orchestrator;

pub use error::{Result, SearchError};
pub use fetcher::Fetcher;
pub use orchestrator::{
    CancelHandle, SearchOrchestrator, SearchOutcome, SearchState, TerminalReason,
};
