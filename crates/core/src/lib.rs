//! # Prospect Core
//!
//! Shared data model for the adaptive quality-budgeted ranking engine.
//!
//! ## Architecture
//!
//! ```text
//! Candidate<P>
//!     │
//!     ├──> normalize_identity_key()
//!     │      └─> dedup comparisons
//!     │
//!     ├──> ScoredCandidate<P>
//!     │      └─> score + components + timestamp
//!     │
//!     └──> QualityStats
//!            └─> budget / readiness decisions
//! ```
//!
//! Configuration types (`SearchBudget`, `QualityThresholds`, `ReadinessGates`,
//! `SearchStrategy`) are validated at construction; invalid values are
//! rejected immediately rather than surfacing mid-run.

mod candidate;
mod config;
mod error;
mod stats;
mod strategy;

pub use candidate::{normalize_identity_key, Candidate, ScoredCandidate, SCORE_MAX, SCORE_MIN};
pub use config::{QualityThresholds, ReadinessGates, SearchBudget};
pub use error::{CoreError, Result};
pub use stats::QualityStats;
pub use strategy::SearchStrategy;
