//! # Prospect Rank
//!
//! Bounded top-K ranking over scored candidates, plus the budget controller
//! that decides when exploration should stop, extend, or hand off to the
//! next pipeline phase.
//!
//! ## Architecture
//!
//! ```text
//! Candidate<P>
//!     │
//!     ├──> QualityAnalyzer (wraps injected Scorer, keeps score history)
//!     │      └─> ScoredCandidate<P>
//!     │
//!     ├──> RankingHeap (bounded, deduplicated, eviction on strict-better)
//!     │
//!     └──> BudgetController
//!            ├─> should_extend (page budget vs. quality)
//!            ├─> detect_plateau (trailing-window improvement)
//!            └─> is_ready_for_next_phase (count / quality / utilization)
//! ```

mod analyzer;
mod budget;
mod error;
mod heap;
mod strategy_scorer;

pub use analyzer::{Assessment, QualityAnalyzer, ScoreContext, Scorer};
pub use budget::{BudgetController, ExtendDecision, ExtendReason, ReadyDecision, ReadyReason};
pub use error::{RankError, Result};
pub use heap::{AddOutcome, RankingHeap};
pub use strategy_scorer::StrategyScorer;
