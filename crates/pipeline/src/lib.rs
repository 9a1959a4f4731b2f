//! # Prospect Pipeline
//!
//! Run-scoped state for the discover → enrich → evaluate → act pipeline,
//! plus the recovery planner consulted when evaluation under-delivers.
//!
//! ## Data flow
//!
//! ```text
//! search outcome ──> PipelineRun (Discover)
//!                        │
//!     [external enrichment] ──> PipelineRun (Enrich)
//!                        │
//!     [external evaluation] ──> PipelineRun (Evaluate)
//!                        │
//!                 shortfall? ──> RecoveryPlanner
//!                        │            ├─> ReuseHeapBackups
//!                        │            ├─> ExpandSearchScope
//!                        │            └─> RelaxThresholds
//!                        └──> PipelineRun (Act)
//! ```
//!
//! `PipelineRun` is caller-owned with an explicit `new()`/`reset()`
//! lifecycle: no process-wide singleton, no hidden cross-test state.

mod error;
mod recovery;
mod run;

pub use error::{PipelineError, Result};
pub use recovery::{plan_recovery, EvaluationStats, RecoveryAction, RecoveryDirective, RecoveryInputs};
pub use run::{
    PhaseItem, PhaseStats, PhaseSummary, PhaseTransition, PipelinePhase, PipelineRun, RunData,
    RunStatus,
};
