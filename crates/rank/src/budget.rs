use crate::error::Result;
use crate::heap::RankingHeap;
use prospect_core::{QualityStats, QualityThresholds, ReadinessGates, SearchBudget};
use serde::{Deserialize, Serialize};

/// Why the controller decided for or against extending the search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtendReason {
    /// Hard page ceiling reached; never extend, regardless of quality.
    HitPageLimit,
    InsufficientQuality,
    InsufficientCount,
    QualitySufficient,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExtendDecision {
    pub extend: bool,
    pub reason: ExtendReason,
}

/// First readiness gate that failed, or `Ready`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadyReason {
    Ready,
    InsufficientCandidates,
    LowAverageQuality,
    LowCapacityUtilization,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReadyDecision {
    pub ready: bool,
    pub reason: ReadyReason,
}

/// Holds the search budget and quality thresholds; decides continue / stop /
/// extend per page processed. All threshold comparisons are inclusive except
/// the heap's strict-greater replacement rule.
pub struct BudgetController {
    budget: SearchBudget,
    thresholds: QualityThresholds,
}

impl BudgetController {
    pub fn new(budget: SearchBudget, thresholds: QualityThresholds) -> Result<Self> {
        budget.validate()?;
        thresholds.validate()?;
        Ok(Self { budget, thresholds })
    }

    pub fn budget(&self) -> &SearchBudget {
        &self.budget
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Grant extra pages up to the hard ceiling; returns pages granted.
    pub fn extend_page_budget(&mut self, extra: u32) -> u32 {
        let granted = self.budget.extend_pages(extra);
        log::info!(
            "page budget extended by {granted} (limit now {})",
            self.budget.max_page_limit
        );
        granted
    }

    /// Decide whether another page is worth fetching given the cumulative
    /// heap statistics. The page limit is an unconditional stop.
    pub fn should_extend(&self, stats: &QualityStats, pages_searched: u32) -> ExtendDecision {
        if pages_searched >= self.budget.max_page_limit {
            return ExtendDecision {
                extend: false,
                reason: ExtendReason::HitPageLimit,
            };
        }
        if stats.average < self.budget.low_quality_threshold {
            return ExtendDecision {
                extend: true,
                reason: ExtendReason::InsufficientQuality,
            };
        }
        if stats.count < self.budget.min_acceptable_count {
            return ExtendDecision {
                extend: true,
                reason: ExtendReason::InsufficientCount,
            };
        }
        ExtendDecision {
            extend: false,
            reason: ExtendReason::QualitySufficient,
        }
    }

    /// Plateau: the second half of the trailing window improved on the first
    /// half by less than the configured threshold. Fewer samples than the
    /// window is insufficient evidence, never a plateau.
    pub fn detect_plateau(&self, recent_scores: &[f64]) -> bool {
        let window = self.thresholds.plateau_window;
        if recent_scores.len() < window {
            return false;
        }

        let tail = &recent_scores[recent_scores.len() - window..];
        let (first, second) = tail.split_at(window / 2);
        let mean = |s: &[f64]| s.iter().sum::<f64>() / s.len() as f64;

        let improvement = mean(second) - mean(first);
        improvement < self.thresholds.plateau_improvement_threshold
    }

    /// Three independent gates, all of which must pass before the pipeline
    /// advances. The reason names the first failing gate.
    pub fn is_ready_for_next_phase<P>(
        &self,
        heap: &RankingHeap<P>,
        gates: &ReadinessGates,
    ) -> ReadyDecision {
        if heap.len() < gates.min_candidates {
            return ReadyDecision {
                ready: false,
                reason: ReadyReason::InsufficientCandidates,
            };
        }
        if heap.stats().average < gates.quality_floor {
            return ReadyDecision {
                ready: false,
                reason: ReadyReason::LowAverageQuality,
            };
        }
        if heap.capacity_utilization() < gates.min_capacity_pct {
            return ReadyDecision {
                ready: false,
                reason: ReadyReason::LowCapacityUtilization,
            };
        }
        ReadyDecision {
            ready: true,
            reason: ReadyReason::Ready,
        }
    }
}
