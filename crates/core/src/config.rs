use crate::candidate::{SCORE_MAX, SCORE_MIN};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Search effort ceilings for one exploration run.
///
/// Constructed once per invocation and immutable during the run except for
/// [`SearchBudget::extend_pages`], which may raise the page limit up to the
/// hard ceiling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchBudget {
    /// Pages always searched before any stop decision is considered.
    pub initial_page_limit: u32,

    /// Current page ceiling; extendable up to `hard_page_ceiling`.
    pub max_page_limit: u32,

    /// Absolute page ceiling that no extension may exceed.
    pub hard_page_ceiling: u32,

    /// Total wall-clock budget, checked at page boundaries.
    pub max_wall_clock: Duration,

    /// Maximum number of candidates submitted to the scorer.
    pub max_candidates_evaluated: usize,

    /// Minimum heap population before quality alone can stop the search.
    pub min_acceptable_count: usize,

    /// Average heap quality below which the search keeps extending.
    pub low_quality_threshold: f64,
}

impl SearchBudget {
    pub fn validate(&self) -> Result<()> {
        if self.initial_page_limit == 0 {
            return Err(CoreError::InvalidConfiguration(
                "initial_page_limit must be at least 1".into(),
            ));
        }
        if self.initial_page_limit > self.max_page_limit {
            return Err(CoreError::InvalidConfiguration(format!(
                "initial_page_limit {} exceeds max_page_limit {}",
                self.initial_page_limit, self.max_page_limit
            )));
        }
        if self.max_page_limit > self.hard_page_ceiling {
            return Err(CoreError::InvalidConfiguration(format!(
                "max_page_limit {} exceeds hard_page_ceiling {}",
                self.max_page_limit, self.hard_page_ceiling
            )));
        }
        if self.max_candidates_evaluated == 0 {
            return Err(CoreError::InvalidConfiguration(
                "max_candidates_evaluated must be at least 1".into(),
            ));
        }
        if self.max_wall_clock.is_zero() {
            return Err(CoreError::InvalidConfiguration(
                "max_wall_clock must be non-zero".into(),
            ));
        }
        if !(SCORE_MIN..=SCORE_MAX).contains(&self.low_quality_threshold) {
            return Err(CoreError::InvalidConfiguration(format!(
                "low_quality_threshold {} outside score range",
                self.low_quality_threshold
            )));
        }
        Ok(())
    }

    /// Raise the page limit by up to `extra` pages, clamped to the hard
    /// ceiling. Returns the number of pages actually granted.
    pub fn extend_pages(&mut self, extra: u32) -> u32 {
        let headroom = self.hard_page_ceiling - self.max_page_limit;
        let granted = extra.min(headroom);
        self.max_page_limit += granted;
        granted
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            initial_page_limit: 3,
            max_page_limit: 8,
            hard_page_ceiling: 12,
            max_wall_clock: Duration::from_secs(20 * 60),
            max_candidates_evaluated: 100,
            min_acceptable_count: 3,
            low_quality_threshold: 4.0,
        }
    }
}

/// Quality tiers and plateau-detection parameters. Immutable per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityThresholds {
    /// Baseline worth considering at all.
    pub minimum_acceptable: f64,

    /// What a good candidate looks like.
    pub target_quality: f64,

    /// Outstanding; auto-include territory.
    pub exceptional_quality: f64,

    /// Trailing sample count inspected for plateau detection.
    pub plateau_window: usize,

    /// Minimum mean improvement between window halves to keep exploring.
    pub plateau_improvement_threshold: f64,
}

impl QualityThresholds {
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f64| (SCORE_MIN..=SCORE_MAX).contains(&v);
        if !in_range(self.minimum_acceptable)
            || !in_range(self.target_quality)
            || !in_range(self.exceptional_quality)
        {
            return Err(CoreError::InvalidConfiguration(
                "quality thresholds must lie within the score range".into(),
            ));
        }
        if self.minimum_acceptable > self.target_quality
            || self.target_quality > self.exceptional_quality
        {
            return Err(CoreError::InvalidConfiguration(
                "thresholds must be ordered minimum <= target <= exceptional".into(),
            ));
        }
        if self.plateau_window < 2 || self.plateau_window % 2 != 0 {
            return Err(CoreError::InvalidConfiguration(format!(
                "plateau_window {} must be an even number >= 2",
                self.plateau_window
            )));
        }
        if self.plateau_improvement_threshold < 0.0 {
            return Err(CoreError::InvalidConfiguration(
                "plateau_improvement_threshold must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            minimum_acceptable: 4.0,
            target_quality: 7.0,
            exceptional_quality: 9.0,
            plateau_window: 10,
            plateau_improvement_threshold: 0.5,
        }
    }
}

/// Gates that must all pass before the pipeline advances past discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadinessGates {
    pub min_candidates: usize,
    pub quality_floor: f64,

    /// Minimum heap capacity utilization in percent.
    pub min_capacity_pct: f64,
}

impl ReadinessGates {
    pub fn validate(&self) -> Result<()> {
        if !(SCORE_MIN..=SCORE_MAX).contains(&self.quality_floor) {
            return Err(CoreError::InvalidConfiguration(format!(
                "quality_floor {} outside score range",
                self.quality_floor
            )));
        }
        if !(0.0..=100.0).contains(&self.min_capacity_pct) {
            return Err(CoreError::InvalidConfiguration(format!(
                "min_capacity_pct {} outside 0..=100",
                self.min_capacity_pct
            )));
        }
        Ok(())
    }
}

impl Default for ReadinessGates {
    fn default() -> Self {
        Self {
            min_candidates: 3,
            quality_floor: 5.0,
            min_capacity_pct: 25.0,
        }
    }
}
