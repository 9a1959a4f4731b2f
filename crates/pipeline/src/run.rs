use crate::error::{PipelineError, Result};
use prospect_core::{CoreError, SCORE_MAX, SCORE_MIN};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Pipeline stages in execution order, plus the terminal marker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Discover,
    Enrich,
    Evaluate,
    Act,
    Done,
}

impl PipelinePhase {
    pub fn next(self) -> Self {
        match self {
            Self::Discover => Self::Enrich,
            Self::Enrich => Self::Evaluate,
            Self::Evaluate => Self::Act,
            Self::Act | Self::Done => Self::Done,
        }
    }

    fn slot(self) -> Option<usize> {
        match self {
            Self::Discover => Some(0),
            Self::Enrich => Some(1),
            Self::Evaluate => Some(2),
            Self::Act => Some(3),
            Self::Done => None,
        }
    }
}

/// Uniform per-phase output record. `score` is present once a phase has
/// quality information attached (evaluation output, typically).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseItem {
    pub key: String,
    pub label: String,
    pub score: Option<f64>,
    pub data: serde_json::Value,
}

impl PhaseItem {
    pub fn new(key: impl Into<String>, label: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            score: None,
            data,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PhaseStats {
    pub count: usize,
    pub scored: usize,
    pub above_threshold: usize,
    pub average_score: f64,
}

impl PhaseStats {
    fn compute(items: &[PhaseItem], threshold: f64) -> Self {
        let scores: Vec<f64> = items.iter().filter_map(|i| i.score).collect();
        let above = scores.iter().filter(|s| **s >= threshold).count();
        let average = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        Self {
            count: items.len(),
            scored: scores.len(),
            above_threshold: above,
            average_score: average,
        }
    }
}

/// One entry in the append-only phase-transition history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseTransition {
    pub phase: PipelinePhase,
    pub at: SystemTime,
    pub elapsed_since_start: Duration,
}

/// Lightweight response to a phase-result write.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhaseSummary {
    pub phase: PipelinePhase,
    pub stats: PhaseStats,
    pub current_phase: PipelinePhase,
    pub ready_for_next: bool,
}

/// Read-only progress snapshot for an external UI/CLI.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunStatus {
    pub run_id: String,
    pub current_phase: PipelinePhase,
    pub discovered: usize,
    pub enriched: usize,
    pub evaluated: usize,
    pub acted: usize,
    pub elapsed_seconds: f64,
    pub ready_for_next: bool,
}

/// Everything the run produced, for external persistence.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunData {
    pub run_id: String,
    pub current_phase: PipelinePhase,
    pub discover: Vec<PhaseItem>,
    pub enrich: Vec<PhaseItem>,
    pub evaluate: Vec<PhaseItem>,
    pub act: Vec<PhaseItem>,
    pub stats: [PhaseStats; 4],
    pub transitions: Vec<PhaseTransition>,
    pub duration_seconds: f64,
}

struct RunState {
    run_id: String,
    started_at: Instant,
    started_wall: SystemTime,
    current: PipelinePhase,
    results: [Vec<PhaseItem>; 4],
    stats: [PhaseStats; 4],
    transitions: Vec<PhaseTransition>,
}

impl RunState {
    fn fresh() -> Self {
        Self {
            run_id: new_run_id(),
            started_at: Instant::now(),
            started_wall: SystemTime::now(),
            current: PipelinePhase::Discover,
            results: Default::default(),
            stats: Default::default(),
            transitions: Vec::new(),
        }
    }
}

/// Caller-owned state for one pipeline run.
///
/// Single writer (the phase driver), many readers: every getter returns a
/// snapshot, and the lock is never held across anything slower than the
/// in-memory mutation itself.
pub struct PipelineRun {
    quality_threshold: f64,
    target_count: usize,
    inner: RwLock<RunState>,
}

impl PipelineRun {
    pub fn new(quality_threshold: f64, target_count: usize) -> Result<Self> {
        if !(SCORE_MIN..=SCORE_MAX).contains(&quality_threshold) {
            return Err(PipelineError::CoreError(CoreError::InvalidConfiguration(
                format!("quality_threshold {quality_threshold} outside score range"),
            )));
        }
        if target_count == 0 {
            return Err(PipelineError::CoreError(CoreError::InvalidConfiguration(
                "target_count must be at least 1".into(),
            )));
        }
        Ok(Self {
            quality_threshold,
            target_count,
            inner: RwLock::new(RunState::fresh()),
        })
    }

    pub fn run_id(&self) -> String {
        self.read().run_id.clone()
    }

    pub fn current_phase(&self) -> PipelinePhase {
        self.read().current
    }

    pub fn quality_threshold(&self) -> f64 {
        self.quality_threshold
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Store a phase's output, recompute its statistics, append to the
    /// transition history, and advance the current phase.
    pub fn set_phase_result(
        &self,
        phase: PipelinePhase,
        items: Vec<PhaseItem>,
    ) -> Result<PhaseSummary> {
        let Some(slot) = phase.slot() else {
            return Err(PipelineError::InvalidPhase(
                "Done is terminal and has no result".into(),
            ));
        };

        let mut state = self.write();
        let stats = PhaseStats::compute(&items, self.quality_threshold);
        state.results[slot] = items;
        state.stats[slot] = stats;
        let elapsed_since_start = state.started_at.elapsed();
        state.transitions.push(PhaseTransition {
            phase,
            at: SystemTime::now(),
            elapsed_since_start,
        });
        let old = state.current;
        state.current = phase.next();
        log::info!(
            "pipeline {}: {:?} -> {:?} ({} items, {} above threshold)",
            state.run_id,
            old,
            state.current,
            stats.count,
            stats.above_threshold
        );

        let ready = self.phase_delivered(&state, phase);
        Ok(PhaseSummary {
            phase,
            stats,
            current_phase: state.current,
            ready_for_next: ready,
        })
    }

    pub fn get_phase_result(&self, phase: PipelinePhase) -> Vec<PhaseItem> {
        match phase.slot() {
            Some(slot) => self.read().results[slot].clone(),
            None => Vec::new(),
        }
    }

    pub fn phase_stats(&self, phase: PipelinePhase) -> PhaseStats {
        match phase.slot() {
            Some(slot) => self.read().stats[slot],
            None => PhaseStats::default(),
        }
    }

    /// Evaluation output at or above the acceptable threshold (or an
    /// explicit override), best first.
    pub fn quality_items(&self, min_threshold: Option<f64>) -> Vec<PhaseItem> {
        let threshold = min_threshold.unwrap_or(self.quality_threshold);
        let mut items: Vec<PhaseItem> = self
            .get_phase_result(PipelinePhase::Evaluate)
            .into_iter()
            .filter(|i| i.score.is_some_and(|s| s >= threshold))
            .collect();
        items.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        items
    }

    /// Whether the phase currently due can begin: its predecessor must have
    /// delivered. `Act` is always ready once reached.
    pub fn is_ready_for_next_phase(&self) -> bool {
        let state = self.read();
        self.ready_for_next_locked(&state)
    }

    pub fn status(&self) -> RunStatus {
        let state = self.read();
        RunStatus {
            run_id: state.run_id.clone(),
            current_phase: state.current,
            discovered: state.results[0].len(),
            enriched: state.results[1].len(),
            evaluated: state.results[2].len(),
            acted: state.results[3].len(),
            elapsed_seconds: state.started_at.elapsed().as_secs_f64(),
            ready_for_next: self.ready_for_next_locked(&state),
        }
    }

    pub fn complete_run_data(&self) -> RunData {
        let state = self.read();
        RunData {
            run_id: state.run_id.clone(),
            current_phase: state.current,
            discover: state.results[0].clone(),
            enrich: state.results[1].clone(),
            evaluate: state.results[2].clone(),
            act: state.results[3].clone(),
            stats: state.stats,
            transitions: state.transitions.clone(),
            duration_seconds: state.started_at.elapsed().as_secs_f64(),
        }
    }

    /// Start over with a fresh run id; clears all phase results and the
    /// transition history in one step, never partially.
    pub fn reset(&self) -> String {
        let mut state = self.write();
        *state = RunState::fresh();
        log::info!("pipeline reset, new run {}", state.run_id);
        state.run_id.clone()
    }

    pub fn started_wall(&self) -> SystemTime {
        self.read().started_wall
    }

    /// Phase-specific delivery predicate: discover/enrich need any output,
    /// evaluate needs at least one acceptable item, act is terminal.
    fn phase_delivered(&self, state: &RunState, phase: PipelinePhase) -> bool {
        match phase {
            PipelinePhase::Discover => !state.results[0].is_empty(),
            PipelinePhase::Enrich => !state.results[1].is_empty(),
            PipelinePhase::Evaluate => state.results[2]
                .iter()
                .any(|i| i.score.is_some_and(|s| s >= self.quality_threshold)),
            PipelinePhase::Act | PipelinePhase::Done => true,
        }
    }

    fn ready_for_next_locked(&self, state: &RunState) -> bool {
        match state.current {
            PipelinePhase::Discover => false,
            PipelinePhase::Enrich => self.phase_delivered(state, PipelinePhase::Discover),
            PipelinePhase::Evaluate => self.phase_delivered(state, PipelinePhase::Enrich),
            PipelinePhase::Act => self.phase_delivered(state, PipelinePhase::Evaluate),
            PipelinePhase::Done => true,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RunState> {
        self.inner.read().expect("pipeline state lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RunState> {
        self.inner.write().expect("pipeline state lock poisoned")
    }
}

fn new_run_id() -> String {
    // Counter suffix keeps ids unique when runs start within the same
    // millisecond.
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("run-{millis}-{}", SEQ.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(key: &str, score: Option<f64>) -> PhaseItem {
        let item = PhaseItem::new(key, "label", serde_json::json!({}));
        match score {
            Some(s) => item.with_score(s),
            None => item,
        }
    }

    fn run() -> PipelineRun {
        PipelineRun::new(6.0, 5).expect("run")
    }

    #[test]
    fn construction_validates_inputs() {
        assert!(PipelineRun::new(11.0, 5).is_err());
        assert!(PipelineRun::new(6.0, 0).is_err());
    }

    #[test]
    fn phases_advance_linearly() {
        let run = run();
        assert_eq!(run.current_phase(), PipelinePhase::Discover);
        assert!(!run.is_ready_for_next_phase());

        run.set_phase_result(PipelinePhase::Discover, vec![item("a", None)])
            .expect("discover");
        assert_eq!(run.current_phase(), PipelinePhase::Enrich);
        assert!(run.is_ready_for_next_phase());

        run.set_phase_result(PipelinePhase::Enrich, vec![item("a", None)])
            .expect("enrich");
        run.set_phase_result(PipelinePhase::Evaluate, vec![item("a", Some(7.0))])
            .expect("evaluate");
        assert_eq!(run.current_phase(), PipelinePhase::Act);
        assert!(run.is_ready_for_next_phase());

        run.set_phase_result(PipelinePhase::Act, vec![item("a", None)])
            .expect("act");
        assert_eq!(run.current_phase(), PipelinePhase::Done);
        assert!(run.is_ready_for_next_phase());
    }

    #[test]
    fn done_phase_rejects_results() {
        let run = run();
        assert!(matches!(
            run.set_phase_result(PipelinePhase::Done, vec![]),
            Err(PipelineError::InvalidPhase(_))
        ));
    }

    #[test]
    fn evaluate_readiness_requires_an_acceptable_item() {
        let run = run();
        run.set_phase_result(PipelinePhase::Discover, vec![item("a", None)])
            .expect("discover");
        run.set_phase_result(PipelinePhase::Enrich, vec![item("a", None)])
            .expect("enrich");

        // Everything below the 6.0 threshold: not ready to act.
        let summary = run
            .set_phase_result(
                PipelinePhase::Evaluate,
                vec![item("a", Some(4.0)), item("b", Some(5.9))],
            )
            .expect("evaluate");
        assert!(!summary.ready_for_next);
        assert!(!run.is_ready_for_next_phase());
        assert_eq!(summary.stats.above_threshold, 0);
        assert_eq!(summary.stats.scored, 2);
    }

    #[test]
    fn phase_stats_count_scored_and_above_threshold() {
        let run = run();
        let summary = run
            .set_phase_result(
                PipelinePhase::Evaluate,
                vec![
                    item("a", Some(8.0)),
                    item("b", Some(6.0)),
                    item("c", Some(2.0)),
                    item("d", None),
                ],
            )
            .expect("evaluate");
        assert_eq!(summary.stats.count, 4);
        assert_eq!(summary.stats.scored, 3);
        // 6.0 is inclusive.
        assert_eq!(summary.stats.above_threshold, 2);
        assert!((summary.stats.average_score - 16.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn quality_items_filter_and_rank() {
        let run = run();
        run.set_phase_result(
            PipelinePhase::Evaluate,
            vec![
                item("low", Some(3.0)),
                item("mid", Some(6.5)),
                item("high", Some(9.0)),
                item("unscored", None),
            ],
        )
        .expect("evaluate");

        let keys: Vec<String> = run
            .quality_items(None)
            .into_iter()
            .map(|i| i.key)
            .collect();
        assert_eq!(keys, vec!["high", "mid"]);

        let relaxed: Vec<String> = run
            .quality_items(Some(3.0))
            .into_iter()
            .map(|i| i.key)
            .collect();
        assert_eq!(relaxed, vec!["high", "mid", "low"]);
    }

    #[test]
    fn transition_history_is_append_only_and_ordered() {
        let run = run();
        run.set_phase_result(PipelinePhase::Discover, vec![item("a", None)])
            .expect("discover");
        run.set_phase_result(PipelinePhase::Enrich, vec![item("a", None)])
            .expect("enrich");

        let data = run.complete_run_data();
        let phases: Vec<PipelinePhase> = data.transitions.iter().map(|t| t.phase).collect();
        assert_eq!(phases, vec![PipelinePhase::Discover, PipelinePhase::Enrich]);
        assert!(data.transitions[0].elapsed_since_start <= data.transitions[1].elapsed_since_start);
    }

    #[test]
    fn status_is_a_lightweight_snapshot() {
        let run = run();
        run.set_phase_result(
            PipelinePhase::Discover,
            vec![item("a", None), item("b", None)],
        )
        .expect("discover");

        let status = run.status();
        assert_eq!(status.discovered, 2);
        assert_eq!(status.enriched, 0);
        assert_eq!(status.current_phase, PipelinePhase::Enrich);
        assert!(status.ready_for_next);
        assert_eq!(status.run_id, run.run_id());
    }

    #[test]
    fn reset_clears_everything_and_changes_run_id() {
        let run = run();
        let original_id = run.run_id();
        run.set_phase_result(PipelinePhase::Discover, vec![item("a", None)])
            .expect("discover");

        let new_id = run.reset();
        assert_ne!(new_id, original_id);
        assert_eq!(run.current_phase(), PipelinePhase::Discover);
        assert!(run.get_phase_result(PipelinePhase::Discover).is_empty());
        assert!(run.complete_run_data().transitions.is_empty());
    }

    #[test]
    fn serializes_for_external_persistence() {
        let run = run();
        run.set_phase_result(PipelinePhase::Discover, vec![item("a", Some(7.0))])
            .expect("discover");
        let json = serde_json::to_value(run.complete_run_data()).expect("serialize");
        assert_eq!(json["current_phase"], "enrich");
        assert_eq!(json["discover"][0]["key"], "a");
    }
}
