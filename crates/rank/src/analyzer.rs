use crate::error::Result;
use crate::strategy_scorer::assess_label;
use async_trait::async_trait;
use prospect_core::{Candidate, QualityStats, ScoredCandidate, SearchStrategy, SCORE_MAX, SCORE_MIN};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Raw scorer output: an overall score plus named components. The analyzer
/// stamps the timestamp and builds the final [`ScoredCandidate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub score: f64,
    pub components: BTreeMap<String, f64>,
}

/// Context handed to every scoring call: the search query and the resolved
/// strategy, shared across the run.
#[derive(Debug, Clone)]
pub struct ScoreContext {
    pub query: String,
    pub strategy: Arc<SearchStrategy>,
}

impl ScoreContext {
    pub fn new(query: impl Into<String>, strategy: Arc<SearchStrategy>) -> Self {
        Self {
            query: query.into(),
            strategy,
        }
    }
}

/// Injected scoring capability. Implementations may be rule-based or call
/// out to an external evaluator; transient failures are recoverable errors
/// and never abort the run.
#[async_trait]
pub trait Scorer<P>: Send + Sync {
    async fn assess(&self, candidate: &Candidate<P>, ctx: &ScoreContext) -> Result<Assessment>;
}

/// Wraps an injected [`Scorer`], tracks score history across the run, and
/// substitutes a local heuristic score when the scorer is degraded.
///
/// Never caches by identity: deduplication is the heap's responsibility.
/// Shareable across a page's scoring fan-out; the history lock is held only
/// for the in-memory append, never across a scorer call.
pub struct QualityAnalyzer<P> {
    scorer: Arc<dyn Scorer<P>>,
    history: Mutex<Vec<f64>>,
    fallback_scored: AtomicUsize,
}

impl<P: Clone + Send + Sync> QualityAnalyzer<P> {
    pub fn new(scorer: Arc<dyn Scorer<P>>) -> Self {
        Self {
            scorer,
            history: Mutex::new(Vec::new()),
            fallback_scored: AtomicUsize::new(0),
        }
    }

    /// Score one candidate, calling the scorer exactly once, and append the
    /// result to the run's score history.
    ///
    /// A scorer failure is absorbed: the candidate gets a fallback score
    /// from cheap label heuristics so the exploration loop keeps making
    /// forward progress.
    pub async fn assess_and_record(
        &self,
        candidate: &Candidate<P>,
        ctx: &ScoreContext,
    ) -> ScoredCandidate<P> {
        let assessment = match self.scorer.assess(candidate, ctx).await {
            Ok(a) => Assessment {
                score: a.score.clamp(SCORE_MIN, SCORE_MAX),
                components: a.components,
            },
            Err(e) => {
                log::warn!(
                    "scorer failed for '{}', using fallback heuristics: {e}",
                    candidate.identity
                );
                self.fallback_scored.fetch_add(1, Ordering::Relaxed);
                fallback_assessment(candidate, &ctx.strategy)
            }
        };

        self.history
            .lock()
            .expect("score history lock poisoned")
            .push(assessment.score);
        ScoredCandidate::new(candidate.clone(), assessment.score, assessment.components)
    }

    /// Snapshot of the append-only score history, in assessment order.
    pub fn history(&self) -> Vec<f64> {
        self.history
            .lock()
            .expect("score history lock poisoned")
            .clone()
    }

    /// The trailing `n` scores (fewer if the run is young).
    pub fn recent_scores(&self, n: usize) -> Vec<f64> {
        let history = self.history.lock().expect("score history lock poisoned");
        let start = history.len().saturating_sub(n);
        history[start..].to_vec()
    }

    pub fn history_stats(&self) -> QualityStats {
        QualityStats::from_scores(&self.history())
    }

    pub fn evaluated_count(&self) -> usize {
        self.history
            .lock()
            .expect("score history lock poisoned")
            .len()
    }

    pub fn fallback_count(&self) -> usize {
        self.fallback_scored.load(Ordering::Relaxed)
    }
}

/// Local heuristic assessment used when the injected scorer is degraded.
/// Marked with a `fallback` component so downstream consumers can tell
/// substituted scores apart.
fn fallback_assessment<P>(candidate: &Candidate<P>, strategy: &SearchStrategy) -> Assessment {
    let mut assessment = assess_label(candidate, strategy);
    assessment.components.insert("fallback".into(), 1.0);
    assessment
}
