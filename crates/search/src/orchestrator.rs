use crate::error::{Result, SearchError};
use crate::fetcher::Fetcher;
use prospect_core::{Candidate, QualityStats, ReadinessGates, ScoredCandidate};
use prospect_rank::{
    BudgetController, ExtendReason, QualityAnalyzer, RankingHeap, ScoreContext, Scorer,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Consecutive empty (or failed) pages treated as "no more results".
const EMPTY_PAGE_STOP: u32 = 2;

const DEFAULT_SCORE_CONCURRENCY: usize = 4;

/// Search run state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    Idle,
    Paging,
    Extending,
    Plateaued,
    BudgetExhausted,
    TargetMet,
    Stopped,
}

/// Why the run ended. Budget and plateau stops are normal outcomes, not
/// errors; the heap contents are returned in every case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    TargetMet,
    Plateaued,
    BudgetExhausted,
    NoMoreResults,
    Cancelled,
}

/// Cooperative cancellation flag, observed between pages only.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Final output of one exploration run: the ranked top-K plus the audit
/// numbers a caller needs to judge how the run went.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome<P> {
    /// Ranked candidates, best first.
    pub candidates: Vec<ScoredCandidate<P>>,

    pub pages_searched: u32,
    pub terminal_reason: TerminalReason,
    pub stats: QualityStats,
    pub candidates_evaluated: usize,

    /// Candidates scored by the local fallback because the scorer failed.
    pub fallback_scored: usize,

    /// Pages whose fetch failed and were absorbed as empty.
    pub pages_failed: usize,

    /// True when any transient failure was absorbed during the run.
    pub degraded: bool,
}

/// Drives the page-by-page exploration loop.
///
/// Sequential across pages: each page's candidates are scored and inserted
/// into the heap before the budget decision for the next page. Scoring
/// within a page fans out to a semaphore-bounded worker pool; a page's
/// candidates are sorted by identity key before insertion so tie-break
/// ordering is reproducible regardless of scoring completion order.
pub struct SearchOrchestrator<P> {
    fetcher: Arc<dyn Fetcher<P>>,
    analyzer: Arc<QualityAnalyzer<P>>,
    controller: BudgetController,
    heap: RankingHeap<P>,
    gates: ReadinessGates,
    score_concurrency: usize,
    state: SearchState,
}

impl<P: Clone + Send + Sync + 'static> SearchOrchestrator<P> {
    /// The heap's minimum acceptable score comes from the controller's
    /// thresholds; capacity should be oversized relative to the number of
    /// results the caller actually wants (2-3x) so recovery can reuse
    /// next-best entries without another search.
    pub fn new(
        fetcher: Arc<dyn Fetcher<P>>,
        scorer: Arc<dyn Scorer<P>>,
        controller: BudgetController,
        gates: ReadinessGates,
        heap_capacity: usize,
    ) -> Result<Self> {
        gates.validate()?;
        let heap = RankingHeap::new(heap_capacity, controller.thresholds().minimum_acceptable)?;
        Ok(Self {
            fetcher,
            analyzer: Arc::new(QualityAnalyzer::new(scorer)),
            controller,
            heap,
            gates,
            score_concurrency: DEFAULT_SCORE_CONCURRENCY,
            state: SearchState::Idle,
        })
    }

    /// Bound the in-page scoring fan-out (external rate limits).
    pub fn with_score_concurrency(mut self, workers: usize) -> Self {
        self.score_concurrency = workers.max(1);
        self
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn heap(&self) -> &RankingHeap<P> {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut RankingHeap<P> {
        &mut self.heap
    }

    pub fn into_heap(self) -> RankingHeap<P> {
        self.heap
    }

    pub fn analyzer(&self) -> &QualityAnalyzer<P> {
        &self.analyzer
    }

    pub fn controller_mut(&mut self) -> &mut BudgetController {
        &mut self.controller
    }

    /// Run the exploration loop to a terminal state. Partial results are
    /// always valid output: cancellation, budget exhaustion, and source
    /// exhaustion all return whatever the heap holds.
    pub async fn run(&mut self, ctx: &ScoreContext, cancel: &CancelHandle) -> Result<SearchOutcome<P>> {
        if self.state != SearchState::Idle {
            return Err(SearchError::InvalidState(format!(
                "run() requires Idle state, currently {:?}",
                self.state
            )));
        }
        self.transition(SearchState::Paging);

        let started = Instant::now();
        let mut pages_searched: u32 = 0;
        let mut pages_failed: usize = 0;
        let mut empty_streak: u32 = 0;

        let reason = loop {
            if cancel.is_cancelled() {
                log::info!("search cancelled after {pages_searched} pages");
                break TerminalReason::Cancelled;
            }
            if started.elapsed() >= self.controller.budget().max_wall_clock {
                log::info!("wall-clock budget spent after {pages_searched} pages");
                break TerminalReason::BudgetExhausted;
            }
            if pages_searched >= self.controller.budget().max_page_limit {
                break TerminalReason::BudgetExhausted;
            }
            let eval_remaining = self
                .controller
                .budget()
                .max_candidates_evaluated
                .saturating_sub(self.analyzer.evaluated_count());
            if eval_remaining == 0 {
                log::info!("candidate evaluation budget spent");
                break TerminalReason::BudgetExhausted;
            }

            let page_index = pages_searched;
            let mut raw = match self.fetcher.fetch_page(&ctx.query, page_index).await {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("page {page_index} fetch failed, treating as empty: {e}");
                    pages_failed += 1;
                    Vec::new()
                }
            };
            pages_searched += 1;

            if raw.is_empty() {
                empty_streak += 1;
                log::debug!("page {page_index} empty ({empty_streak} consecutive)");
                if empty_streak >= EMPTY_PAGE_STOP {
                    break TerminalReason::NoMoreResults;
                }
                continue;
            }
            empty_streak = 0;

            raw.truncate(eval_remaining);
            // Deterministic tie-break order regardless of fan-out timing.
            raw.sort_by(|a, b| a.identity_key().cmp(&b.identity_key()));

            let scored = self.score_page(raw, ctx).await;
            let mut accepted = 0usize;
            for candidate in scored {
                if self.heap.add(candidate).accepted() {
                    accepted += 1;
                }
            }
            log::debug!(
                "page {page_index}: {accepted} accepted, heap {}/{} (avg {:.1})",
                self.heap.len(),
                self.heap.capacity(),
                self.heap.stats().average
            );

            if pages_searched < self.controller.budget().initial_page_limit {
                continue;
            }

            // Plateau takes precedence over extension to bound wasted
            // exploration.
            let window = self.controller.thresholds().plateau_window;
            if self
                .controller
                .detect_plateau(&self.analyzer.recent_scores(window))
            {
                break TerminalReason::Plateaued;
            }

            let decision = self.controller.should_extend(&self.heap.stats(), pages_searched);
            match decision.reason {
                ExtendReason::HitPageLimit => break TerminalReason::BudgetExhausted,
                ExtendReason::QualitySufficient => {
                    let ready = self.controller.is_ready_for_next_phase(&self.heap, &self.gates);
                    if ready.ready {
                        break TerminalReason::TargetMet;
                    }
                    log::debug!("quality sufficient but not ready: {:?}", ready.reason);
                }
                ExtendReason::InsufficientQuality | ExtendReason::InsufficientCount => {
                    log::debug!("extending search: {:?}", decision.reason);
                    self.transition(SearchState::Extending);
                }
            }
        };

        match reason {
            TerminalReason::TargetMet => self.transition(SearchState::TargetMet),
            TerminalReason::Plateaued => self.transition(SearchState::Plateaued),
            TerminalReason::BudgetExhausted => self.transition(SearchState::BudgetExhausted),
            TerminalReason::NoMoreResults | TerminalReason::Cancelled => {}
        }
        self.transition(SearchState::Stopped);

        let candidates: Vec<ScoredCandidate<P>> = self.heap.top(None).cloned().collect();
        let fallback_scored = self.analyzer.fallback_count();
        let outcome = SearchOutcome {
            stats: self.heap.stats(),
            candidates,
            pages_searched,
            terminal_reason: reason,
            candidates_evaluated: self.analyzer.evaluated_count(),
            fallback_scored,
            pages_failed,
            degraded: pages_failed > 0 || fallback_scored > 0,
        };
        log::info!(
            "search stopped: {:?} after {} pages, {} ranked, degraded={}",
            outcome.terminal_reason,
            outcome.pages_searched,
            outcome.candidates.len(),
            outcome.degraded
        );
        Ok(outcome)
    }

    /// Score one page's candidates through a bounded fan-out, restoring
    /// input order on fan-in.
    async fn score_page(
        &self,
        raw: Vec<Candidate<P>>,
        ctx: &ScoreContext,
    ) -> Vec<ScoredCandidate<P>> {
        let semaphore = Arc::new(Semaphore::new(self.score_concurrency));
        let mut join = JoinSet::new();

        for (idx, candidate) in raw.into_iter().enumerate() {
            let analyzer = Arc::clone(&self.analyzer);
            let semaphore = Arc::clone(&semaphore);
            let ctx = ctx.clone();
            join.spawn(async move {
                // The semaphore is never closed; acquire failures are not
                // expected.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .unwrap_or_else(|_| unreachable!("scoring semaphore closed"));
                (idx, analyzer.assess_and_record(&candidate, &ctx).await)
            });
        }

        let mut scored = Vec::new();
        while let Some(result) = join.join_next().await {
            match result {
                Ok(pair) => scored.push(pair),
                Err(e) => log::warn!("scoring task failed: {e}"),
            }
        }
        scored.sort_by_key(|(idx, _)| *idx);
        scored.into_iter().map(|(_, s)| s).collect()
    }

    fn transition(&mut self, next: SearchState) {
        if self.state != next {
            log::debug!("search state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
