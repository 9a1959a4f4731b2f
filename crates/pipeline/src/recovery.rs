use prospect_core::SCORE_MIN;
use serde::Serialize;

/// Heap lookahead cap when no quality candidates were found.
const BACKUP_LIMIT_CAP: usize = 6;

/// Extra backups pulled beyond the exact shortfall.
const SHORTFALL_SLACK: usize = 2;

/// Lookahead when the run is already close to target.
const CLOSE_LOOKAHEAD: usize = 3;

/// Pages granted to a search-scope expansion.
const EXPAND_PAGE_LIMIT: u32 = 3;

/// How far the minimum threshold drops when relaxation is the last resort.
const RELAX_STEP: f64 = 1.0;

/// What the caller should do next. A recommendation only: the planner never
/// executes anything itself.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    ProceedToAct,
    ReuseHeapBackups { offset: usize, limit: usize },
    ExpandSearchScope { start_page: u32, page_limit: u32 },
    RelaxThresholds { new_minimum: f64 },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecoveryDirective {
    #[serde(flatten)]
    pub action: RecoveryAction,

    /// Human-readable explanation built from the numbers that produced the
    /// decision; every recovery step must be auditable.
    pub reasoning: String,
}

/// Evaluation outcome numbers the planner decides on.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct EvaluationStats {
    pub total_evaluated: usize,
    pub above_threshold: usize,
}

/// Context about the search the evaluation came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RecoveryInputs {
    pub target_count: usize,
    pub min_threshold: f64,

    /// Unconsumed entries still buffered in the ranking heap.
    pub heap_remaining: usize,

    /// Where an expanded search would resume.
    pub last_searched_page: u32,

    /// False once the page budget has hit its hard ceiling.
    pub can_expand: bool,
}

/// Deterministic decision table over the evaluation numbers. No learning,
/// no randomness: every branch is explainable from its inputs.
pub fn plan_recovery(eval: &EvaluationStats, inputs: &RecoveryInputs) -> RecoveryDirective {
    let target = inputs.target_count;
    let above = eval.above_threshold;

    if above >= target {
        return directive(
            RecoveryAction::ProceedToAct,
            format!(
                "Found {above} quality candidates above threshold {:.1}, target {target} met",
                inputs.min_threshold
            ),
        );
    }

    if above == 0 {
        if inputs.heap_remaining >= target {
            return directive(
                RecoveryAction::ReuseHeapBackups {
                    offset: eval.total_evaluated,
                    limit: inputs.heap_remaining.min(BACKUP_LIMIT_CAP),
                },
                format!(
                    "No quality candidates found; {} remain in the heap (enough to meet target {target})",
                    inputs.heap_remaining
                ),
            );
        }
        return expand_or_relax(
            inputs,
            format!(
                "No quality candidates found and heap holds only {} of {target} needed",
                inputs.heap_remaining
            ),
        );
    }

    if above < target / 2 {
        let shortfall = target - above;
        if inputs.heap_remaining >= shortfall {
            return directive(
                RecoveryAction::ReuseHeapBackups {
                    offset: eval.total_evaluated,
                    limit: inputs.heap_remaining.min(shortfall + SHORTFALL_SLACK),
                },
                format!(
                    "Found {above}/{target} quality candidates; {} heap backups can cover the remaining {shortfall}",
                    inputs.heap_remaining
                ),
            );
        }
        return expand_or_relax(
            inputs,
            format!(
                "Found {above}/{target} quality candidates; heap holds {} but {shortfall} more are needed",
                inputs.heap_remaining
            ),
        );
    }

    directive(
        RecoveryAction::ReuseHeapBackups {
            offset: eval.total_evaluated,
            limit: CLOSE_LOOKAHEAD,
        },
        format!("Close to target with {above}/{target}; trying a few more from the heap"),
    )
}

/// Expansion when the page budget allows it; relaxing the threshold is the
/// last resort once the budget is spent.
fn expand_or_relax(inputs: &RecoveryInputs, context: String) -> RecoveryDirective {
    if inputs.can_expand {
        directive(
            RecoveryAction::ExpandSearchScope {
                start_page: inputs.last_searched_page,
                page_limit: EXPAND_PAGE_LIMIT,
            },
            format!(
                "{context}; expanding search from page {}",
                inputs.last_searched_page + 1
            ),
        )
    } else {
        let new_minimum = (inputs.min_threshold - RELAX_STEP).max(SCORE_MIN);
        directive(
            RecoveryAction::RelaxThresholds { new_minimum },
            format!(
                "{context}; page budget exhausted, relaxing minimum threshold {:.1} -> {new_minimum:.1}",
                inputs.min_threshold
            ),
        )
    }
}

fn directive(action: RecoveryAction, reasoning: String) -> RecoveryDirective {
    log::debug!("recovery plan: {action:?} ({reasoning})");
    RecoveryDirective { action, reasoning }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inputs(target: usize, heap_remaining: usize) -> RecoveryInputs {
        RecoveryInputs {
            target_count: target,
            min_threshold: 6.0,
            heap_remaining,
            last_searched_page: 3,
            can_expand: true,
        }
    }

    #[test]
    fn target_met_proceeds_to_act() {
        let plan = plan_recovery(
            &EvaluationStats {
                total_evaluated: 8,
                above_threshold: 5,
            },
            &inputs(5, 4),
        );
        assert_eq!(plan.action, RecoveryAction::ProceedToAct);
    }

    #[test]
    fn empty_result_with_deep_heap_reuses_backups() {
        let plan = plan_recovery(
            &EvaluationStats {
                total_evaluated: 4,
                above_threshold: 0,
            },
            &inputs(5, 7),
        );
        assert_eq!(
            plan.action,
            RecoveryAction::ReuseHeapBackups {
                offset: 4,
                limit: 6,
            }
        );
    }

    #[test]
    fn empty_result_with_shallow_heap_expands_search() {
        let plan = plan_recovery(
            &EvaluationStats {
                total_evaluated: 4,
                above_threshold: 0,
            },
            &inputs(5, 2),
        );
        assert_eq!(
            plan.action,
            RecoveryAction::ExpandSearchScope {
                start_page: 3,
                page_limit: 3,
            }
        );
        assert!(plan.reasoning.contains("expanding search from page 4"));
    }

    #[test]
    fn partial_shortfall_is_sized_to_the_gap() {
        // 1 of 6 found, shortfall 5, heap can cover it with slack.
        let plan = plan_recovery(
            &EvaluationStats {
                total_evaluated: 9,
                above_threshold: 1,
            },
            &inputs(6, 12),
        );
        assert_eq!(
            plan.action,
            RecoveryAction::ReuseHeapBackups {
                offset: 9,
                limit: 7,
            }
        );
    }

    #[test]
    fn partial_shortfall_with_shallow_heap_expands() {
        let plan = plan_recovery(
            &EvaluationStats {
                total_evaluated: 9,
                above_threshold: 1,
            },
            &inputs(6, 2),
        );
        assert!(matches!(
            plan.action,
            RecoveryAction::ExpandSearchScope { .. }
        ));
    }

    #[test]
    fn close_to_target_takes_a_small_lookahead() {
        // 3 of 5: at least half way there.
        let plan = plan_recovery(
            &EvaluationStats {
                total_evaluated: 10,
                above_threshold: 3,
            },
            &inputs(5, 1),
        );
        assert_eq!(
            plan.action,
            RecoveryAction::ReuseHeapBackups {
                offset: 10,
                limit: 3,
            }
        );
    }

    #[test]
    fn exhausted_budget_relaxes_thresholds_as_last_resort() {
        let mut i = inputs(5, 2);
        i.can_expand = false;
        let plan = plan_recovery(
            &EvaluationStats {
                total_evaluated: 4,
                above_threshold: 0,
            },
            &i,
        );
        assert_eq!(
            plan.action,
            RecoveryAction::RelaxThresholds { new_minimum: 5.0 }
        );
    }

    #[test]
    fn relaxation_floors_at_score_minimum() {
        let mut i = inputs(5, 0);
        i.can_expand = false;
        i.min_threshold = 0.5;
        let plan = plan_recovery(
            &EvaluationStats {
                total_evaluated: 4,
                above_threshold: 0,
            },
            &i,
        );
        assert_eq!(
            plan.action,
            RecoveryAction::RelaxThresholds { new_minimum: 0.0 }
        );
    }

    #[test]
    fn every_directive_is_explainable() {
        let plan = plan_recovery(
            &EvaluationStats {
                total_evaluated: 4,
                above_threshold: 0,
            },
            &inputs(5, 7),
        );
        assert!(plan.reasoning.contains("No quality candidates"));
        // Directives serialize for audit logs.
        let json = serde_json::to_value(&plan).expect("serialize");
        assert_eq!(json["action"], "reuse_heap_backups");
        assert_eq!(json["limit"], 6);
    }
}
