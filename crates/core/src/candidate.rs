use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Lower bound of the score range fixed by the scorer contract.
pub const SCORE_MIN: f64 = 0.0;

/// Upper bound of the score range fixed by the scorer contract.
pub const SCORE_MAX: f64 = 10.0;

/// One sourced record being considered for ranking.
///
/// The payload type `P` is opaque to the ranking machinery; eviction and
/// deduplication operate only on the score and the normalized identity key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate<P> {
    /// Raw identity URL as reported by the source.
    pub identity: String,

    /// Human-readable label (e.g. a profile headline).
    pub label: String,

    /// Caller-defined attributes, never inspected by the core.
    pub payload: P,
}

impl<P> Candidate<P> {
    pub fn new(identity: impl Into<String>, label: impl Into<String>, payload: P) -> Self {
        Self {
            identity: identity.into(),
            label: label.into(),
            payload,
        }
    }

    /// Normalized form of the identity, used for all dedup comparisons.
    pub fn identity_key(&self) -> String {
        normalize_identity_key(&self.identity)
    }
}

/// A candidate after scoring. Immutable once produced; only its ranking
/// position changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCandidate<P> {
    pub candidate: Candidate<P>,

    /// Overall score within `[SCORE_MIN, SCORE_MAX]`.
    pub score: f64,

    /// Named score components for explainability.
    pub components: BTreeMap<String, f64>,

    pub scored_at: SystemTime,
}

impl<P> ScoredCandidate<P> {
    pub fn new(candidate: Candidate<P>, score: f64, components: BTreeMap<String, f64>) -> Self {
        Self {
            candidate,
            score,
            components,
            scored_at: SystemTime::now(),
        }
    }

    pub fn identity_key(&self) -> String {
        self.candidate.identity_key()
    }
}

/// Normalize an identity URL for deduplication: lowercase, drop the query
/// string and fragment, drop trailing slashes.
pub fn normalize_identity_key(raw: &str) -> String {
    let mut key = raw.trim().to_lowercase();
    if let Some(pos) = key.find(['?', '#']) {
        key.truncate(pos);
    }
    while key.ends_with('/') {
        key.pop();
    }
    key
}
