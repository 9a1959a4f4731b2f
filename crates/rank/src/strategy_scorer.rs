use crate::analyzer::{Assessment, ScoreContext, Scorer};
use crate::error::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use prospect_core::{Candidate, SearchStrategy, SCORE_MAX, SCORE_MIN};
use regex::Regex;
use std::collections::BTreeMap;

// Employer tiers recognized beyond the strategy's own company list.
static TIER_1_COMPANIES: Lazy<Vec<&str>> = Lazy::new(|| {
    vec![
        "google", "facebook", "meta", "apple", "microsoft", "amazon", "netflix", "tesla", "uber",
        "airbnb",
    ]
});

static TIER_2_COMPANIES: Lazy<Vec<&str>> = Lazy::new(|| {
    vec![
        "stripe", "dropbox", "slack", "salesforce", "adobe", "nvidia", "twitter", "linkedin",
        "pinterest", "square",
    ]
});

const EXECUTIVE_WORDS: &[&str] = &["cto", "ceo", "vp", "vice president", "director", "head of", "chief"];
const PRINCIPAL_WORDS: &[&str] = &["principal", "staff", "architect", "distinguished"];
const SENIOR_WORDS: &[&str] = &["senior", "lead", "sr.", "sr ", "team lead", "tech lead", "technical lead"];

/// Rule-based scorer over the candidate label.
///
/// Serves two roles: the default scoring backend when no external evaluator
/// is injected, and the ground truth for the analyzer's fallback heuristics
/// when an injected scorer is degraded. Weighted components plus tiered
/// company and seniority boosts, clamped to the score range.
#[derive(Debug, Default)]
pub struct StrategyScorer;

impl StrategyScorer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<P: Send + Sync> Scorer<P> for StrategyScorer {
    async fn assess(&self, candidate: &Candidate<P>, ctx: &ScoreContext) -> Result<Assessment> {
        Ok(assess_label(candidate, &ctx.strategy))
    }
}

/// Full label assessment: weighted components + boosts.
pub(crate) fn assess_label<P>(candidate: &Candidate<P>, strategy: &SearchStrategy) -> Assessment {
    let label = candidate.label.to_lowercase();

    let headline = headline_score(&label, strategy);
    let technical = technical_score(&label, headline);
    let experience = experience_score(&label, strategy);
    let cultural = cultural_fit_score(&label);
    let extraction = if !candidate.identity.is_empty() && !candidate.label.is_empty() {
        8.0
    } else {
        4.0
    };

    let company_boost = company_boost(&label, strategy);
    let seniority_boost = seniority_boost(&label, strategy);

    let base = technical * 0.35 + experience * 0.35 + cultural * 0.20 + extraction * 0.10;
    let score = (base + company_boost + seniority_boost).clamp(SCORE_MIN, SCORE_MAX);

    let mut components = BTreeMap::new();
    components.insert("headline".into(), headline);
    components.insert("technical".into(), technical);
    components.insert("experience".into(), experience);
    components.insert("cultural_fit".into(), cultural);
    components.insert("extraction".into(), extraction);
    components.insert("company_boost".into(), company_boost);
    components.insert("seniority_boost".into(), seniority_boost);

    Assessment { score, components }
}

/// Keyword-hit score for a lowercased label. Also the analyzer's fallback
/// when the injected scorer fails: cheap, local, never errors.
pub(crate) fn headline_score(label: &str, strategy: &SearchStrategy) -> f64 {
    if label.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;

    if strategy.target_titles.iter().any(|t| label.contains(t.as_str())) {
        score += 3.0;
    } else if strategy
        .alternative_titles
        .iter()
        .any(|t| label.contains(t.as_str()))
    {
        score += 2.0;
    }

    if strategy
        .seniority_keywords
        .iter()
        .any(|k| label.contains(k.as_str()))
    {
        score += 1.5;
    }

    if strategy
        .target_companies
        .iter()
        .any(|c| label.contains(c.as_str()))
    {
        score += 1.0;
    }

    let tech_hits = strategy
        .tech_signals
        .iter()
        .filter(|t| label.contains(t.as_str()))
        .count();
    score += tech_hits as f64 * 0.5;

    if strategy
        .negative_patterns
        .iter()
        .any(|p| label.contains(p.as_str()))
    {
        score -= 2.0;
    }

    score.max(0.0)
}

fn technical_score(label: &str, headline: f64) -> f64 {
    let mut score = headline;
    if ["architect", "design", "lead", "principal"]
        .iter()
        .any(|w| label.contains(w))
    {
        score += 1.0;
    }
    if ["full stack", "backend", "frontend", "devops", "ml", "ai"]
        .iter()
        .any(|w| label.contains(w))
    {
        score += 0.5;
    }
    score.min(SCORE_MAX)
}

fn experience_score(label: &str, strategy: &SearchStrategy) -> f64 {
    let mut score: f64 = 5.0;
    if ["senior", "lead", "staff", "principal", "director"]
        .iter()
        .any(|w| label.contains(w))
    {
        score += 2.0;
    } else if ["jr", "junior", "entry"].iter().any(|w| label.contains(w)) {
        score -= 1.0;
    }
    if strategy
        .target_companies
        .iter()
        .any(|c| label.contains(c.as_str()))
    {
        score += 1.0;
    }
    score.min(SCORE_MAX)
}

fn cultural_fit_score(label: &str) -> f64 {
    let mut score: f64 = 5.0;
    if ["team", "collaboration", "agile", "scrum"]
        .iter()
        .any(|w| label.contains(w))
    {
        score += 0.5;
    }
    score.min(SCORE_MAX)
}

/// Tiered boost for a recognized employer, requiring a whole-word match.
fn company_boost(label: &str, strategy: &SearchStrategy) -> f64 {
    let mut boost: f64 = 0.0;
    for company in &strategy.target_companies {
        if !word_match(label, company) {
            continue;
        }
        if TIER_1_COMPANIES.contains(&company.as_str()) {
            boost += 1.5;
        } else if TIER_2_COMPANIES.contains(&company.as_str()) {
            boost += 1.0;
        } else {
            boost += 0.75;
        }
        if label.contains(&format!(" at {company}")) || label.contains(&format!("@{company}")) {
            boost += 0.25;
        }
        // Only the first matching company counts.
        break;
    }
    boost.min(2.0)
}

fn seniority_boost(label: &str, strategy: &SearchStrategy) -> f64 {
    let mut boost: f64 = 0.0;
    for term in &strategy.seniority_keywords {
        if !label.contains(term.as_str()) {
            continue;
        }
        if EXECUTIVE_WORDS.iter().any(|w| term.contains(w)) {
            boost = boost.max(2.0);
        } else if PRINCIPAL_WORDS.iter().any(|w| term.contains(w)) {
            boost = boost.max(1.8);
        } else if SENIOR_WORDS.iter().any(|w| term.contains(w)) {
            boost = boost.max(1.5);
        } else {
            boost = boost.max(1.0);
        }
    }

    let title_boost = if strategy
        .target_titles
        .iter()
        .any(|t| label.contains(t.as_str()))
    {
        0.5
    } else if strategy
        .alternative_titles
        .iter()
        .any(|t| label.contains(t.as_str()))
    {
        0.3
    } else {
        0.0
    };

    let mut context_boost = 0.0;
    if boost > 0.0 {
        let tech_hits = strategy
            .tech_signals
            .iter()
            .filter(|t| label.contains(t.as_str()))
            .count();
        context_boost = (tech_hits as f64 * 0.1).min(0.3);
    }

    (boost + title_boost + context_boost).min(2.0)
}

fn word_match(label: &str, word: &str) -> bool {
    match Regex::new(&format!(r"\b{}\b", regex::escape(word))) {
        Ok(re) => re.is_match(label),
        Err(_) => label.contains(word),
    }
}
