use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Typed search strategy resolved once at run start.
///
/// Replaces ad-hoc keyword dictionaries re-interpreted at each call site:
/// every field has a documented default, and scoring code reads the struct
/// directly. All lists are matched case-insensitively against candidate
/// labels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchStrategy {
    /// Exact role titles the search is targeting.
    #[serde(default)]
    pub target_titles: Vec<String>,

    /// Adjacent titles that still count, at reduced weight.
    #[serde(default)]
    pub alternative_titles: Vec<String>,

    /// Seniority markers ("senior", "staff", "principal", ...).
    #[serde(default)]
    pub seniority_keywords: Vec<String>,

    /// Employers that boost a candidate's score.
    #[serde(default)]
    pub target_companies: Vec<String>,

    /// Technology keywords relevant to the role.
    #[serde(default)]
    pub tech_signals: Vec<String>,

    /// Label patterns that penalize a candidate (recruiters, students, ...).
    #[serde(default)]
    pub negative_patterns: Vec<String>,
}

impl SearchStrategy {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let strategy: Self =
            serde_json::from_str(raw).context("Failed to parse search strategy JSON")?;
        let strategy = strategy.lowercased();
        if strategy.is_empty() {
            log::warn!("Search strategy has no keyword lists; only base scoring will apply");
        }
        Ok(strategy)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read strategy file {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// Normalize all keyword lists to lowercase so matching never has to.
    fn lowercased(mut self) -> Self {
        for list in [
            &mut self.target_titles,
            &mut self.alternative_titles,
            &mut self.seniority_keywords,
            &mut self.target_companies,
            &mut self.tech_signals,
            &mut self.negative_patterns,
        ] {
            for entry in list.iter_mut() {
                *entry = entry.to_lowercase();
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.target_titles.is_empty()
            && self.alternative_titles.is_empty()
            && self.seniority_keywords.is_empty()
            && self.target_companies.is_empty()
            && self.tech_signals.is_empty()
            && self.negative_patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn missing_fields_default_to_empty_lists() {
        let strategy = SearchStrategy::from_json_str(r#"{"target_titles": ["Rust Engineer"]}"#)
            .expect("parse strategy");
        assert_eq!(strategy.target_titles, vec!["rust engineer".to_string()]);
        assert!(strategy.negative_patterns.is_empty());
    }

    #[test]
    fn keywords_are_lowercased_on_load() {
        let strategy = SearchStrategy::from_json_str(
            r#"{"seniority_keywords": ["Senior", "STAFF"], "target_companies": ["Stripe"]}"#,
        )
        .expect("parse strategy");
        assert_eq!(strategy.seniority_keywords, vec!["senior", "staff"]);
        assert_eq!(strategy.target_companies, vec!["stripe"]);
    }

    #[test]
    fn from_path_reads_and_parses() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"tech_signals": ["Rust", "Tokio"]}}"#).expect("write");
        let strategy = SearchStrategy::from_path(file.path()).expect("load strategy");
        assert_eq!(strategy.tech_signals, vec!["rust", "tokio"]);
    }

    #[test]
    fn invalid_json_is_rejected_with_context() {
        let err = SearchStrategy::from_json_str("not json").unwrap_err();
        assert!(err.to_string().contains("strategy"));
    }
}
