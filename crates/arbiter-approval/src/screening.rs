//! Sensitivity screening for approval requests.

use std::collections::HashSet;

use regex::Regex;

use arbiter_core::config::ApprovalConfig;
use arbiter_core::errors::{ArbiterError, ArbiterResult};

/// Decides whether a change must go to a human.
///
/// Decision types match exactly. Keywords match case-insensitively at the
/// start of a word, so `escalat` style stems cover their inflections.
#[derive(Debug, Clone)]
pub struct SensitivityScreen {
    decision_types: HashSet<String>,
    keywords: Option<Regex>,
}

impl SensitivityScreen {
    pub fn new(config: &ApprovalConfig) -> ArbiterResult<Self> {
        let terms: Vec<String> = config
            .sensitive_keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();
        let keywords = if terms.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)\b(?:{})", terms.join("|"));
            Some(Regex::new(&pattern).map_err(|e| {
                ArbiterError::ConfigError(format!("invalid sensitive keyword pattern: {e}"))
            })?)
        };
        Ok(Self {
            decision_types: config.sensitive_decision_types.iter().cloned().collect(),
            keywords,
        })
    }

    pub fn is_sensitive_type(&self, decision_type: &str) -> bool {
        self.decision_types.contains(decision_type)
    }

    /// The first sensitive keyword found in any of `texts`, as written.
    pub fn find_keyword<'a>(&self, texts: &[&'a str]) -> Option<&'a str> {
        let regex = self.keywords.as_ref()?;
        texts
            .iter()
            .copied()
            .find_map(|text| regex.find(text).map(|m| m.as_str()))
    }

    pub fn mentions_sensitive_topic(&self, texts: &[&str]) -> bool {
        self.find_keyword(texts).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> SensitivityScreen {
        SensitivityScreen::new(&ApprovalConfig::default()).unwrap()
    }

    #[test]
    fn matches_keywords_case_insensitively() {
        let screen = screen();
        assert!(screen.mentions_sensitive_topic(&["Offer a REFUND when late"]));
        assert!(screen.mentions_sensitive_topic(&["", "Escalated to tier 2"]));
        assert!(!screen.mentions_sensitive_topic(&["route billing questions"]));
    }

    #[test]
    fn keyword_must_start_a_word() {
        let screen = screen();
        assert!(!screen.mentions_sensitive_topic(&["paralegal review"]));
        assert_eq!(screen.find_keyword(&["see Legal team"]), Some("Legal"));
    }

    #[test]
    fn sensitive_types_match_exactly() {
        let screen = screen();
        assert!(screen.is_sensitive_type("escalation_decision"));
        assert!(!screen.is_sensitive_type("Escalation_Decision"));
    }

    #[test]
    fn empty_keyword_list_never_matches() {
        let config = ApprovalConfig {
            sensitive_keywords: vec!["  ".into()],
            ..ApprovalConfig::default()
        };
        let screen = SensitivityScreen::new(&config).unwrap();
        assert!(!screen.mentions_sensitive_topic(&["refund"]));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let config = ApprovalConfig {
            sensitive_keywords: vec!["c++".into()],
            ..ApprovalConfig::default()
        };
        let screen = SensitivityScreen::new(&config).unwrap();
        assert!(screen.mentions_sensitive_topic(&["uses C++ internally"]));
        assert!(!screen.mentions_sensitive_topic(&["uses c internally"]));
    }
}
