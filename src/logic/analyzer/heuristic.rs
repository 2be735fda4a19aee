//! String-heuristic analyzer
//!
//! Scores a domain from keyword matches alone. No network access.

use async_trait::async_trait;
use chrono::Utc;

use super::rules::{self, Flag, KeywordRule};
use super::Analyzer;
use crate::models::{AnalysisResult, TransparencyMetadata};

#[derive(Debug, Default, Clone)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Score an already normalized domain
    pub fn score(&self, domain: &str) -> AnalysisResult {
        if rules::FRAUD_KEYWORDS.iter().any(|k| domain.contains(k)) {
            tracing::debug!("Fraud keyword matched for {}", domain);
            return AnalysisResult {
                domain: domain.to_string(),
                transparency_score: rules::FRAUD_SCORE,
                risk_level: rules::FRAUD_RISK,
                certificate_valid: false,
                last_verified: Utc::now(),
                metadata: TransparencyMetadata::default(),
                probe_report: None,
            };
        }

        let mut score = rules::BASE_SCORE;
        let mut risk = rules::BASE_RISK;
        let mut metadata = TransparencyMetadata::default();

        for rule in rules::KEYWORD_RULES.iter().filter(|r| domain.contains(r.keyword)) {
            apply_rule(rule, &mut score, &mut risk, &mut metadata);
        }

        let transparency_score = score.clamp(0, 100) as u32;
        let risk_level = risk.clamp(0, 10) as u8;

        if metadata.has_public_github {
            metadata.code_review_score = transparency_score as u8;
        }

        AnalysisResult {
            domain: domain.to_string(),
            transparency_score,
            risk_level,
            certificate_valid: true,
            last_verified: Utc::now(),
            metadata,
            probe_report: None,
        }
    }
}

fn apply_rule(
    rule: &KeywordRule,
    score: &mut i32,
    risk: &mut i32,
    metadata: &mut TransparencyMetadata,
) {
    *score += rule.score_delta;
    *risk += rule.risk_delta;

    match rule.flag {
        Some(Flag::PublicGithub) => metadata.has_public_github = true,
        Some(Flag::DocumentedRoadmap) => metadata.has_documented_roadmap = true,
        Some(Flag::AuditReports) => metadata.has_audit_reports = true,
        Some(Flag::TeamVerification) => metadata.has_team_verification = true,
        Some(Flag::TokenEconomics) => metadata.has_token_economics = true,
        None => {}
    }
}

#[async_trait]
impl Analyzer for HeuristicAnalyzer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn analyze(&self, domain: &str) -> AnalysisResult {
        self.score(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_scores_seventy() {
        let result = HeuristicAnalyzer::new().score("github.com");
        assert_eq!(result.transparency_score, 70);
        assert_eq!(result.risk_level, 5);
        assert!(result.metadata.has_public_github);
        assert_eq!(result.metadata.code_review_score, 70);
    }

    #[test]
    fn test_fraud_keywords_pin_score_and_risk() {
        let analyzer = HeuristicAnalyzer::new();
        for domain in ["totally-a-scam-token.biz", "fake-github-audit.io", "phishing.example"] {
            let result = analyzer.score(domain);
            assert_eq!(result.transparency_score, 10, "{}", domain);
            assert_eq!(result.risk_level, 10, "{}", domain);
            assert!(result.metadata.is_empty(), "{}", domain);
            assert!(!result.certificate_valid);
        }
    }

    #[test]
    fn test_unknown_domain_stays_at_base() {
        let result = HeuristicAnalyzer::new().score("example.org");
        assert_eq!(result.transparency_score, 50);
        assert_eq!(result.risk_level, 5);
        assert!(result.metadata.is_empty());
        assert_eq!(result.metadata.code_review_score, 0);
    }

    #[test]
    fn test_multiple_keywords_accumulate() {
        // 50 + 10 (official) + 15 (audit) + 10 (roadmap) = 85, risk 5 - 1 - 2 = 2
        let result = HeuristicAnalyzer::new().score("official-audit-roadmap.dev");
        assert_eq!(result.transparency_score, 85);
        assert_eq!(result.risk_level, 2);
        assert!(result.metadata.has_team_verification);
        assert!(result.metadata.has_audit_reports);
        assert!(result.metadata.has_documented_roadmap);
    }

    #[test]
    fn test_scores_are_clamped() {
        // 50 + 20 + 10 + 15 + 10 + 5 = 110 -> 100
        let high = HeuristicAnalyzer::new().score("github-official-audit-roadmap-token.io");
        assert_eq!(high.transparency_score, 100);

        // 50 - 15 - 10 = 25, risk 5 + 2 + 1 = 8
        let low = HeuristicAnalyzer::new().score("new-test.xyz");
        assert_eq!(low.transparency_score, 25);
        assert_eq!(low.risk_level, 8);
    }

    #[test]
    fn test_ip_and_punycode_fall_through() {
        let analyzer = HeuristicAnalyzer::new();
        assert_eq!(analyzer.score("10.0.0.1").transparency_score, 50);
        assert_eq!(analyzer.score("xn--80ak6aa92e.com").transparency_score, 50);
    }
}
