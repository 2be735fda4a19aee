//! Network-assisted analyzer
//!
//! Certificate check, repository lookup and path probes run concurrently and
//! are awaited jointly before scoring. Every probe tolerates failure.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;

use super::github::{code_review_score, GitHubLocator, RepositoryLookup};
use super::probe::{outcome_from_error, probe_head, probe_keywords, HttpTransport};
use super::rules;
use super::{Analyzer, AnalyzerError};
use crate::models::{AnalysisResult, ProbeOutcome, ProbeReport, TransparencyMetadata};

pub struct NetworkAnalyzer {
    transport: Arc<dyn HttpTransport>,
    github_token: Option<String>,
}

impl NetworkAnalyzer {
    pub fn new(transport: Arc<dyn HttpTransport>, github_token: Option<String>) -> Self {
        Self { transport, github_token }
    }

    async fn run(&self, domain: &str) -> Result<AnalysisResult, AnalyzerError> {
        if domain.is_empty() {
            return Err(AnalyzerError::EmptyDomain);
        }
        let base = format!("https://{}", domain);
        reqwest::Url::parse(&base).map_err(|e| AnalyzerError::InvalidDomain(e.to_string()))?;

        let transport = self.transport.as_ref();
        let locator = GitHubLocator::new(transport, self.github_token.as_deref());

        let (certificate, repository, roadmap, audit, team, tokenomics) = tokio::join!(
            self.check_certificate(&base),
            locator.find_repository(domain),
            self.probe_dimension(&base, &rules::ROADMAP_PATHS, &rules::ROADMAP_KEYWORDS),
            self.probe_dimension(&base, &rules::AUDIT_PATHS, &rules::AUDIT_KEYWORDS),
            self.probe_team(&base),
            self.probe_dimension(&base, &rules::TOKENOMICS_PATHS, &rules::TOKENOMICS_KEYWORDS),
        );

        let report = ProbeReport {
            certificate,
            repository: repository.outcome.clone(),
            roadmap,
            audit,
            team,
            tokenomics,
        };

        Ok(score_report(domain, report, &repository, Utc::now()))
    }

    /// A completed HTTPS exchange means the certificate validated
    async fn check_certificate(&self, base: &str) -> ProbeOutcome {
        match self.transport.get(base, None).await {
            Ok(_) => ProbeOutcome::Present,
            Err(e) => {
                tracing::debug!("Certificate check failed for {}: {}", base, e);
                outcome_from_error(&e)
            }
        }
    }

    /// A reachable team path only counts when the page names people or roles
    async fn probe_team(&self, base: &str) -> ProbeOutcome {
        let transport = self.transport.as_ref();
        let urls: Vec<String> =
            rules::TEAM_PATHS.iter().map(|p| format!("{}{}", base, p)).collect();
        let outcomes = join_all(urls.iter().map(|url| async move {
            match probe_head(transport, url).await {
                ProbeOutcome::Present => {
                    probe_keywords(transport, url, &rules::TEAM_KEYWORDS).await
                }
                other => other,
            }
        }))
        .await;

        ProbeOutcome::combine(outcomes)
    }

    /// Any path present, or the keywords on the landing page
    async fn probe_dimension(&self, base: &str, paths: &[&str], keywords: &[&str]) -> ProbeOutcome {
        let transport = self.transport.as_ref();
        let urls: Vec<String> = paths.iter().map(|p| format!("{}{}", base, p)).collect();
        let outcomes = join_all(urls.iter().map(|u| probe_head(transport, u))).await;

        let paths_outcome = ProbeOutcome::combine(outcomes);
        if paths_outcome.is_present() {
            return paths_outcome;
        }

        let page = probe_keywords(transport, base, keywords).await;
        ProbeOutcome::combine([paths_outcome, page])
    }
}

/// Turn probe outcomes into scores. Only `Present` counts.
pub fn score_report(
    domain: &str,
    report: ProbeReport,
    repository: &RepositoryLookup,
    now: DateTime<Utc>,
) -> AnalysisResult {
    let certificate_valid = report.certificate.is_present();
    let review = repository.data.as_ref().map(|d| code_review_score(d, now)).unwrap_or(0);
    let stars = repository.data.as_ref().map(|d| d.stargazers_count).unwrap_or(0);

    let metadata = TransparencyMetadata {
        has_public_github: report.repository.is_present(),
        has_documented_roadmap: report.roadmap.is_present(),
        has_audit_reports: report.audit.is_present(),
        has_team_verification: report.team.is_present(),
        has_token_economics: report.tokenomics.is_present(),
        code_review_score: review,
        repository: repository.data.as_ref().map(|d| d.to_stats()),
    };

    let (transparency_score, risk_level) = if rules::is_established(domain) {
        let mut score = rules::ESTABLISHED_BASE_SCORE;
        let bonuses = [
            metadata.has_public_github,
            metadata.has_team_verification,
            metadata.has_audit_reports,
        ];
        for flag in bonuses {
            if flag {
                score += rules::ESTABLISHED_BONUS;
            }
        }
        let mut risk = rules::ESTABLISHED_RISK;
        if !certificate_valid {
            risk += rules::ESTABLISHED_CERT_PENALTY;
        }
        (score, risk)
    } else {
        let mut score = 0u32;
        if metadata.has_public_github { score += rules::GITHUB_WEIGHT; }
        if metadata.has_documented_roadmap { score += rules::ROADMAP_WEIGHT; }
        if metadata.has_audit_reports { score += rules::AUDIT_WEIGHT; }
        if metadata.has_team_verification { score += rules::TEAM_WEIGHT; }
        if metadata.has_token_economics { score += rules::TOKENOMICS_WEIGHT; }
        score += (stars / 100).min(rules::MAX_STAR_BONUS);
        score += review as u32 / 4;

        let mut risk = 0u8;
        if !certificate_valid { risk += rules::INVALID_CERT_RISK; }
        if metadata.has_public_github && stars == 0 { risk += rules::UNSTARRED_REPO_RISK; }
        if review < rules::LOW_REVIEW_THRESHOLD { risk += rules::LOW_REVIEW_RISK; }
        (score, risk)
    };

    AnalysisResult {
        domain: domain.to_string(),
        transparency_score: transparency_score.min(100),
        risk_level: risk_level.min(10),
        certificate_valid,
        last_verified: now,
        metadata,
        probe_report: Some(report),
    }
}

#[async_trait]
impl Analyzer for NetworkAnalyzer {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn analyze(&self, domain: &str) -> AnalysisResult {
        match self.run(domain).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Analysis of {:?} failed, using fallback: {}", domain, e);
                AnalysisResult::fallback(domain)
            }
        }
    }
}
