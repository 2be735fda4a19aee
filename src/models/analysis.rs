//! Analysis result model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one existence check.
///
/// `Indeterminate` means the check could not be completed (network error,
/// rate limiting, server error) and is kept apart from `Absent` so callers
/// can tell "checked and missing" from "could not check".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Present,
    Absent,
    Indeterminate { reason: String },
}

impl ProbeOutcome {
    pub fn is_present(&self) -> bool {
        matches!(self, ProbeOutcome::Present)
    }

    /// Fold several outcomes for the same dimension: any present wins,
    /// then any indeterminate, otherwise absent.
    pub fn combine<I>(outcomes: I) -> ProbeOutcome
    where
        I: IntoIterator<Item = ProbeOutcome>,
    {
        let mut indeterminate = None;
        for outcome in outcomes {
            match outcome {
                ProbeOutcome::Present => return ProbeOutcome::Present,
                ProbeOutcome::Indeterminate { reason } => {
                    indeterminate.get_or_insert(reason);
                }
                ProbeOutcome::Absent => {}
            }
        }
        match indeterminate {
            Some(reason) => ProbeOutcome::Indeterminate { reason },
            None => ProbeOutcome::Absent,
        }
    }
}

/// Per-dimension probe outcomes (network-assisted analysis only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub certificate: ProbeOutcome,
    pub repository: ProbeOutcome,
    pub roadmap: ProbeOutcome,
    pub audit: ProbeOutcome,
    pub team: ProbeOutcome,
    pub tokenomics: ProbeOutcome,
}

/// Public repository statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStats {
    /// `owner/name`
    pub full_name: String,
    pub stars: u32,
    pub forks: u32,
    pub last_commit: Option<DateTime<Utc>>,
    pub license: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransparencyMetadata {
    pub has_public_github: bool,
    pub has_documented_roadmap: bool,
    pub has_audit_reports: bool,
    pub has_team_verification: bool,
    pub has_token_economics: bool,
    /// 0-100
    pub code_review_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryStats>,
}

impl TransparencyMetadata {
    /// True when no transparency flag is set
    pub fn is_empty(&self) -> bool {
        !(self.has_public_github
            || self.has_documented_roadmap
            || self.has_audit_reports
            || self.has_team_verification
            || self.has_token_economics)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub domain: String,
    /// 0-100
    pub transparency_score: u32,
    /// 0-10
    pub risk_level: u8,
    pub certificate_valid: bool,
    pub last_verified: DateTime<Utc>,
    pub metadata: TransparencyMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_report: Option<ProbeReport>,
}

impl AnalysisResult {
    pub const FALLBACK_SCORE: u32 = 50;
    pub const FALLBACK_RISK: u8 = 5;

    /// Result returned when analysis itself fails
    pub fn fallback(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            transparency_score: Self::FALLBACK_SCORE,
            risk_level: Self::FALLBACK_RISK,
            certificate_valid: false,
            last_verified: Utc::now(),
            metadata: TransparencyMetadata::default(),
            probe_report: None,
        }
    }
}
