//! Vote and session request/response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{AnalysisResult, LegitimacyAssessment};
use crate::logic::session::{Session, SessionStatus, VerificationOutcome};

/// A wallet's legitimacy vote. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub is_legitimate: bool,
    /// 1-10
    pub confidence_level: u8,
}

impl Vote {
    pub const MIN_CONFIDENCE: u8 = 1;
    pub const MAX_CONFIDENCE: u8 = 10;

    pub fn confidence_in_range(&self) -> bool {
        (Self::MIN_CONFIDENCE..=Self::MAX_CONFIDENCE).contains(&self.confidence_level)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(max = 253, message = "Domain is too long"))]
    pub domain: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VoteRequest {
    pub is_legitimate: bool,
    #[validate(range(min = 1, max = 10, message = "Confidence level must be between 1 and 10"))]
    pub confidence_level: u8,
}

/// The wallet's signed copy of the prepared vote transaction
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitVoteRequest {
    #[validate(length(min = 1, message = "Signed transaction is required"))]
    pub signed_transaction: String,
}

impl From<&VoteRequest> for Vote {
    fn from(req: &VoteRequest) -> Self {
        Vote {
            is_legitimate: req.is_legitimate,
            confidence_level: req.confidence_level,
        }
    }
}

/// Stateless analysis preview
#[derive(Debug, Serialize)]
pub struct AssessResponse {
    pub analysis: AnalysisResult,
    pub assessment: LegitimacyAssessment,
}

/// Session as returned by the API
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub domain: Option<String>,
    pub analysis: Option<AnalysisResult>,
    pub assessment: Option<LegitimacyAssessment>,
    pub proof_id: Option<String>,
    pub vote: Option<Vote>,
    /// Prepared vote transaction for the wallet to sign, base64
    pub unsigned_vote_transaction: Option<String>,
    pub vote_transaction: Option<String>,
    pub verification: Option<VerificationOutcome>,
    pub last_error: Option<String>,
    pub analyzed_domains: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_touched: DateTime<Utc>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        let mut analyzed_domains: Vec<String> =
            session.analyzed_domains().iter().cloned().collect();
        analyzed_domains.sort();

        Self {
            session_id: session.id,
            status: session.status,
            domain: session.domain.clone(),
            analysis: session.analysis.clone(),
            assessment: session.assessment.clone(),
            proof_id: session.proof_id.clone(),
            vote: session.vote,
            unsigned_vote_transaction: session.staged_vote().map(|s| s.prepared.encoded.clone()),
            vote_transaction: session.vote_transaction.clone(),
            verification: session.verification.clone(),
            last_error: session.last_error.clone(),
            analyzed_domains,
            created_at: session.created_at,
            last_touched: session.last_touched,
        }
    }
}
