//! Session state machine
//!
//! One linear workflow per client session:
//! idle → generating → pending_vote → success → verifying → verification_complete.
//! Asynchronous work (analysis, ledger submission) happens between a `begin_*`
//! and its matching completion, so the session lock is never held across an
//! await. Guards reject out-of-order actions with a typed error.
//!
//! Voting takes two requests while the session stays in pending_vote: the
//! vote transaction is prepared and staged for the wallet, then the wallet's
//! signed copy is submitted.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, transaction::Transaction};
use uuid::Uuid;

use super::ledger::PreparedVote;
use super::normalize::normalize_domain;
use super::proof::{ProofCheck, ProofWitness};
use crate::models::{AnalysisResult, LegitimacyAssessment, Vote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Generating,
    PendingVote,
    Success,
    Verifying,
    VerificationComplete,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Generating => "generating",
            SessionStatus::PendingVote => "pending_vote",
            SessionStatus::Success => "success",
            SessionStatus::Verifying => "verifying",
            SessionStatus::VerificationComplete => "verification_complete",
            SessionStatus::Error => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Domain is empty")]
    EmptyDomain,

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Domain already analyzed in this session: {0}")]
    AlreadyAnalyzed(String),

    #[error("Cannot {action} while session is {from}")]
    InvalidTransition { from: SessionStatus, action: &'static str },

    #[error("A vote has already been cast")]
    VoteAlreadyCast,

    #[error("A vote is already being submitted")]
    VoteInFlight,

    #[error(
        "Confidence level must be between {} and {}",
        Vote::MIN_CONFIDENCE,
        Vote::MAX_CONFIDENCE
    )]
    InvalidConfidence,

    #[error("No proof available to verify")]
    MissingProof,

    #[error("No vote transaction has been prepared")]
    NoPreparedVote,

    #[error("Vote was prepared for a different wallet")]
    WrongVoter,

    #[error("Signed transaction does not match the prepared vote")]
    SignedVoteMismatch,
}

/// Result of the verify step together with its ledger transaction.
/// `transaction` is `None` when the domain's proof record already existed.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    #[serde(flatten)]
    pub check: ProofCheck,
    pub transaction: Option<String>,
    pub verified_at: DateTime<Utc>,
}

/// A vote whose transaction waits for the wallet's signature
#[derive(Debug, Clone)]
pub struct StagedVote {
    pub vote: Vote,
    pub prepared: PreparedVote,
}

/// Everything the vote submission needs, detached from the session
#[derive(Debug, Clone)]
pub struct VoteInputs {
    pub analysis: AnalysisResult,
    pub witness: ProofWitness,
    pub vote: Vote,
}

/// Everything the verify step needs, detached from the session
#[derive(Debug, Clone)]
pub struct VerificationInputs {
    pub analysis: AnalysisResult,
    pub assessment: LegitimacyAssessment,
    pub witness: ProofWitness,
    pub vote: Vote,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub status: SessionStatus,
    pub domain: Option<String>,
    pub analysis: Option<AnalysisResult>,
    pub assessment: Option<LegitimacyAssessment>,
    pub witness: Option<ProofWitness>,
    pub proof_id: Option<String>,
    pub vote: Option<Vote>,
    pub vote_transaction: Option<String>,
    pub verification: Option<VerificationOutcome>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_touched: DateTime<Utc>,
    staged_vote: Option<StagedVote>,
    analyzed: HashSet<String>,
    resume_to: SessionStatus,
    vote_in_flight: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Idle,
            domain: None,
            analysis: None,
            assessment: None,
            witness: None,
            proof_id: None,
            vote: None,
            vote_transaction: None,
            verification: None,
            last_error: None,
            created_at: now,
            last_touched: now,
            staged_vote: None,
            analyzed: HashSet::new(),
            resume_to: SessionStatus::Idle,
            vote_in_flight: false,
        }
    }

    /// Normalized domains analyzed so far. Survives `reset`.
    pub fn analyzed_domains(&self) -> &HashSet<String> {
        &self.analyzed
    }

    pub fn vote_in_flight(&self) -> bool {
        self.vote_in_flight
    }

    pub fn staged_vote(&self) -> Option<&StagedVote> {
        self.staged_vote.as_ref()
    }

    /// A step is running against this session
    pub fn is_busy(&self) -> bool {
        self.vote_in_flight
            || matches!(self.status, SessionStatus::Generating | SessionStatus::Verifying)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_touched = now;
    }

    fn expect_status(
        &self,
        expected: SessionStatus,
        action: &'static str,
    ) -> Result<(), SessionError> {
        if self.status != expected {
            return Err(SessionError::InvalidTransition { from: self.status, action });
        }
        Ok(())
    }

    /// idle → generating. Returns the normalized domain to analyze.
    pub fn begin_generation(
        &mut self,
        raw_domain: &str,
        wallet_connected: bool,
    ) -> Result<String, SessionError> {
        if !wallet_connected {
            return Err(SessionError::WalletNotConnected);
        }
        self.expect_status(SessionStatus::Idle, "analyze")?;

        let domain = normalize_domain(raw_domain);
        if domain.is_empty() {
            return Err(SessionError::EmptyDomain);
        }
        if self.analyzed.contains(&domain) {
            return Err(SessionError::AlreadyAnalyzed(domain));
        }

        self.status = SessionStatus::Generating;
        self.domain = Some(domain.clone());
        self.last_error = None;
        Ok(domain)
    }

    /// generating → pending_vote
    pub fn complete_generation(
        &mut self,
        analysis: AnalysisResult,
        assessment: LegitimacyAssessment,
        witness: ProofWitness,
    ) -> Result<(), SessionError> {
        self.expect_status(SessionStatus::Generating, "complete analysis")?;

        self.analyzed.insert(analysis.domain.clone());
        self.proof_id = Some(witness.proof_id());
        self.analysis = Some(analysis);
        self.assessment = Some(assessment);
        self.witness = Some(witness);
        self.status = SessionStatus::PendingVote;
        Ok(())
    }

    /// Marks the vote as in flight while its transaction is prepared. The
    /// session stays in pending_vote until the ledger confirms. Preparing
    /// again replaces a staged vote that was never submitted.
    pub fn begin_vote(&mut self, vote: &Vote) -> Result<VoteInputs, SessionError> {
        if self.vote.is_some() {
            return Err(SessionError::VoteAlreadyCast);
        }
        self.expect_status(SessionStatus::PendingVote, "vote")?;
        if self.vote_in_flight {
            return Err(SessionError::VoteInFlight);
        }
        if !vote.confidence_in_range() {
            return Err(SessionError::InvalidConfidence);
        }

        let (analysis, witness) = match (&self.analysis, &self.witness) {
            (Some(analysis), Some(witness)) => (analysis.clone(), witness.clone()),
            _ => return Err(SessionError::MissingProof),
        };

        self.vote_in_flight = true;
        Ok(VoteInputs { analysis, witness, vote: *vote })
    }

    /// Hold the prepared transaction until the wallet signs it
    pub fn stage_vote(&mut self, vote: Vote, prepared: PreparedVote) -> Result<(), SessionError> {
        self.expect_status(SessionStatus::PendingVote, "stage vote")?;
        if !self.vote_in_flight {
            return Err(SessionError::InvalidTransition { from: self.status, action: "stage vote" });
        }

        self.vote_in_flight = false;
        self.staged_vote = Some(StagedVote { vote, prepared });
        Ok(())
    }

    /// Accept the wallet's signed copy of the staged vote and mark it in flight
    pub fn begin_vote_submission(
        &mut self,
        voter: &Pubkey,
        signed: &Transaction,
    ) -> Result<StagedVote, SessionError> {
        if self.vote.is_some() {
            return Err(SessionError::VoteAlreadyCast);
        }
        self.expect_status(SessionStatus::PendingVote, "submit vote")?;
        if self.vote_in_flight {
            return Err(SessionError::VoteInFlight);
        }

        let staged = self.staged_vote.as_ref().ok_or(SessionError::NoPreparedVote)?;
        if staged.prepared.voter != *voter {
            return Err(SessionError::WrongVoter);
        }
        if !staged.prepared.matches(signed) {
            return Err(SessionError::SignedVoteMismatch);
        }

        let staged = staged.clone();
        self.vote_in_flight = true;
        Ok(staged)
    }

    /// pending_vote → success
    pub fn record_vote(&mut self, vote: Vote, transaction: String) -> Result<(), SessionError> {
        self.expect_status(SessionStatus::PendingVote, "record vote")?;
        if !self.vote_in_flight {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                action: "record vote",
            });
        }

        self.vote_in_flight = false;
        self.staged_vote = None;
        self.vote = Some(vote);
        self.vote_transaction = Some(transaction);
        self.status = SessionStatus::Success;
        Ok(())
    }

    /// success → verifying
    pub fn begin_verification(&mut self) -> Result<VerificationInputs, SessionError> {
        self.expect_status(SessionStatus::Success, "verify")?;

        let vote = self.vote.ok_or(SessionError::InvalidTransition {
            from: self.status,
            action: "verify",
        })?;
        if self.proof_id.is_none() {
            return Err(SessionError::MissingProof);
        }
        let (analysis, assessment, witness) =
            match (&self.analysis, &self.assessment, &self.witness) {
                (Some(a), Some(s), Some(w)) => (a.clone(), s.clone(), w.clone()),
                _ => return Err(SessionError::MissingProof),
            };

        self.status = SessionStatus::Verifying;
        Ok(VerificationInputs { analysis, assessment, witness, vote })
    }

    /// verifying → verification_complete
    pub fn complete_verification(
        &mut self,
        outcome: VerificationOutcome,
    ) -> Result<(), SessionError> {
        self.expect_status(SessionStatus::Verifying, "complete verification")?;
        self.verification = Some(outcome);
        self.status = SessionStatus::VerificationComplete;
        Ok(())
    }

    /// Any in-flight step → error. Remembers where `recover` should return.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.resume_to = match self.status {
            SessionStatus::Generating => SessionStatus::Idle,
            SessionStatus::Verifying => SessionStatus::Success,
            SessionStatus::Error => self.resume_to,
            other => other,
        };
        self.vote_in_flight = false;
        self.staged_vote = None;
        self.last_error = Some(message.into());
        self.status = SessionStatus::Error;
    }

    /// verification_complete | error → idle. The analyzed set is retained.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::VerificationComplete | SessionStatus::Error => {
                self.clear_working_state();
                self.last_error = None;
                self.status = SessionStatus::Idle;
                Ok(())
            }
            from => Err(SessionError::InvalidTransition { from, action: "reset" }),
        }
    }

    /// error → the last stable state before the failure
    pub fn recover(&mut self) -> Result<SessionStatus, SessionError> {
        self.expect_status(SessionStatus::Error, "recover")?;

        if self.resume_to == SessionStatus::Idle {
            self.clear_working_state();
        }
        self.status = self.resume_to;
        self.last_error = None;
        Ok(self.status)
    }

    fn clear_working_state(&mut self) {
        self.domain = None;
        self.analysis = None;
        self.assessment = None;
        self.witness = None;
        self.proof_id = None;
        self.vote = None;
        self.vote_transaction = None;
        self.verification = None;
        self.staged_vote = None;
        self.vote_in_flight = false;
        self.resume_to = SessionStatus::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::analyzer::HeuristicAnalyzer;
    use crate::logic::assessor::assess;
    use crate::logic::ledger::AttestationProgram;
    use crate::logic::proof::verify;
    use solana_sdk::{hash::Hash, message::Message, signature::{Keypair, Signer}};

    fn prepared_for(wallet: &Keypair) -> PreparedVote {
        let program = AttestationProgram::new(Pubkey::new_from_array([42u8; 32]));
        let submission = program.vote_on_project(&wallet.pubkey(), [1u8; 32], true, 7).unwrap();
        let payer = wallet.pubkey();
        let message =
            Message::new_with_blockhash(&submission.instructions, Some(&payer), &Hash::default());
        PreparedVote {
            voter: wallet.pubkey(),
            vote_record: program.vote_pda(&[1u8; 32], &wallet.pubkey()),
            transaction: Transaction::new_unsigned(message),
            encoded: String::new(),
        }
    }

    fn generate(session: &mut Session, raw: &str) -> String {
        let domain = session.begin_generation(raw, true).unwrap();
        let analysis = HeuristicAnalyzer::new().score(&domain);
        let assessment = assess(&analysis);
        let witness = ProofWitness::generate(&analysis);
        session.complete_generation(analysis, assessment, witness).unwrap();
        domain
    }

    fn cast(session: &mut Session, vote: Vote) {
        let wallet = Keypair::new();
        let prepared = prepared_for(&wallet);
        let signed = prepared.transaction.clone();

        session.begin_vote(&vote).unwrap();
        session.stage_vote(vote, prepared).unwrap();
        session.begin_vote_submission(&wallet.pubkey(), &signed).unwrap();
        session.record_vote(vote, "sig".to_string()).unwrap();
    }

    fn verify_now(session: &mut Session) -> VerificationOutcome {
        let inputs = session.begin_verification().unwrap();
        let outcome = VerificationOutcome {
            check: verify(&inputs.witness, &inputs.analysis, &inputs.assessment, &inputs.vote),
            transaction: Some("verify-sig".to_string()),
            verified_at: Utc::now(),
        };
        session.complete_verification(outcome.clone()).unwrap();
        outcome
    }

    #[test]
    fn test_full_workflow() {
        let mut session = Session::new();
        assert_eq!(session.status, SessionStatus::Idle);

        generate(&mut session, "https://www.GitHub.com/");
        assert_eq!(session.status, SessionStatus::PendingVote);
        assert_eq!(session.domain.as_deref(), Some("github.com"));
        assert!(session.proof_id.as_deref().unwrap().starts_with("proof_"));

        cast(&mut session, Vote { is_legitimate: true, confidence_level: 8 });
        assert_eq!(session.status, SessionStatus::Success);
        assert_eq!(session.vote_transaction.as_deref(), Some("sig"));

        let outcome = verify_now(&mut session);
        assert!(outcome.check.is_valid);
        assert_eq!(session.status, SessionStatus::VerificationComplete);

        session.reset().unwrap();
        assert_eq!(session.status, SessionStatus::Idle);
        assert!(session.analysis.is_none());
        assert!(session.vote.is_none());
        assert!(session.analyzed_domains().contains("github.com"));
    }

    #[test]
    fn test_empty_domain_rejected_before_any_work() {
        let mut session = Session::new();
        assert_eq!(session.begin_generation("", true), Err(SessionError::EmptyDomain));
        assert_eq!(session.begin_generation("   ", true), Err(SessionError::EmptyDomain));
        assert_eq!(session.begin_generation("https://", true), Err(SessionError::EmptyDomain));
        assert_eq!(session.status, SessionStatus::Idle);
        assert!(session.domain.is_none());
    }

    #[test]
    fn test_wallet_required() {
        let mut session = Session::new();
        assert_eq!(
            session.begin_generation("github.com", false),
            Err(SessionError::WalletNotConnected)
        );
        assert_eq!(session.status, SessionStatus::Idle);
    }

    #[test]
    fn test_same_domain_blocked_after_reset() {
        let mut session = Session::new();
        generate(&mut session, "Example.com");
        cast(&mut session, Vote { is_legitimate: true, confidence_level: 5 });
        verify_now(&mut session);
        session.reset().unwrap();

        let err = session.begin_generation("https://www.EXAMPLE.com/", true).unwrap_err();
        assert_eq!(err, SessionError::AlreadyAnalyzed("example.com".to_string()));
        assert_eq!(session.analyzed_domains().len(), 1);
        assert!(session.analyzed_domains().contains("example.com"));
    }

    #[test]
    fn test_negative_vote_yields_failed_verification() {
        let mut session = Session::new();
        generate(&mut session, "github.com");
        assert!(session.assessment.as_ref().unwrap().is_legitimate);

        cast(&mut session, Vote { is_legitimate: false, confidence_level: 3 });
        let outcome = verify_now(&mut session);

        assert!(outcome.check.proof_consistent);
        assert!(!outcome.check.is_valid);
        assert_eq!(session.status, SessionStatus::VerificationComplete);
    }

    #[test]
    fn test_verification_requires_a_cast_vote() {
        let mut session = Session::new();
        assert!(session.begin_verification().is_err());

        generate(&mut session, "github.com");
        assert_eq!(
            session.begin_verification().unwrap_err(),
            SessionError::InvalidTransition { from: SessionStatus::PendingVote, action: "verify" }
        );

        // in flight but not yet confirmed
        session.begin_vote(&Vote { is_legitimate: true, confidence_level: 7 }).unwrap();
        assert!(session.begin_verification().is_err());
        assert!(session
            .complete_verification(VerificationOutcome {
                check: ProofCheck {
                    proof_consistent: true,
                    assessment_legitimate: true,
                    vote_legitimate: true,
                    is_valid: true,
                },
                transaction: None,
                verified_at: Utc::now(),
            })
            .is_err());
        assert_ne!(session.status, SessionStatus::VerificationComplete);
    }

    #[test]
    fn test_vote_guards() {
        let mut session = Session::new();
        let vote = Vote { is_legitimate: true, confidence_level: 7 };
        assert!(matches!(session.begin_vote(&vote), Err(SessionError::InvalidTransition { .. })));

        generate(&mut session, "github.com");
        assert_eq!(
            session.begin_vote(&Vote { is_legitimate: true, confidence_level: 0 }).unwrap_err(),
            SessionError::InvalidConfidence
        );
        assert_eq!(
            session.begin_vote(&Vote { is_legitimate: true, confidence_level: 11 }).unwrap_err(),
            SessionError::InvalidConfidence
        );

        session.begin_vote(&vote).unwrap();
        assert_eq!(session.begin_vote(&vote).unwrap_err(), SessionError::VoteInFlight);

        session.record_vote(vote, "sig".to_string()).unwrap();
        assert_eq!(session.begin_vote(&vote).unwrap_err(), SessionError::VoteAlreadyCast);
    }

    #[test]
    fn test_vote_submission_checks_wallet_and_transaction() {
        let mut session = Session::new();
        generate(&mut session, "github.com");
        let wallet = Keypair::new();
        let vote = Vote { is_legitimate: true, confidence_level: 7 };
        let prepared = prepared_for(&wallet);
        let signed = prepared.transaction.clone();

        assert_eq!(
            session.begin_vote_submission(&wallet.pubkey(), &signed).unwrap_err(),
            SessionError::NoPreparedVote
        );

        session.begin_vote(&vote).unwrap();
        session.stage_vote(vote, prepared).unwrap();
        assert!(!session.vote_in_flight());
        assert!(session.staged_vote().is_some());

        let other = Keypair::new();
        assert_eq!(
            session.begin_vote_submission(&other.pubkey(), &signed).unwrap_err(),
            SessionError::WrongVoter
        );
        let foreign = prepared_for(&other).transaction;
        assert_eq!(
            session.begin_vote_submission(&wallet.pubkey(), &foreign).unwrap_err(),
            SessionError::SignedVoteMismatch
        );

        let staged = session.begin_vote_submission(&wallet.pubkey(), &signed).unwrap();
        assert_eq!(staged.vote, vote);
        assert!(session.is_busy());
        assert_eq!(
            session.begin_vote_submission(&wallet.pubkey(), &signed).unwrap_err(),
            SessionError::VoteInFlight
        );

        session.record_vote(vote, "sig".to_string()).unwrap();
        assert!(session.staged_vote().is_none());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_failed_submission_drops_staged_vote() {
        let mut session = Session::new();
        generate(&mut session, "github.com");
        let wallet = Keypair::new();
        let vote = Vote { is_legitimate: false, confidence_level: 2 };
        let prepared = prepared_for(&wallet);
        let signed = prepared.transaction.clone();

        session.begin_vote(&vote).unwrap();
        session.stage_vote(vote, prepared).unwrap();
        session.begin_vote_submission(&wallet.pubkey(), &signed).unwrap();
        session.fail("Blockhash not found");

        assert_eq!(session.recover().unwrap(), SessionStatus::PendingVote);
        assert!(session.staged_vote().is_none());
        assert_eq!(
            session.begin_vote_submission(&wallet.pubkey(), &signed).unwrap_err(),
            SessionError::NoPreparedVote
        );
    }

    #[test]
    fn test_busy_while_steps_run() {
        let mut session = Session::new();
        assert!(!session.is_busy());
        session.begin_generation("github.com", true).unwrap();
        assert!(session.is_busy());
        session.fail("analysis failed");
        assert!(!session.is_busy());
    }

    #[test]
    fn test_failed_vote_is_not_recorded_and_recovers() {
        let mut session = Session::new();
        generate(&mut session, "github.com");
        let vote = Vote { is_legitimate: true, confidence_level: 7 };

        session.begin_vote(&vote).unwrap();
        session.fail("User rejected the request");
        assert_eq!(session.status, SessionStatus::Error);
        assert!(session.vote.is_none());
        assert!(!session.vote_in_flight());
        assert_eq!(session.last_error.as_deref(), Some("User rejected the request"));

        assert_eq!(session.recover().unwrap(), SessionStatus::PendingVote);
        assert!(session.last_error.is_none());
        cast(&mut session, vote);
        assert_eq!(session.status, SessionStatus::Success);
    }

    #[test]
    fn test_failed_generation_recovers_to_idle_and_allows_retry() {
        let mut session = Session::new();
        session.begin_generation("github.com", true).unwrap();
        session.fail("analysis failed");

        assert_eq!(session.recover().unwrap(), SessionStatus::Idle);
        assert!(session.domain.is_none());
        assert!(session.analyzed_domains().is_empty());
        generate(&mut session, "github.com");
    }

    #[test]
    fn test_failed_verification_recovers_to_success() {
        let mut session = Session::new();
        generate(&mut session, "github.com");
        cast(&mut session, Vote { is_legitimate: true, confidence_level: 9 });
        session.begin_verification().unwrap();
        session.fail("rpc unavailable");

        assert_eq!(session.recover().unwrap(), SessionStatus::Success);
        assert!(session.vote.is_some());
        verify_now(&mut session);
    }

    #[test]
    fn test_reset_only_from_terminal_states() {
        let mut session = Session::new();
        assert!(session.reset().is_err());
        generate(&mut session, "github.com");
        assert_eq!(
            session.reset().unwrap_err(),
            SessionError::InvalidTransition { from: SessionStatus::PendingVote, action: "reset" }
        );

        session.fail("boom");
        session.reset().unwrap();
        assert_eq!(session.status, SessionStatus::Idle);
        assert!(session.proof_id.is_none());
        assert!(session.analyzed_domains().contains("github.com"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&SessionStatus::VerificationComplete).unwrap();
        assert_eq!(json, "\"verification_complete\"");
        assert_eq!(SessionStatus::PendingVote.to_string(), "pending_vote");
    }
}
