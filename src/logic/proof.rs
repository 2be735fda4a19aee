//! Proof witness
//!
//! Fixed-size payloads that tie an analysis to its ledger submissions, plus
//! the opaque proof identifier handed to the client. The proof itself is a
//! salted hash commitment, not a zero-knowledge proof.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{AnalysisResult, LegitimacyAssessment, Vote};

pub const PAYLOAD_LEN: usize = 32;

pub type Payload = [u8; PAYLOAD_LEN];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofWitness {
    pub domain_hash: Payload,
    pub certificate_validity_hash: Payload,
    pub salt: Payload,
    pub proof_hash: Payload,
    pub public_inputs: Payload,
}

/// Result of the verify step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofCheck {
    /// Recomputed proof hash matches the witness
    pub proof_consistent: bool,
    pub assessment_legitimate: bool,
    pub vote_legitimate: bool,
    pub is_valid: bool,
}

fn sha256(parts: &[&[u8]]) -> Payload {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

pub fn domain_hash(domain: &str) -> Payload {
    sha256(&[domain.as_bytes()])
}

fn certificate_validity_hash(analysis: &AnalysisResult) -> Payload {
    let valid = [analysis.certificate_valid as u8];
    let verified_at = analysis.last_verified.timestamp().to_le_bytes();
    sha256(&[analysis.domain.as_bytes(), &valid[..], &verified_at[..]])
}

/// score (u32 LE) | risk | certificate | flag bits | code review | zero padding
fn public_inputs(analysis: &AnalysisResult) -> Payload {
    let meta = &analysis.metadata;
    let flags = [
        meta.has_public_github,
        meta.has_documented_roadmap,
        meta.has_audit_reports,
        meta.has_team_verification,
        meta.has_token_economics,
    ]
    .iter()
    .enumerate()
    .fold(0u8, |bits, (i, set)| if *set { bits | (1 << i) } else { bits });

    let mut inputs = [0u8; PAYLOAD_LEN];
    inputs[..4].copy_from_slice(&analysis.transparency_score.to_le_bytes());
    inputs[4] = analysis.risk_level;
    inputs[5] = analysis.certificate_valid as u8;
    inputs[6] = flags;
    inputs[7] = meta.code_review_score;
    inputs
}

fn proof_hash(
    domain_hash: &Payload,
    cert_hash: &Payload,
    inputs: &Payload,
    salt: &Payload,
) -> Payload {
    sha256(&[&domain_hash[..], &cert_hash[..], &inputs[..], &salt[..]])
}

impl ProofWitness {
    /// Build a witness with a fresh random salt
    pub fn generate(analysis: &AnalysisResult) -> Self {
        let mut salt = [0u8; PAYLOAD_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::with_salt(analysis, salt)
    }

    pub fn with_salt(analysis: &AnalysisResult, salt: Payload) -> Self {
        let domain_hash = domain_hash(&analysis.domain);
        let certificate_validity_hash = certificate_validity_hash(analysis);
        let public_inputs = public_inputs(analysis);
        let proof_hash =
            proof_hash(&domain_hash, &certificate_validity_hash, &public_inputs, &salt);

        Self {
            domain_hash,
            certificate_validity_hash,
            salt,
            proof_hash,
            public_inputs,
        }
    }

    /// Opaque identifier correlating the analysis with ledger submissions
    pub fn proof_id(&self) -> String {
        format!("proof_{}", hex::encode(&self.proof_hash[..8]))
    }

    /// Recompute every payload from the analysis and compare
    pub fn is_consistent_with(&self, analysis: &AnalysisResult) -> bool {
        *self == Self::with_salt(analysis, self.salt)
    }
}

/// Final validity requires the proof to hold, the assessment to be
/// legitimate, and the voter to have voted legitimate.
pub fn verify(
    witness: &ProofWitness,
    analysis: &AnalysisResult,
    assessment: &LegitimacyAssessment,
    vote: &Vote,
) -> ProofCheck {
    let proof_consistent = witness.is_consistent_with(analysis);
    ProofCheck {
        proof_consistent,
        assessment_legitimate: assessment.is_legitimate,
        vote_legitimate: vote.is_legitimate,
        is_valid: proof_consistent && assessment.is_legitimate && vote.is_legitimate,
    }
}
