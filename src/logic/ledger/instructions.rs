//! Attestation program instructions
//!
//! Anchor-style encoding: 8-byte discriminator (first 8 bytes of
//! sha256("global:<method>")) followed by the Borsh-encoded arguments.

use borsh::BorshSerialize;
use solana_sdk::{
    hash::hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    transaction::Transaction,
};
use solana_system_interface::program::ID as system_program;

use super::LedgerError;
use crate::logic::proof::Payload;

// PDA seeds
pub const ATTESTATION: &[u8] = b"attestation";
pub const PROJECT: &[u8] = b"project";
pub const VOTE: &[u8] = b"vote";
pub const PROOF: &[u8] = b"proof";

/// Longest project name the program accepts, in bytes
pub const MAX_PROJECT_NAME: usize = 100;

/// One transaction's worth of work for a ledger
#[derive(Debug, Clone)]
pub struct Submission {
    pub label: &'static str,
    pub instructions: Vec<Instruction>,
    /// Accounts this submission initializes
    pub creates: Vec<Pubkey>,
}

/// A transaction its signers have already signed, ready to forward
#[derive(Debug, Clone)]
pub struct SignedSubmission {
    pub label: &'static str,
    pub transaction: Transaction,
    pub creates: Vec<Pubkey>,
}

pub fn anchor_discriminator(method: &str) -> [u8; 8] {
    let preimage = format!("global:{}", method);
    let hash = hash(preimage.as_bytes());
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash.to_bytes()[..8]);
    discriminator
}

fn instruction_data<T: BorshSerialize>(method: &str, args: &T) -> Result<Vec<u8>, LedgerError> {
    let mut data = anchor_discriminator(method).to_vec();
    args.serialize(&mut data)
        .map_err(|e| LedgerError::Encoding(format!("{}: {}", method, e)))?;
    Ok(data)
}

#[derive(BorshSerialize)]
struct SubmitProjectArgs {
    domain_hash: Payload,
    project_name: String,
    transparency_score: u32,
    risk_level: u8,
    certificate_validity_hash: Payload,
}

#[derive(BorshSerialize)]
struct VoteOnProjectArgs {
    domain_hash: Payload,
    is_legitimate: bool,
    confidence_level: u8,
}

#[derive(BorshSerialize)]
struct VerifyProofArgs {
    domain_hash: Payload,
    proof_hash: Payload,
    public_inputs: Vec<u8>,
    is_valid: bool,
}

/// Truncate on a char boundary to fit the program's name limit
pub fn project_name(domain: &str) -> String {
    let mut end = domain.len().min(MAX_PROJECT_NAME);
    while !domain.is_char_boundary(end) {
        end -= 1;
    }
    domain[..end].to_string()
}

/// Client for the attestation program at a given address
#[derive(Debug, Clone, Copy)]
pub struct AttestationProgram {
    pub program_id: Pubkey,
}

impl AttestationProgram {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn attestation_pda(&self) -> Pubkey {
        Pubkey::find_program_address(&[ATTESTATION], &self.program_id).0
    }

    pub fn project_pda(&self, domain_hash: &Payload) -> Pubkey {
        Pubkey::find_program_address(&[PROJECT, domain_hash.as_ref()], &self.program_id).0
    }

    pub fn vote_pda(&self, domain_hash: &Payload, voter: &Pubkey) -> Pubkey {
        let seeds = [VOTE, domain_hash.as_ref(), voter.as_ref()];
        Pubkey::find_program_address(&seeds, &self.program_id).0
    }

    /// The deployed program binds this seed to the first instruction
    /// argument, which is the domain hash.
    pub fn proof_pda(&self, domain_hash: &Payload) -> Pubkey {
        Pubkey::find_program_address(&[PROOF, domain_hash.as_ref()], &self.program_id).0
    }

    pub fn initialize(&self, authority: &Pubkey) -> Submission {
        let attestation = self.attestation_pda();
        Submission {
            label: "initialize",
            instructions: vec![Instruction {
                program_id: self.program_id,
                accounts: vec![
                    AccountMeta::new(attestation, false),
                    AccountMeta::new(*authority, true),
                    AccountMeta::new_readonly(system_program, false),
                ],
                data: anchor_discriminator("initialize").to_vec(),
            }],
            creates: vec![attestation],
        }
    }

    pub fn submit_project(
        &self,
        submitter: &Pubkey,
        domain_hash: Payload,
        domain: &str,
        transparency_score: u32,
        risk_level: u8,
        certificate_validity_hash: Payload,
    ) -> Result<Submission, LedgerError> {
        let project = self.project_pda(&domain_hash);
        let args = SubmitProjectArgs {
            domain_hash,
            project_name: project_name(domain),
            transparency_score,
            risk_level,
            certificate_validity_hash,
        };

        Ok(Submission {
            label: "submit_project",
            instructions: vec![Instruction {
                program_id: self.program_id,
                accounts: vec![
                    AccountMeta::new(self.attestation_pda(), false),
                    AccountMeta::new(project, false),
                    AccountMeta::new(*submitter, true),
                    AccountMeta::new_readonly(system_program, false),
                ],
                data: instruction_data("submit_project", &args)?,
            }],
            creates: vec![project],
        })
    }

    pub fn vote_on_project(
        &self,
        voter: &Pubkey,
        domain_hash: Payload,
        is_legitimate: bool,
        confidence_level: u8,
    ) -> Result<Submission, LedgerError> {
        let vote_record = self.vote_pda(&domain_hash, voter);
        let args = VoteOnProjectArgs { domain_hash, is_legitimate, confidence_level };

        Ok(Submission {
            label: "vote_on_project",
            instructions: vec![Instruction {
                program_id: self.program_id,
                accounts: vec![
                    AccountMeta::new(self.project_pda(&domain_hash), false),
                    AccountMeta::new(vote_record, false),
                    AccountMeta::new(*voter, true),
                    AccountMeta::new_readonly(system_program, false),
                ],
                data: instruction_data("vote_on_project", &args)?,
            }],
            creates: vec![vote_record],
        })
    }

    pub fn verify_zk_tls_proof(
        &self,
        submitter: &Pubkey,
        verifier: &Pubkey,
        domain_hash: Payload,
        proof_hash: Payload,
        public_inputs: Vec<u8>,
        is_valid: bool,
    ) -> Result<Submission, LedgerError> {
        let proof_record = self.proof_pda(&domain_hash);
        let args = VerifyProofArgs { domain_hash, proof_hash, public_inputs, is_valid };

        Ok(Submission {
            label: "verify_zk_tls_proof",
            instructions: vec![Instruction {
                program_id: self.program_id,
                accounts: vec![
                    AccountMeta::new(self.attestation_pda(), false),
                    AccountMeta::new(proof_record, false),
                    AccountMeta::new(*submitter, true),
                    AccountMeta::new_readonly(*verifier, true),
                    AccountMeta::new_readonly(system_program, false),
                ],
                data: instruction_data("verify_zk_tls_proof", &args)?,
            }],
            creates: vec![proof_record],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::str::FromStr;

    fn program() -> AttestationProgram {
        AttestationProgram::new(Pubkey::from_str(crate::constants::DEFAULT_PROGRAM_ID).unwrap())
    }

    #[test]
    fn test_discriminator_matches_anchor() {
        let digest = Sha256::digest(b"global:vote_on_project");
        assert_eq!(anchor_discriminator("vote_on_project"), digest[..8]);
    }

    #[test]
    fn test_vote_instruction_layout() {
        let voter = Pubkey::new_from_array([9u8; 32]);
        let submission = program().vote_on_project(&voter, [1u8; 32], true, 7).unwrap();
        let ix = &submission.instructions[0];

        assert_eq!(&ix.data[..8], &anchor_discriminator("vote_on_project"));
        assert_eq!(&ix.data[8..40], &[1u8; 32]);
        assert_eq!(ix.data[40], 1);
        assert_eq!(ix.data[41], 7);
        assert_eq!(ix.data.len(), 42);

        assert_eq!(ix.accounts[0].pubkey, program().project_pda(&[1u8; 32]));
        assert_eq!(ix.accounts[2].pubkey, voter);
        assert!(ix.accounts[2].is_signer);
        assert_eq!(submission.creates, vec![program().vote_pda(&[1u8; 32], &voter)]);
    }

    #[test]
    fn test_submit_project_encodes_name_with_length_prefix() {
        let submitter = Pubkey::new_from_array([3u8; 32]);
        let submission = program()
            .submit_project(&submitter, [2u8; 32], "github.com", 70, 5, [4u8; 32])
            .unwrap();
        let data = &submission.instructions[0].data;

        assert_eq!(&data[8..40], &[2u8; 32]);
        assert_eq!(&data[40..44], &10u32.to_le_bytes());
        assert_eq!(&data[44..54], b"github.com");
        assert_eq!(&data[54..58], &70u32.to_le_bytes());
        assert_eq!(data[58], 5);
        assert_eq!(&data[59..91], &[4u8; 32]);
    }

    #[test]
    fn test_verify_instruction_public_inputs_vec() {
        let relayer = Pubkey::new_from_array([5u8; 32]);
        let submission = program()
            .verify_zk_tls_proof(&relayer, &relayer, [1u8; 32], [2u8; 32], vec![8u8; 32], false)
            .unwrap();
        let data = &submission.instructions[0].data;

        assert_eq!(&data[72..76], &32u32.to_le_bytes());
        assert_eq!(data[data.len() - 1], 0);
        assert_eq!(submission.creates, vec![program().proof_pda(&[1u8; 32])]);
    }

    #[test]
    fn test_pdas_are_distinct_per_domain() {
        let p = program();
        assert_ne!(p.project_pda(&[1u8; 32]), p.project_pda(&[2u8; 32]));
        assert_ne!(p.project_pda(&[1u8; 32]), p.proof_pda(&[1u8; 32]));
        assert_eq!(p.attestation_pda(), p.attestation_pda());
    }

    #[test]
    fn test_project_name_truncated() {
        let long = "a".repeat(150);
        assert_eq!(project_name(&long).len(), MAX_PROJECT_NAME);
        assert_eq!(project_name("github.com"), "github.com");
    }
}
