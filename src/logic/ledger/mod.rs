//! Ledger Submission Shim
//!
//! Turns an analysis, its proof witness and the voter's decision into
//! attestation program instructions and hands them to a `Ledger`.
//!
//! The relayer registers projects and attests verifications. Votes are
//! signed by the connected wallet: the shim prepares the vote transaction
//! with the wallet as fee payer and voter, and forwards it once the wallet
//! has signed it.

pub mod instructions;
pub mod memory;
pub mod rpc;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::{
    hash::Hash,
    message::Message,
    pubkey::Pubkey,
    signature::Keypair,
    transaction::Transaction,
};

pub use instructions::{AttestationProgram, SignedSubmission, Submission};
pub use memory::MemoryLedger;
pub use rpc::RpcLedger;

use crate::config::Config;
use crate::logic::proof::{ProofCheck, ProofWitness};
use crate::models::{AnalysisResult, Vote};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Invalid program id: {0}")]
    InvalidProgramId(String),

    #[error("Keypair error: {0}")]
    Keypair(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

/// Somewhere transactions can be sent
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fee payer and signer for relayed submissions
    fn payer(&self) -> Pubkey;

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError>;

    /// Sign with the relayer, submit, and return the transaction signature
    async fn submit(&self, submission: Submission) -> Result<String, LedgerError>;

    /// Forward a transaction that is already fully signed
    async fn submit_signed(&self, submission: SignedSubmission) -> Result<String, LedgerError>;
}

/// Base64 of the bincode wire format, as wallets and `sendTransaction` use it
pub fn encode_transaction(transaction: &Transaction) -> Result<String, LedgerError> {
    let bytes = bincode::serialize(transaction).map_err(|e| LedgerError::Encoding(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

pub fn decode_transaction(encoded: &str) -> Result<Transaction, LedgerError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| LedgerError::InvalidTransaction(e.to_string()))?;
    bincode::deserialize(&bytes).map_err(|e| LedgerError::InvalidTransaction(e.to_string()))
}

/// Decode a wallet-signed transaction and check every signature
pub fn decode_signed(encoded: &str) -> Result<Transaction, LedgerError> {
    let transaction = decode_transaction(encoded)?;
    transaction
        .verify()
        .map_err(|e| LedgerError::InvalidSignature(e.to_string()))?;
    Ok(transaction)
}

/// Vote transaction waiting for the wallet's signature
#[derive(Debug, Clone)]
pub struct PreparedVote {
    pub voter: Pubkey,
    pub vote_record: Pubkey,
    pub transaction: Transaction,
    /// `transaction`, unsigned, in wire encoding
    pub encoded: String,
}

impl PreparedVote {
    pub fn matches(&self, signed: &Transaction) -> bool {
        self.transaction.message == signed.message
    }
}

/// Attestation workflow on top of a ledger
#[derive(Clone)]
pub struct AttestationClient {
    program: AttestationProgram,
    ledger: Arc<dyn Ledger>,
}

impl AttestationClient {
    pub fn new(program: AttestationProgram, ledger: Arc<dyn Ledger>) -> Self {
        Self { program, ledger }
    }

    pub fn program(&self) -> &AttestationProgram {
        &self.program
    }

    /// Account creation that tolerates the account already existing
    async fn submit_once(&self, submission: Submission) -> Result<Option<String>, LedgerError> {
        let label = submission.label;
        match self.ledger.submit(submission).await {
            Ok(signature) => Ok(Some(signature)),
            Err(LedgerError::AccountAlreadyExists(_)) => {
                tracing::debug!("{} skipped, account already exists", label);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// initialize and submit_project, each skipped when already on the ledger
    async fn register_project(
        &self,
        analysis: &AnalysisResult,
        witness: &ProofWitness,
    ) -> Result<(), LedgerError> {
        let payer = self.ledger.payer();

        self.submit_once(self.program.initialize(&payer)).await?;
        self.submit_once(self.program.submit_project(
            &payer,
            witness.domain_hash,
            &analysis.domain,
            analysis.transparency_score,
            analysis.risk_level,
            witness.certificate_validity_hash,
        )?)
        .await?;
        Ok(())
    }

    /// Register the project, then build the vote transaction for `voter` to
    /// sign. Each wallet gets its own vote record per domain.
    pub async fn prepare_vote(
        &self,
        analysis: &AnalysisResult,
        witness: &ProofWitness,
        vote: &Vote,
        voter: &Pubkey,
    ) -> Result<PreparedVote, LedgerError> {
        self.register_project(analysis, witness).await?;

        let submission = self.program.vote_on_project(
            voter,
            witness.domain_hash,
            vote.is_legitimate,
            vote.confidence_level,
        )?;
        let blockhash = self.ledger.latest_blockhash().await?;
        let message =
            Message::new_with_blockhash(&submission.instructions, Some(voter), &blockhash);
        let transaction = Transaction::new_unsigned(message);
        let encoded = encode_transaction(&transaction)?;

        tracing::info!("Vote on {} prepared for wallet {}", analysis.domain, voter);
        Ok(PreparedVote {
            voter: *voter,
            vote_record: self.program.vote_pda(&witness.domain_hash, voter),
            transaction,
            encoded,
        })
    }

    /// Forward the wallet-signed vote. Returns the vote transaction signature.
    pub async fn submit_signed_vote(
        &self,
        prepared: &PreparedVote,
        signed: Transaction,
    ) -> Result<String, LedgerError> {
        if !prepared.matches(&signed) {
            return Err(LedgerError::InvalidTransaction(
                "signed transaction differs from the prepared vote".to_string(),
            ));
        }

        let signature = self
            .ledger
            .submit_signed(SignedSubmission {
                label: "vote_on_project",
                transaction: signed,
                creates: vec![prepared.vote_record],
            })
            .await?;

        tracing::info!("Vote by {} recorded in {}", prepared.voter, signature);
        Ok(signature)
    }

    /// Attest the verification result. The proof record is per domain, so
    /// `None` means an earlier verification of the domain already holds it.
    pub async fn submit_verification(
        &self,
        witness: &ProofWitness,
        check: &ProofCheck,
    ) -> Result<Option<String>, LedgerError> {
        let payer = self.ledger.payer();
        let submission = self.program.verify_zk_tls_proof(
            &payer,
            &payer,
            witness.domain_hash,
            witness.proof_hash,
            witness.public_inputs.to_vec(),
            check.is_valid,
        )?;
        self.submit_once(submission).await
    }
}

fn load_relayer(path: Option<&str>) -> Result<Keypair, LedgerError> {
    match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| LedgerError::Keypair(format!("{}: {}", path, e)))?;
            rpc::keypair_from_json(&contents)
        }
        None => {
            tracing::warn!("RELAYER_KEYPAIR_PATH not set, using an ephemeral unfunded relayer");
            Ok(Keypair::new())
        }
    }
}

/// Memory ledger for the `local` network, JSON-RPC otherwise
pub fn build_attestation_client(config: &Config) -> Result<AttestationClient, LedgerError> {
    let program_id = Pubkey::from_str(&config.program_id)
        .map_err(|e| LedgerError::InvalidProgramId(format!("{}: {}", config.program_id, e)))?;

    let ledger: Arc<dyn Ledger> = if config.uses_local_ledger() {
        tracing::info!("Using in-memory ledger");
        Arc::new(MemoryLedger::new())
    } else {
        let relayer = load_relayer(config.relayer_keypair_path.as_deref())?;
        tracing::info!("Using RPC ledger at {} on {}", config.rpc_url, config.network);
        Arc::new(RpcLedger::new(&config.rpc_url, relayer)?)
    };

    Ok(AttestationClient::new(AttestationProgram::new(program_id), ledger))
}
