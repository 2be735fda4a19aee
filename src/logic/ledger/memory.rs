//! Process-local ledger
//!
//! Used for the `local` network and tests. Enforces what the shim relies on:
//! an account can only be created once, and wallet-signed transactions must
//! carry valid signatures.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};

use super::instructions::{SignedSubmission, Submission};
use super::{Ledger, LedgerError};

#[derive(Debug, Clone)]
pub struct RecordedTransaction {
    pub label: &'static str,
    pub signature: String,
    pub data: Vec<Vec<u8>>,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashSet<Pubkey>,
    transactions: Vec<RecordedTransaction>,
    fail_next: Option<String>,
}

pub struct MemoryLedger {
    payer: Pubkey,
    state: Mutex<MemoryState>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            payer: Keypair::new().pubkey(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Reject the next submission, as a wallet or RPC node would
    pub fn fail_next(&self, message: &str) {
        self.state.lock().fail_next = Some(message.to_string());
    }

    pub fn transactions(&self) -> Vec<RecordedTransaction> {
        self.state.lock().transactions.clone()
    }

    pub fn account_exists(&self, account: &Pubkey) -> bool {
        self.state.lock().accounts.contains(account)
    }

    fn signature_for(label: &str, sequence: usize) -> Signature {
        let first = Sha256::new()
            .chain_update(label.as_bytes())
            .chain_update(sequence.to_le_bytes())
            .finalize();
        let second = Sha256::digest(first);

        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&first);
        bytes[32..].copy_from_slice(&second);
        Signature::from(bytes)
    }

    /// Check the creation rule and record the transaction under `signature`
    fn accept(
        state: &mut MemoryState,
        label: &'static str,
        creates: &[Pubkey],
        signature: String,
        data: Vec<Vec<u8>>,
    ) -> Result<String, LedgerError> {
        if let Some(existing) = creates.iter().find(|a| state.accounts.contains(*a)) {
            return Err(LedgerError::AccountAlreadyExists(existing.to_string()));
        }

        state.accounts.extend(creates.iter().copied());
        state.transactions.push(RecordedTransaction {
            label,
            signature: signature.clone(),
            data,
        });

        tracing::debug!("Memory ledger accepted {} as {}", label, signature);
        Ok(signature)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn payer(&self) -> Pubkey {
        self.payer
    }

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&Sha256::digest(b"memory-ledger"));
        Ok(Hash::new_from_array(bytes))
    }

    async fn submit(&self, submission: Submission) -> Result<String, LedgerError> {
        let mut state = self.state.lock();

        if let Some(message) = state.fail_next.take() {
            return Err(LedgerError::Rejected(message));
        }

        let signature = Self::signature_for(submission.label, state.transactions.len()).to_string();
        let data = submission.instructions.into_iter().map(|ix| ix.data).collect();
        Self::accept(&mut state, submission.label, &submission.creates, signature, data)
    }

    async fn submit_signed(&self, submission: SignedSubmission) -> Result<String, LedgerError> {
        let transaction = submission.transaction;
        transaction
            .verify()
            .map_err(|e| LedgerError::InvalidSignature(e.to_string()))?;
        let signature = transaction
            .signatures
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| LedgerError::InvalidTransaction("no signatures".to_string()))?;

        let mut state = self.state.lock();
        if let Some(message) = state.fail_next.take() {
            return Err(LedgerError::Rejected(message));
        }

        let data = transaction.message.instructions.into_iter().map(|ix| ix.data).collect();
        Self::accept(&mut state, submission.label, &submission.creates, signature, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ledger::instructions::AttestationProgram;
    use tokio_test::{assert_err, assert_ok};

    fn program() -> AttestationProgram {
        AttestationProgram::new(Pubkey::new_from_array([42u8; 32]))
    }

    #[tokio::test]
    async fn test_accounts_created_once() {
        let ledger = MemoryLedger::new();
        let payer = ledger.payer();

        assert_ok!(ledger.submit(program().initialize(&payer)).await);
        let err = assert_err!(ledger.submit(program().initialize(&payer)).await);

        assert!(matches!(err, LedgerError::AccountAlreadyExists(_)));
        assert!(ledger.account_exists(&program().attestation_pda()));
        assert_eq!(ledger.transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_signatures_are_unique_and_deterministic() {
        let ledger = MemoryLedger::new();
        let payer = ledger.payer();

        let a = ledger.submit(program().initialize(&payer)).await.unwrap();
        let b = ledger
            .submit(program().vote_on_project(&payer, [1u8; 32], true, 5).unwrap())
            .await
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(a, MemoryLedger::signature_for("initialize", 0).to_string());
    }

    #[tokio::test]
    async fn test_fail_next_rejects_once() {
        let ledger = MemoryLedger::new();
        let payer = ledger.payer();
        ledger.fail_next("User rejected the request");

        let err = ledger.submit(program().initialize(&payer)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
        assert!(!ledger.account_exists(&program().attestation_pda()));

        assert_ok!(ledger.submit(program().initialize(&payer)).await);
    }

    fn signed_vote(wallet: &Keypair, blockhash: Hash) -> SignedSubmission {
        let submission = program().vote_on_project(&wallet.pubkey(), [1u8; 32], true, 5).unwrap();
        let transaction = solana_sdk::transaction::Transaction::new_signed_with_payer(
            &submission.instructions,
            Some(&wallet.pubkey()),
            &[wallet],
            blockhash,
        );
        SignedSubmission { label: submission.label, transaction, creates: submission.creates }
    }

    #[tokio::test]
    async fn test_signed_submission_recorded_under_wallet_signature() {
        let ledger = MemoryLedger::new();
        let wallet = Keypair::new();
        let blockhash = ledger.latest_blockhash().await.unwrap();
        let submission = signed_vote(&wallet, blockhash);
        let expected = submission.transaction.signatures[0].to_string();

        let signature = ledger.submit_signed(submission.clone()).await.unwrap();
        assert_eq!(signature, expected);
        assert!(ledger.account_exists(&program().vote_pda(&[1u8; 32], &wallet.pubkey())));

        let err = assert_err!(ledger.submit_signed(submission).await);
        assert!(matches!(err, LedgerError::AccountAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_unsigned_submission_rejected() {
        let ledger = MemoryLedger::new();
        let wallet = Keypair::new();
        let mut submission = signed_vote(&wallet, Hash::default());
        submission.transaction.signatures[0] = Signature::default();

        let err = assert_err!(ledger.submit_signed(submission).await);
        assert!(matches!(err, LedgerError::InvalidSignature(_)));
        assert!(ledger.transactions().is_empty());
    }
}
