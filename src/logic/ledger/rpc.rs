//! JSON-RPC ledger
//!
//! Signs relayed submissions with the relayer keypair and sends them
//! through `sendTransaction`. Wallet-signed votes are forwarded as they are.

use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};

use super::instructions::{SignedSubmission, Submission};
use super::{encode_transaction, Ledger, LedgerError};

/// Marker the system program logs when `init` hits an existing account
const ALREADY_IN_USE: &str = "already in use";

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct BlockhashResult {
    value: BlockhashValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
}

pub struct RpcLedger {
    rpc_url: String,
    relayer: Keypair,
    http_client: reqwest::Client,
}

impl RpcLedger {
    pub fn new(rpc_url: &str, relayer: Keypair) -> Result<Self, LedgerError> {
        let http_client = reqwest::Client::builder()
            .user_agent(crate::constants::USER_AGENT)
            .build()
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            relayer,
            http_client,
        })
    }

    async fn call<T>(&self, method: &str, params: Value) -> Result<T, LedgerError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LedgerError::Rpc { code: i64::from(status), message: text });
        }

        let reply: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        if let Some(error) = reply.error {
            return Err(map_rpc_error(error));
        }
        reply
            .result
            .ok_or_else(|| LedgerError::InvalidResponse(format!("{} returned no result", method)))
    }

    async fn send(&self, label: &str, transaction: &Transaction) -> Result<String, LedgerError> {
        let encoded = encode_transaction(transaction)?;

        tracing::info!("Sending {} to {}", label, self.rpc_url);
        let signature: String = self
            .call(
                "sendTransaction",
                json!([encoded, { "encoding": "base64", "preflightCommitment": "confirmed" }]),
            )
            .await?;

        tracing::info!("{} confirmed as {}", label, signature);
        Ok(signature)
    }
}

fn map_rpc_error(error: RpcErrorBody) -> LedgerError {
    let logs_mention_existing = error
        .data
        .as_ref()
        .and_then(|d| d.get("logs"))
        .and_then(Value::as_array)
        .map(|logs| logs.iter().filter_map(Value::as_str).any(|l| l.contains(ALREADY_IN_USE)))
        .unwrap_or(false);

    if logs_mention_existing || error.message.contains(ALREADY_IN_USE) {
        LedgerError::AccountAlreadyExists(error.message)
    } else {
        LedgerError::Rpc { code: error.code, message: error.message }
    }
}

/// Parse a keypair file: JSON array of 64 bytes, secret key then public key
pub fn keypair_from_json(contents: &str) -> Result<Keypair, LedgerError> {
    let bytes: Vec<u8> =
        serde_json::from_str(contents).map_err(|e| LedgerError::Keypair(e.to_string()))?;
    if bytes.len() != 64 {
        return Err(LedgerError::Keypair(format!("expected 64 bytes, found {}", bytes.len())));
    }
    let mut secret = [0u8; 32];
    secret.copy_from_slice(&bytes[..32]);
    let keypair = Keypair::new_from_array(secret);

    if keypair.pubkey().to_bytes()[..] != bytes[32..] {
        return Err(LedgerError::Keypair(
            "public key does not match the secret key".to_string(),
        ));
    }
    Ok(keypair)
}

#[async_trait]
impl Ledger for RpcLedger {
    fn payer(&self) -> Pubkey {
        self.relayer.pubkey()
    }

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        let result: BlockhashResult = self
            .call("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;
        Hash::from_str(&result.value.blockhash)
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    async fn submit(&self, submission: Submission) -> Result<String, LedgerError> {
        let blockhash = self.latest_blockhash().await?;
        let payer = self.relayer.pubkey();
        let tx = Transaction::new_signed_with_payer(
            &submission.instructions,
            Some(&payer),
            &[&self.relayer],
            blockhash,
        );
        self.send(submission.label, &tx).await
    }

    async fn submit_signed(&self, submission: SignedSubmission) -> Result<String, LedgerError> {
        self.send(submission.label, &submission.transaction).await
    }
}
