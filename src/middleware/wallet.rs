//! Wallet middleware
//!
//! The connected wallet is identified by its base58 public key in the
//! `x-wallet-pubkey` header. No signature is checked.

use std::str::FromStr;

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use solana_sdk::pubkey::Pubkey;

use crate::constants::WALLET_HEADER;
use crate::AppError;

/// Wallet context extracted from the request
#[derive(Debug, Clone, Copy)]
pub struct WalletContext {
    pub pubkey: Pubkey,
}

fn wallet_from_parts(parts: &Parts) -> Result<WalletContext, AppError> {
    let value = parts
        .headers
        .get(WALLET_HEADER)
        .ok_or(AppError::WalletRequired)?
        .to_str()
        .map_err(|_| AppError::InvalidWallet("Wallet header is not valid text".to_string()))?;

    let pubkey = Pubkey::from_str(value.trim()).map_err(|_| {
        AppError::InvalidWallet("Wallet header is not a valid public key".to_string())
    })?;

    Ok(WalletContext { pubkey })
}

/// Middleware: Require a connected wallet
pub async fn require_wallet(req: Request, next: Next) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();
    let wallet = wallet_from_parts(&parts)?;
    parts.extensions.insert(wallet);

    Ok(next.run(Request::from_parts(parts, body)).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for WalletContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(wallet) = parts.extensions.get::<WalletContext>() {
            return Ok(*wallet);
        }
        wallet_from_parts(parts)
    }
}
