//! Central Configuration Constants
//!
//! Single source of truth for configuration defaults.
//! `Config::from_env` falls back to these when a variable is not set.

/// Default Solana RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Default attestation program address
pub const DEFAULT_PROGRAM_ID: &str = "4jGQ4kaxDsPJ57u1iN8gX1X7ngBji2Z8R8ERmcVp1BLW";

/// Default target network
pub const DEFAULT_NETWORK: &str = "devnet";

/// Network name that selects the in-process ledger
pub const LOCAL_NETWORK: &str = "local";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Repository hosting API
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// User agent sent with every outbound probe (GitHub rejects requests without one)
pub const USER_AGENT: &str = concat!("transparency-rating/", env!("CARGO_PKG_VERSION"));

/// Header carrying the connected wallet's public key
pub const WALLET_HEADER: &str = "x-wallet-pubkey";

/// Idle time after which a session is dropped
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Most sessions held at once
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// How often idle sessions are swept
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
