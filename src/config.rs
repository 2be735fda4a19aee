//! Configuration module

use std::env;

use crate::constants;

/// Which analyzer variant the process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerMode {
    /// Keyword table over the domain string, no network access
    Heuristic,
    /// Certificate, repository and path probes
    Network,
}

impl AnalyzerMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "network" | "network-assisted" => Self::Network,
            _ => Self::Heuristic,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Solana JSON-RPC endpoint
    pub rpc_url: String,

    /// Deployed attestation program address (base58)
    pub program_id: String,

    /// Target network name (devnet, mainnet-beta, local)
    pub network: String,

    /// Server port
    pub port: u16,

    /// Optional bearer token for the repository API
    pub github_token: Option<String>,

    /// Analyzer variant
    pub analyzer_mode: AnalyzerMode,

    /// Keypair file used to sign ledger submissions
    pub relayer_keypair_path: Option<String>,

    /// Idle seconds before a session is evicted
    pub session_ttl_secs: i64,

    /// Session capacity
    pub max_sessions: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            rpc_url: env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| constants::DEFAULT_RPC_URL.to_string()),

            program_id: env::var("ATTESTATION_PROGRAM_ID")
                .unwrap_or_else(|_| constants::DEFAULT_PROGRAM_ID.to_string()),

            network: env::var("SOLANA_NETWORK")
                .unwrap_or_else(|_| constants::DEFAULT_NETWORK.to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(constants::DEFAULT_PORT),

            github_token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),

            analyzer_mode: env::var("ANALYZER_MODE")
                .map(|m| AnalyzerMode::parse(&m))
                .unwrap_or(AnalyzerMode::Heuristic),

            relayer_keypair_path: env::var("RELAYER_KEYPAIR_PATH").ok().filter(|p| !p.is_empty()),

            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .filter(|t| *t > 0)
                .unwrap_or(constants::DEFAULT_SESSION_TTL_SECS),

            max_sessions: env::var("MAX_SESSIONS")
                .ok()
                .and_then(|m| m.parse().ok())
                .filter(|m| *m > 0)
                .unwrap_or(constants::DEFAULT_MAX_SESSIONS),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Configuration for tests and local runs: heuristic analyzer, in-memory ledger
    pub fn local() -> Self {
        Self {
            rpc_url: constants::DEFAULT_RPC_URL.to_string(),
            program_id: constants::DEFAULT_PROGRAM_ID.to_string(),
            network: constants::LOCAL_NETWORK.to_string(),
            port: constants::DEFAULT_PORT,
            github_token: None,
            analyzer_mode: AnalyzerMode::Heuristic,
            relayer_keypair_path: None,
            session_ttl_secs: constants::DEFAULT_SESSION_TTL_SECS,
            max_sessions: constants::DEFAULT_MAX_SESSIONS,
            environment: "development".to_string(),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if ledger submissions stay in-process
    pub fn uses_local_ledger(&self) -> bool {
        self.network == constants::LOCAL_NETWORK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_mode_parse() {
        assert_eq!(AnalyzerMode::parse("network"), AnalyzerMode::Network);
        assert_eq!(AnalyzerMode::parse(" Network "), AnalyzerMode::Network);
        assert_eq!(AnalyzerMode::parse("heuristic"), AnalyzerMode::Heuristic);
        assert_eq!(AnalyzerMode::parse("anything-else"), AnalyzerMode::Heuristic);
    }

    #[test]
    fn test_local_config_uses_local_ledger() {
        let config = Config::local();
        assert!(config.uses_local_ledger());
        assert!(!config.is_production());
        assert_eq!(config.program_id, constants::DEFAULT_PROGRAM_ID);
    }
}
