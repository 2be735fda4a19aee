//! Scoring Rules & Tables
//!
//! Keyword deltas, allow-lists and probe path tables.
//! No scoring logic lives here - only the data it runs on.

// ============================================================================
// STRING-HEURISTIC VARIANT
// ============================================================================

pub const BASE_SCORE: i32 = 50;
pub const BASE_RISK: i32 = 5;

/// Score and risk pinned for domains that match a fraud keyword
pub const FRAUD_SCORE: u32 = 10;
pub const FRAUD_RISK: u8 = 10;

/// Any of these short-circuits the keyword table
pub const FRAUD_KEYWORDS: [&str; 3] = ["scam", "fake", "phishing"];

/// Metadata flag a keyword rule sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    PublicGithub,
    DocumentedRoadmap,
    AuditReports,
    TeamVerification,
    TokenEconomics,
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub keyword: &'static str,
    pub score_delta: i32,
    pub risk_delta: i32,
    pub flag: Option<Flag>,
}

/// Evaluated top to bottom; every matching rule applies
pub const KEYWORD_RULES: [KeywordRule; 7] = [
    KeywordRule {
        keyword: "github",
        score_delta: 20,
        risk_delta: 0,
        flag: Some(Flag::PublicGithub),
    },
    KeywordRule {
        keyword: "official",
        score_delta: 10,
        risk_delta: -1,
        flag: Some(Flag::TeamVerification),
    },
    KeywordRule {
        keyword: "audit",
        score_delta: 15,
        risk_delta: -2,
        flag: Some(Flag::AuditReports),
    },
    KeywordRule {
        keyword: "roadmap",
        score_delta: 10,
        risk_delta: 0,
        flag: Some(Flag::DocumentedRoadmap),
    },
    KeywordRule {
        keyword: "token",
        score_delta: 5,
        risk_delta: 1,
        flag: Some(Flag::TokenEconomics),
    },
    KeywordRule {
        keyword: "test",
        score_delta: -15,
        risk_delta: 2,
        flag: None,
    },
    KeywordRule {
        keyword: "new",
        score_delta: -10,
        risk_delta: 1,
        flag: None,
    },
];

// ============================================================================
// NETWORK-ASSISTED VARIANT
// ============================================================================

/// Baseline for allow-listed domains; the score never drops below it
pub const ESTABLISHED_BASE_SCORE: u32 = 85;
pub const ESTABLISHED_BONUS: u32 = 5;
pub const ESTABLISHED_RISK: u8 = 1;
pub const ESTABLISHED_CERT_PENALTY: u8 = 3;

/// Matched exactly or as a parent of a subdomain
pub const ESTABLISHED_DOMAINS: [&str; 20] = [
    "google.com",
    "microsoft.com",
    "apple.com",
    "amazon.com",
    "facebook.com",
    "twitter.com",
    "linkedin.com",
    "youtube.com",
    "netflix.com",
    "paypal.com",
    "stripe.com",
    "github.com",
    "wikipedia.org",
    "reddit.com",
    "stackoverflow.com",
    "shopify.com",
    "adobe.com",
    "ibm.com",
    "oracle.com",
    "salesforce.com",
];

/// Repositories tried before any guessing
pub const KNOWN_REPOSITORIES: [(&str, &str); 13] = [
    ("solana.com", "solana-labs/solana"),
    ("ethereum.org", "ethereum/go-ethereum"),
    ("bitcoin.org", "bitcoin/bitcoin"),
    ("uniswap.org", "Uniswap/v3-core"),
    ("aave.com", "aave/aave-v3-core"),
    ("chain.link", "smartcontractkit/chainlink"),
    ("near.org", "near/nearcore"),
    ("polygon.technology", "maticnetwork/bor"),
    ("metamask.io", "MetaMask/metamask-extension"),
    ("anchor-lang.com", "coral-xyz/anchor"),
    ("rust-lang.org", "rust-lang/rust"),
    ("raydium.io", "raydium-io/raydium-amm"),
    ("orca.so", "orca-so/whirlpools"),
];

/// Repository names tried for every guessed owner
pub const REPOSITORY_NAME_GUESSES: [&str; 2] = ["", "website"];

pub const ROADMAP_PATHS: [&str; 4] = ["/roadmap", "/docs/roadmap", "/about/roadmap", "/milestones"];
pub const AUDIT_PATHS: [&str; 4] = ["/audit", "/audits", "/security/audit", "/docs/security"];
pub const TEAM_PATHS: [&str; 4] = ["/team", "/about/team", "/about", "/leadership"];
pub const TOKENOMICS_PATHS: [&str; 4] =
    ["/tokenomics", "/token-economics", "/whitepaper", "/docs/tokenomics"];

pub const ROADMAP_KEYWORDS: [&str; 3] = ["roadmap", "milestone", "development plan"];
pub const AUDIT_KEYWORDS: [&str; 4] = ["security audit", "certik", "quantstamp", "trail of bits"];
pub const TOKENOMICS_KEYWORDS: [&str; 3] = ["tokenomics", "token economics", "utility token"];
/// A team page must mention at least one of these
pub const TEAM_KEYWORDS: [&str; 6] = ["team", "founder", "ceo", "cto", "developer", "engineer"];

// Unknown-domain weights
pub const GITHUB_WEIGHT: u32 = 25;
pub const ROADMAP_WEIGHT: u32 = 20;
pub const AUDIT_WEIGHT: u32 = 25;
pub const TEAM_WEIGHT: u32 = 15;
pub const TOKENOMICS_WEIGHT: u32 = 15;
pub const MAX_STAR_BONUS: u32 = 10;

pub const INVALID_CERT_RISK: u8 = 5;
pub const UNSTARRED_REPO_RISK: u8 = 2;
pub const LOW_REVIEW_RISK: u8 = 3;
pub const LOW_REVIEW_THRESHOLD: u8 = 30;

/// Allow-list match: exact domain or a subdomain of a listed one
pub fn is_established(domain: &str) -> bool {
    ESTABLISHED_DOMAINS.iter().any(|established| {
        domain == *established
            || domain
                .strip_suffix(established)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

pub fn known_repository(domain: &str) -> Option<&'static str> {
    KNOWN_REPOSITORIES
        .iter()
        .find(|(known, _)| *known == domain)
        .map(|(_, repo)| *repo)
}
