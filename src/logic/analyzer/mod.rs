//! Transparency Analyzer
//!
//! Two variants share one contract: `analyze(domain) -> AnalysisResult`,
//! which never fails. The process runs exactly one of them, picked by
//! `ANALYZER_MODE`.

pub mod github;
pub mod heuristic;
pub mod network;
pub mod probe;
pub mod rules;

use std::sync::Arc;

use async_trait::async_trait;

pub use heuristic::HeuristicAnalyzer;
pub use network::NetworkAnalyzer;

use crate::config::{AnalyzerMode, Config};
use crate::models::AnalysisResult;
use probe::{ProbeError, ReqwestTransport};

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain cannot form a url: {0}")]
    InvalidDomain(String),
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Analyze a normalized domain. Internal failures yield
    /// `AnalysisResult::fallback`.
    async fn analyze(&self, domain: &str) -> AnalysisResult;
}

/// Build the analyzer selected by configuration
pub fn build_analyzer(config: &Config) -> Result<Arc<dyn Analyzer>, ProbeError> {
    match config.analyzer_mode {
        AnalyzerMode::Heuristic => Ok(Arc::new(HeuristicAnalyzer::new())),
        AnalyzerMode::Network => {
            let transport = ReqwestTransport::new()?;
            Ok(Arc::new(NetworkAnalyzer::new(Arc::new(transport), config.github_token.clone())))
        }
    }
}
