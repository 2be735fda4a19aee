//! HTTP probing
//!
//! Transport seam for every outbound check the network analyzer makes.
//! Errors never leave this layer as errors: they become `ProbeOutcome`s.

use async_trait::async_trait;

use crate::constants;
use crate::models::ProbeOutcome;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("body read error: {0}")]
    Body(String),
}

/// Status and body of a GET
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// HEAD request, returns the status code
    async fn head(&self, url: &str) -> Result<u16, ProbeError>;

    /// GET request with optional bearer token
    async fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpReply, ProbeError>;
}

/// Production transport on reqwest. No timeout is configured beyond the
/// client default.
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ProbeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(constants::USER_AGENT)
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn head(&self, url: &str) -> Result<u16, ProbeError> {
        let url = reqwest::Url::parse(url).map_err(|e| ProbeError::InvalidUrl(e.to_string()))?;

        let response = self.http_client
            .head(url)
            .send()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(response.status().as_u16())
    }

    async fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpReply, ProbeError> {
        let url = reqwest::Url::parse(url).map_err(|e| ProbeError::InvalidUrl(e.to_string()))?;

        let mut request = self.http_client.get(url);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().await
            .map_err(|e| ProbeError::Body(e.to_string()))?;

        Ok(HttpReply { status, body })
    }
}

/// Map a status code: 2xx present, rate limiting and 5xx indeterminate,
/// anything else absent.
pub fn outcome_from_status(status: u16) -> ProbeOutcome {
    match status {
        200..=299 => ProbeOutcome::Present,
        403 | 429 => ProbeOutcome::Indeterminate { reason: format!("rate limited ({})", status) },
        500..=599 => ProbeOutcome::Indeterminate { reason: format!("server error ({})", status) },
        _ => ProbeOutcome::Absent,
    }
}

pub fn outcome_from_error(err: &ProbeError) -> ProbeOutcome {
    ProbeOutcome::Indeterminate { reason: err.to_string() }
}

/// HEAD a URL and classify the result
pub async fn probe_head(transport: &dyn HttpTransport, url: &str) -> ProbeOutcome {
    match transport.head(url).await {
        Ok(status) => outcome_from_status(status),
        Err(e) => {
            tracing::debug!("Probe failed for {}: {}", url, e);
            outcome_from_error(&e)
        }
    }
}

/// GET a page and look for any of the keywords, case-insensitively
pub async fn probe_keywords(
    transport: &dyn HttpTransport,
    url: &str,
    keywords: &[&str],
) -> ProbeOutcome {
    match transport.get(url, None).await {
        Ok(reply) if reply.is_success() => {
            let page = reply.body.to_lowercase();
            if keywords.iter().any(|k| page.contains(&k.to_lowercase())) {
                ProbeOutcome::Present
            } else {
                ProbeOutcome::Absent
            }
        }
        Ok(reply) => outcome_from_status(reply.status),
        Err(e) => {
            tracing::debug!("Keyword probe failed for {}: {}", url, e);
            outcome_from_error(&e)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeTransport;
    use super::*;

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(outcome_from_status(200), ProbeOutcome::Present);
        assert_eq!(outcome_from_status(204), ProbeOutcome::Present);
        assert_eq!(outcome_from_status(404), ProbeOutcome::Absent);
        assert_eq!(outcome_from_status(301), ProbeOutcome::Absent);
        assert!(matches!(outcome_from_status(429), ProbeOutcome::Indeterminate { .. }));
        assert!(matches!(outcome_from_status(503), ProbeOutcome::Indeterminate { .. }));
    }

    #[tokio::test]
    async fn test_probe_head_error_is_indeterminate() {
        let transport = FakeTransport::new()
            .with_head("https://a.io/roadmap", 200)
            .with_failure("https://b.io/roadmap");

        assert_eq!(probe_head(&transport, "https://a.io/roadmap").await, ProbeOutcome::Present);
        assert_eq!(probe_head(&transport, "https://a.io/audit").await, ProbeOutcome::Absent);
        assert!(matches!(
            probe_head(&transport, "https://b.io/roadmap").await,
            ProbeOutcome::Indeterminate { .. }
        ));
    }

    #[tokio::test]
    async fn test_probe_keywords_is_case_insensitive() {
        let transport = FakeTransport::new()
            .with_page("https://a.io", 200, "<h1>Our ROADMAP for 2025</h1>");

        let found = probe_keywords(&transport, "https://a.io", &["roadmap"]).await;
        assert_eq!(found, ProbeOutcome::Present);

        let missing = probe_keywords(&transport, "https://a.io", &["tokenomics"]).await;
        assert_eq!(missing, ProbeOutcome::Absent);
    }
}
