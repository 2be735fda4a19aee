//! Repository lookup against the GitHub REST API
//!
//! Candidates are tried in stages: known table, links on the home page,
//! names guessed from the domain, GitHub Pages. Candidates inside a stage are
//! checked concurrently; the first existing one in stage order wins.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::probe::{outcome_from_error, outcome_from_status, HttpTransport};
use super::rules;
use crate::constants;
use crate::models::{ProbeOutcome, RepositoryStats};

/// Max links taken from the home page
const MAX_PAGE_CANDIDATES: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepoData {
    pub full_name: String,
    pub description: Option<String>,
    pub stargazers_count: u32,
    pub forks_count: u32,
    pub pushed_at: Option<DateTime<Utc>>,
    pub license: Option<GitHubLicense>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubLicense {
    pub name: String,
}

impl GitHubRepoData {
    pub fn to_stats(&self) -> RepositoryStats {
        RepositoryStats {
            full_name: self.full_name.clone(),
            stars: self.stargazers_count,
            forks: self.forks_count,
            last_commit: self.pushed_at,
            license: self.license.as_ref().map(|l| l.name.clone()),
        }
    }
}

/// Result of the repository search
#[derive(Debug, Clone)]
pub struct RepositoryLookup {
    pub outcome: ProbeOutcome,
    pub data: Option<GitHubRepoData>,
}

pub struct GitHubLocator<'a> {
    transport: &'a dyn HttpTransport,
    token: Option<&'a str>,
}

impl<'a> GitHubLocator<'a> {
    pub fn new(transport: &'a dyn HttpTransport, token: Option<&'a str>) -> Self {
        Self { transport, token }
    }

    pub async fn find_repository(&self, domain: &str) -> RepositoryLookup {
        let mut outcomes = Vec::new();

        if let Some(repo) = rules::known_repository(domain) {
            let (outcome, data) = self.try_stage(vec![repo.to_string()]).await;
            if data.is_some() {
                tracing::debug!("Known repository {} for {}", repo, domain);
                return RepositoryLookup { outcome, data };
            }
            outcomes.push(outcome);
        }

        let (page_outcome, page_candidates) = self.candidates_from_page(domain).await;
        outcomes.push(page_outcome);

        let stages = [page_candidates, guess_candidates(domain), pages_candidates(domain)];
        for candidates in stages {
            if candidates.is_empty() {
                continue;
            }
            let (outcome, data) = self.try_stage(candidates).await;
            if data.is_some() {
                return RepositoryLookup { outcome, data };
            }
            outcomes.push(outcome);
        }

        tracing::debug!("No repository found for {}", domain);
        RepositoryLookup {
            outcome: ProbeOutcome::combine(outcomes),
            data: None,
        }
    }

    async fn try_stage(&self, candidates: Vec<String>) -> (ProbeOutcome, Option<GitHubRepoData>) {
        let results = join_all(candidates.iter().map(|c| self.fetch_repo(c))).await;

        let mut outcomes = Vec::with_capacity(results.len());
        for (outcome, data) in results {
            if let Some(data) = data {
                return (ProbeOutcome::Present, Some(data));
            }
            outcomes.push(outcome);
        }
        (ProbeOutcome::combine(outcomes), None)
    }

    /// GET the repository; existence and stats come from the same call
    async fn fetch_repo(&self, full_name: &str) -> (ProbeOutcome, Option<GitHubRepoData>) {
        let url = format!("{}/repos/{}", constants::GITHUB_API_BASE, full_name);

        match self.transport.get(&url, self.token).await {
            Ok(reply) if reply.is_success() => {
                match serde_json::from_str::<GitHubRepoData>(&reply.body) {
                    Ok(data) => (ProbeOutcome::Present, Some(data)),
                    Err(e) => {
                        tracing::warn!("Unreadable repository payload for {}: {}", full_name, e);
                        let reason = format!("parse error: {}", e);
                        (ProbeOutcome::Indeterminate { reason }, None)
                    }
                }
            }
            Ok(reply) => (outcome_from_status(reply.status), None),
            Err(e) => (outcome_from_error(&e), None),
        }
    }

    async fn candidates_from_page(&self, domain: &str) -> (ProbeOutcome, Vec<String>) {
        let url = format!("https://{}", domain);
        match self.transport.get(&url, None).await {
            Ok(reply) if reply.is_success() => (ProbeOutcome::Absent, links_in_page(&reply.body)),
            Ok(reply) => (outcome_from_status(reply.status), Vec::new()),
            Err(e) => (outcome_from_error(&e), Vec::new()),
        }
    }
}

static REPOSITORY_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"github\.com/([A-Za-z0-9_-]+)/([A-Za-z0-9_.-]+)")
        .expect("repository link pattern is valid")
});

/// `owner/repo` pairs linked from a page, deduplicated, in page order
pub fn links_in_page(html: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for cap in REPOSITORY_LINK.captures_iter(html) {
        let repo = cap[2].trim_end_matches(".git");
        let candidate = format!("{}/{}", &cap[1], repo);
        if !found.contains(&candidate) {
            found.push(candidate);
        }
        if found.len() == MAX_PAGE_CANDIDATES {
            break;
        }
    }
    found
}

/// Owner names derived from the domain, each with the guessed repo names
pub fn guess_candidates(domain: &str) -> Vec<String> {
    let host = domain.split('/').next().unwrap_or(domain);
    let Some((name, _tld)) = host.rsplit_once('.') else {
        return Vec::new();
    };

    let mut owners: Vec<String> = vec![name.replace('.', "-"), name.replace('.', "")];
    if let Some(first) = host.split('.').next() {
        owners.push(first.to_string());
    }
    owners.dedup();

    let mut candidates = Vec::new();
    for owner in owners.iter().filter(|o| !o.is_empty()) {
        for repo in rules::REPOSITORY_NAME_GUESSES {
            let repo = if repo.is_empty() { owner.as_str() } else { repo };
            let candidate = format!("{}/{}", owner, repo);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

fn pages_candidates(domain: &str) -> Vec<String> {
    match domain.strip_suffix(".github.io") {
        Some(user) if !user.is_empty() && !user.contains('.') => {
            vec![format!("{}/{}.github.io", user, user)]
        }
        _ => Vec::new(),
    }
}

/// 0-100 score from repository activity
pub fn code_review_score(data: &GitHubRepoData, now: DateTime<Utc>) -> u8 {
    let mut score: u32 = 20;

    score += match data.stargazers_count {
        s if s > 1000 => 20,
        s if s > 100 => 15,
        s if s > 10 => 10,
        _ => 0,
    };

    score += match data.forks_count {
        f if f > 100 => 15,
        f if f > 10 => 10,
        f if f > 1 => 5,
        _ => 0,
    };

    if let Some(pushed) = data.pushed_at {
        let days = (now - pushed).num_days();
        score += match days {
            d if d < 30 => 15,
            d if d < 90 => 10,
            d if d < 365 => 5,
            _ => 0,
        };
    }

    if data.license.is_some() {
        score += 10;
    }

    if data.description.as_deref().is_some_and(|d| !d.is_empty()) {
        score += 10;
    }

    score.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::super::probe::fake::FakeTransport;
    use super::*;

    fn repo_json(name: &str, stars: u32) -> String {
        format!(
            concat!(
                r#"{{"full_name":"{}","description":"A project","stargazers_count":{},"#,
                r#""forks_count":12,"pushed_at":"2024-01-01T00:00:00Z","#,
                r#""license":{{"name":"MIT License"}}}}"#
            ),
            name, stars
        )
    }

    #[test]
    fn test_links_in_page() {
        let html = r#"<a href="https://github.com/acme/core">x</a>
            <a href="https://github.com/acme/core">dup</a>
            <a href="https://github.com/acme/sdk.git">sdk</a>"#;
        assert_eq!(links_in_page(html), vec!["acme/core".to_string(), "acme/sdk".to_string()]);
    }

    #[test]
    fn test_guess_candidates() {
        let candidates = guess_candidates("acme.com");
        assert_eq!(candidates, vec!["acme/acme".to_string(), "acme/website".to_string()]);

        let nested = guess_candidates("app.acme.com");
        assert!(nested.contains(&"app-acme/app-acme".to_string()));
        assert!(nested.contains(&"appacme/appacme".to_string()));
        assert!(nested.contains(&"app/app".to_string()));

        assert!(guess_candidates("localhost").is_empty());
    }

    #[test]
    fn test_code_review_score() {
        let now = Utc::now();
        let data = GitHubRepoData {
            full_name: "acme/core".to_string(),
            description: Some("desc".to_string()),
            stargazers_count: 5000,
            forks_count: 500,
            pushed_at: Some(now - chrono::Duration::days(3)),
            license: Some(GitHubLicense { name: "MIT".to_string() }),
        };
        // 20 + 20 + 15 + 15 + 10 + 10 = 90
        assert_eq!(code_review_score(&data, now), 90);

        let bare = GitHubRepoData {
            full_name: "acme/empty".to_string(),
            description: Some(String::new()),
            stargazers_count: 0,
            forks_count: 0,
            pushed_at: None,
            license: None,
        };
        assert_eq!(code_review_score(&bare, now), 20);
    }

    #[tokio::test]
    async fn test_known_repository_is_tried_first() {
        let transport = FakeTransport::new().with_page(
            "https://api.github.com/repos/solana-labs/solana",
            200,
            &repo_json("solana-labs/solana", 12000),
        );

        let lookup = GitHubLocator::new(&transport, None).find_repository("solana.com").await;
        assert_eq!(lookup.outcome, ProbeOutcome::Present);
        assert_eq!(lookup.data.map(|d| d.full_name), Some("solana-labs/solana".to_string()));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_page_link_found() {
        let transport = FakeTransport::new()
            .with_page(
                "https://acme.io",
                200,
                r#"<a href="https://github.com/acme-labs/protocol">code</a>"#,
            )
            .with_page(
                "https://api.github.com/repos/acme-labs/protocol",
                200,
                &repo_json("acme-labs/protocol", 40),
            );

        let lookup = GitHubLocator::new(&transport, None).find_repository("acme.io").await;
        assert_eq!(lookup.outcome, ProbeOutcome::Present);
        assert_eq!(lookup.data.unwrap().stargazers_count, 40);
    }

    #[tokio::test]
    async fn test_rate_limit_is_indeterminate() {
        let transport = FakeTransport::new()
            .with_page("https://api.github.com/repos/acme/acme", 403, "rate limited");

        let lookup = GitHubLocator::new(&transport, None).find_repository("acme.io").await;
        assert!(lookup.data.is_none());
        assert!(matches!(lookup.outcome, ProbeOutcome::Indeterminate { .. }));
    }

    #[tokio::test]
    async fn test_nothing_found_is_absent() {
        let transport = FakeTransport::new().with_page("https://acme.io", 200, "<p>no links</p>");

        let lookup = GitHubLocator::new(&transport, None).find_repository("acme.io").await;
        assert!(lookup.data.is_none());
        assert_eq!(lookup.outcome, ProbeOutcome::Absent);
    }
}
