use async_trait::async_trait;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "yamlcmt/1.0";

#[derive(Error, Debug)]
pub enum GithubError {
    #[error("invalid repository `{0}`: expected owner/name")]
    InvalidRepository(String),

    #[error("invalid token: {0}")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Split `owner/name`. Both halves must be non-empty.
pub fn parse_repo(repo: &str) -> Result<RepoSlug, GithubError> {
    match repo.split_once('/') {
        Some((owner, name))
            if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok(RepoSlug {
                owner: owner.to_string(),
                name: name.to_string(),
            })
        }
        _ => Err(GithubError::InvalidRepository(repo.to_string())),
    }
}

/// Where results get published for a pull request.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn post_comment(&self, repo: &RepoSlug, number: u64, body: &str)
        -> Result<(), GithubError>;

    async fn add_labels(
        &self,
        repo: &RepoSlug,
        number: u64,
        labels: &[String],
    ) -> Result<(), GithubError>;
}

pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(token: &str) -> Result<Self, GithubError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(USER_AGENT),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(GithubClient {
            client,
            api_url: DEFAULT_API_URL.to_string(),
        })
    }

    /// Point at another API root, e.g. a GitHub Enterprise server.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn issue_url(&self, repo: &RepoSlug, number: u64, resource: &str) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/{}",
            self.api_url, repo.owner, repo.name, number, resource
        )
    }

    async fn post(&self, url: &str, body: serde_json::Value) -> Result<(), GithubError> {
        debug!(url, "POST");
        let response = self.client.post(url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    async fn post_comment(
        &self,
        repo: &RepoSlug,
        number: u64,
        body: &str,
    ) -> Result<(), GithubError> {
        let url = self.issue_url(repo, number, "comments");
        self.post(&url, json!({ "body": body })).await?;
        info!(repo = %repo, number, "posted comment");
        Ok(())
    }

    async fn add_labels(
        &self,
        repo: &RepoSlug,
        number: u64,
        labels: &[String],
    ) -> Result<(), GithubError> {
        let url = self.issue_url(repo, number, "labels");
        self.post(&url, json!({ "labels": labels })).await?;
        info!(repo = %repo, number, ?labels, "added labels");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo() {
        assert_eq!(
            parse_repo("acme/manifests").unwrap(),
            RepoSlug {
                owner: String::from("acme"),
                name: String::from("manifests")
            }
        );
        for bad in ["acme", "/manifests", "acme/", "a/b/c", ""] {
            assert!(
                matches!(parse_repo(bad), Err(GithubError::InvalidRepository(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_issue_urls() {
        let repo = parse_repo("acme/manifests").unwrap();
        let client = GithubClient::new("token").unwrap();
        assert_eq!(
            client.issue_url(&repo, 7, "comments"),
            "https://api.github.com/repos/acme/manifests/issues/7/comments"
        );

        let client = client.with_api_url("https://ghe.example.com/api/v3/");
        assert_eq!(
            client.issue_url(&repo, 7, "labels"),
            "https://ghe.example.com/api/v3/repos/acme/manifests/issues/7/labels"
        );
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        assert!(matches!(
            GithubClient::new("bad\ntoken"),
            Err(GithubError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_repo_display() {
        let repo = parse_repo("acme/manifests").unwrap();
        assert_eq!(repo.to_string(), "acme/manifests");
    }
}
