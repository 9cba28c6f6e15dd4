use integration_hub::{FetchOptions, FetchPipeline, OAuthTokens, Result};
use serde::Deserialize;

const USER_AGENT: &str = "integration-hub/1.0";
const API_VERSION: &str = "2022-11-28";

/// Authenticated GitHub user.
#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
}

/// GitHub repository.
#[derive(Debug, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
    pub updated_at: String,
    pub private: bool,
}

/// Subject of a GitHub notification.
#[derive(Debug, Deserialize)]
pub struct NotificationSubject {
    pub title: String,
    #[serde(rename = "type")]
    pub subject_type: String,
    pub url: Option<String>,
}

/// GitHub notification.
#[derive(Debug, Deserialize)]
pub struct GitHubNotification {
    pub id: String,
    pub reason: String,
    pub unread: bool,
    pub updated_at: String,
    pub subject: NotificationSubject,
}

/// Author of a GitHub issue.
#[derive(Debug, Deserialize)]
pub struct IssueUser {
    pub login: String,
}

/// GitHub issue.
#[derive(Debug, Deserialize)]
pub struct GitHubIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub user: IssueUser,
    pub created_at: String,
    pub updated_at: String,
}

/// GitHub REST calls for one account.
///
/// Borrows the connector's pipeline and the caller's tokens for the
/// duration of a widget fetch. Every call goes through the pipeline, so
/// retries, rate limits and `TokenExpired` apply uniformly.
pub struct GitHubClient<'a> {
    pipeline: &'a FetchPipeline,
    tokens: &'a OAuthTokens,
    options: FetchOptions,
}

impl<'a> GitHubClient<'a> {
    /// `options` carries the timeout, retry budget and cancellation; GitHub's
    /// required headers are added here.
    pub fn new(pipeline: &'a FetchPipeline, tokens: &'a OAuthTokens, options: FetchOptions) -> Self {
        let options = options
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        Self {
            pipeline,
            tokens,
            options,
        }
    }

    pub async fn fetch_user(&self) -> Result<GitHubUser> {
        let result = self.pipeline.fetch(self.tokens, "/user", &self.options).await?;
        Ok(result.data)
    }

    /// Fetch the authenticated user's repositories (sorted by last updated).
    pub async fn fetch_repos(&self, per_page: u32) -> Result<Vec<GitHubRepo>> {
        let options = self
            .options
            .clone()
            .query("sort", "updated")
            .query("per_page", per_page.to_string());
        let result = self.pipeline.fetch(self.tokens, "/user/repos", &options).await?;
        Ok(result.data)
    }

    /// Fetch the authenticated user's notifications.
    pub async fn fetch_notifications(&self, all: bool) -> Result<Vec<GitHubNotification>> {
        let mut options = self.options.clone();
        if all {
            options = options.query("all", "true");
        }
        options = options.query("per_page", "30");
        let result = self
            .pipeline
            .fetch(self.tokens, "/notifications", &options)
            .await?;
        Ok(result.data)
    }

    /// Fetch open issues for a repository.
    pub async fn fetch_issues(&self, owner: &str, repo: &str) -> Result<Vec<GitHubIssue>> {
        let endpoint = format!("/repos/{}/{}/issues", owner, repo);
        let options = self
            .options
            .clone()
            .query("state", "open")
            .query("per_page", "10");
        let result = self.pipeline.fetch(self.tokens, &endpoint, &options).await?;
        Ok(result.data)
    }
}
