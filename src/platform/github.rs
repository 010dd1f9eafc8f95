//! GitHub pull-request source implementation

use crate::error::{Error, Result};
use crate::platform::PullRequestSource;
use crate::types::{Comment, PrState, PullRequest};
use async_trait::async_trait;
use octocrab::Octocrab;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// GitHub source using octocrab
pub struct GitHubSource {
    client: Octocrab,
    /// Organization owning the monitored repositories
    org: String,
    /// Token for raw HTTP requests (branch lookups)
    token: String,
    /// HTTP client for raw requests (branch lookups)
    http_client: Client,
    /// API host for raw requests
    api_host: String,
}

impl GitHubSource {
    /// Create a new GitHub source
    pub fn new(token: &str, org: String, host: Option<String>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        let api_host = if let Some(ref h) = host {
            let base_url = format!("https://{h}/api/v3");
            builder = builder
                .base_uri(&base_url)
                .map_err(|e| Error::GitHubApi(e.to_string()))?;
            format!("{h}/api/v3")
        } else {
            "api.github.com".to_string()
        };

        let client = builder
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent("mergebot")
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            org,
            token: token.to_string(),
            http_client,
            api_host,
        })
    }
}

/// Helper to convert an octocrab PR to our `PullRequest` type
fn pr_from_octocrab(repo: &str, pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    // octocrab reports closed-and-merged PRs as Closed with a merged_at
    // timestamp; fold that back into our three-state lifecycle
    let state = match pr.state {
        Some(octocrab::models::IssueState::Open) => PrState::Open,
        Some(octocrab::models::IssueState::Closed) if pr.merged_at.is_some() => PrState::Merged,
        Some(_) | None => PrState::Closed,
    };

    PullRequest {
        repo: repo.to_string(),
        number: pr.number,
        title: pr.title.as_deref().unwrap_or_default().to_string(),
        body: pr.body.clone(),
        author: pr
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_default(),
        base_ref: pr.base.ref_field.clone(),
        base_sha: pr.base.sha.clone(),
        head_sha: pr.head.sha.clone(),
        state,
        html_url: pr
            .html_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        patch_url: pr
            .patch_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
    }
}

#[async_trait]
impl PullRequestSource for GitHubSource {
    async fn list_open_prs(&self, repo: &str) -> Result<Vec<PullRequest>> {
        debug!(repo, "listing open PRs");
        let prs = self
            .client
            .pulls(&self.org, repo)
            .list()
            .state(octocrab::params::State::Open)
            .send()
            .await?;

        let result: Vec<PullRequest> = prs
            .items
            .iter()
            .map(|pr| pr_from_octocrab(repo, pr))
            .collect();
        debug!(repo, count = result.len(), "listed open PRs");
        Ok(result)
    }

    async fn get_pr(&self, repo: &str, number: u64) -> Result<PullRequest> {
        debug!(repo, number, "fetching PR");
        let pr = self.client.pulls(&self.org, repo).get(number).await?;
        Ok(pr_from_octocrab(repo, &pr))
    }

    async fn list_comments(&self, repo: &str, number: u64) -> Result<Vec<Comment>> {
        debug!(repo, number, "listing PR comments");
        let comments = self
            .client
            .issues(&self.org, repo)
            .list_comments(number)
            .send()
            .await?;

        let result: Vec<Comment> = comments
            .items
            .into_iter()
            .map(|c| Comment {
                author: c.user.login,
                body: c.body.unwrap_or_default(),
            })
            .collect();
        debug!(repo, number, count = result.len(), "listed PR comments");
        Ok(result)
    }

    async fn branch_head(&self, repo: &str, branch: &str) -> Result<Option<String>> {
        // octocrab has no single-branch getter, so use the raw endpoint
        #[derive(Deserialize)]
        struct BranchResponse {
            commit: BranchCommit,
        }

        #[derive(Deserialize)]
        struct BranchCommit {
            sha: String,
        }

        debug!(repo, branch, "fetching branch head");
        let url = format!(
            "https://{}/repos/{}/{}/branches/{}",
            self.api_host, self.org, repo, branch
        );

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to fetch branch: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(repo, branch, "branch not found");
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(Error::GitHubApi(format!(
                "branch lookup for {repo}/{branch} returned {}",
                response.status()
            )));
        }

        let parsed: BranchResponse = response
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to parse branch: {e}")))?;

        debug!(repo, branch, sha = %parsed.commit.sha, "fetched branch head");
        Ok(Some(parsed.commit.sha))
    }

    async fn post_comment(&self, repo: &str, number: u64, body: &str) -> Result<()> {
        debug!(repo, number, "posting PR comment");
        self.client
            .issues(&self.org, repo)
            .create_comment(number, body)
            .await?;
        debug!(repo, number, "posted PR comment");
        Ok(())
    }

    async fn close_pr(&self, repo: &str, number: u64) -> Result<()> {
        debug!(repo, number, "closing PR");
        self.client
            .issues(&self.org, repo)
            .update(number)
            .state(octocrab::models::IssueState::Closed)
            .send()
            .await?;
        debug!(repo, number, "closed PR");
        Ok(())
    }
}
