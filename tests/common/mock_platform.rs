//! Mock review platform for testing
//!
//! Manually implements `PullRequestSource` with response maps, call
//! tracking and error injection, so tests can seed remote state, mutate
//! it mid-scenario to provoke races, and assert which writes happened.

use async_trait::async_trait;
use mergebot::error::{Error, Result};
use mergebot::platform::PullRequestSource;
use mergebot::ticket::TicketTracker;
use mergebot::types::{Comment, PullRequest};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory platform with scriptable state
#[derive(Default)]
pub struct MockPlatform {
    open_prs: Mutex<HashMap<String, Vec<PullRequest>>>,
    prs: Mutex<HashMap<(String, u64), PullRequest>>,
    comments: Mutex<HashMap<(String, u64), Vec<Comment>>>,
    branch_heads: Mutex<HashMap<(String, String), String>>,
    // Call tracking
    posted_comments: Mutex<Vec<(String, u64, String)>>,
    closed_prs: Mutex<Vec<(String, u64)>>,
    branch_head_calls: Mutex<Vec<(String, String)>>,
    // Error injection
    error_on_list: Mutex<Option<String>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an open PR (also registered for `get_pr`)
    pub fn add_open_pr(&self, pr: PullRequest) {
        self.prs
            .lock()
            .unwrap()
            .insert((pr.repo.clone(), pr.number), pr.clone());
        self.open_prs
            .lock()
            .unwrap()
            .entry(pr.repo.clone())
            .or_default()
            .push(pr);
    }

    /// Register a PR for `get_pr` without listing it as open
    /// (e.g. a merged dependency)
    pub fn set_pr(&self, pr: PullRequest) {
        self.prs
            .lock()
            .unwrap()
            .insert((pr.repo.clone(), pr.number), pr);
    }

    pub fn add_comment(&self, repo: &str, number: u64, comment: Comment) {
        self.comments
            .lock()
            .unwrap()
            .entry((repo.to_string(), number))
            .or_default()
            .push(comment);
    }

    pub fn set_branch_head(&self, repo: &str, branch: &str, sha: &str) {
        self.branch_heads
            .lock()
            .unwrap()
            .insert((repo.to_string(), branch.to_string()), sha.to_string());
    }

    /// Comments the bot (or anyone) posted through the trait
    pub fn posted_comments(&self) -> Vec<(String, u64, String)> {
        self.posted_comments.lock().unwrap().clone()
    }

    pub fn closed_prs(&self) -> Vec<(String, u64)> {
        self.closed_prs.lock().unwrap().clone()
    }

    pub fn branch_head_calls(&self) -> Vec<(String, String)> {
        self.branch_head_calls.lock().unwrap().clone()
    }

    /// Make `list_open_prs` fail with the given message
    pub fn fail_list_open(&self, message: &str) {
        *self.error_on_list.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl PullRequestSource for MockPlatform {
    async fn list_open_prs(&self, repo: &str) -> Result<Vec<PullRequest>> {
        if let Some(message) = self.error_on_list.lock().unwrap().clone() {
            return Err(Error::GitHubApi(message));
        }
        Ok(self
            .open_prs
            .lock()
            .unwrap()
            .get(repo)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_pr(&self, repo: &str, number: u64) -> Result<PullRequest> {
        self.prs
            .lock()
            .unwrap()
            .get(&(repo.to_string(), number))
            .cloned()
            .ok_or_else(|| Error::GitHubApi(format!("no such PR {repo}#{number}")))
    }

    async fn list_comments(&self, repo: &str, number: u64) -> Result<Vec<Comment>> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(&(repo.to_string(), number))
            .cloned()
            .unwrap_or_default())
    }

    async fn branch_head(&self, repo: &str, branch: &str) -> Result<Option<String>> {
        self.branch_head_calls
            .lock()
            .unwrap()
            .push((repo.to_string(), branch.to_string()));
        Ok(self
            .branch_heads
            .lock()
            .unwrap()
            .get(&(repo.to_string(), branch.to_string()))
            .cloned())
    }

    async fn post_comment(&self, repo: &str, number: u64, body: &str) -> Result<()> {
        self.posted_comments
            .lock()
            .unwrap()
            .push((repo.to_string(), number, body.to_string()));
        Ok(())
    }

    async fn close_pr(&self, repo: &str, number: u64) -> Result<()> {
        self.closed_prs
            .lock()
            .unwrap()
            .push((repo.to_string(), number));
        Ok(())
    }
}

/// Tracker recording create/resolve calls
#[derive(Default)]
pub struct MockTracker {
    pub created: Mutex<Vec<(String, String)>>,
    pub resolved: Mutex<Vec<(String, String)>>,
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketTracker for MockTracker {
    async fn create(&self, summary: &str, description: &str) -> Result<()> {
        self.created
            .lock()
            .unwrap()
            .push((summary.to_string(), description.to_string()));
        Ok(())
    }

    async fn resolve(&self, key: &str, comment: &str) -> Result<()> {
        self.resolved
            .lock()
            .unwrap()
            .push((key.to_string(), comment.to_string()));
        Ok(())
    }
}
