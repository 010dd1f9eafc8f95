//! Review platform services
//!
//! Provides the interface the decision core uses to observe and mutate
//! remote pull-request state. Everything the bot knows is reconstructed
//! through this trait every cycle; there is no local durable store.

mod github;

pub use github::GitHubSource;

use crate::error::Result;
use crate::types::{Comment, PullRequest};
use async_trait::async_trait;

/// Remote pull-request source
///
/// All read calls are idempotent; `post_comment` and `close_pr` are
/// invoked at most once per decision.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// List open pull requests for a repository, in listing order
    async fn list_open_prs(&self, repo: &str) -> Result<Vec<PullRequest>>;

    /// Fetch a single pull request by number
    async fn get_pr(&self, repo: &str, number: u64) -> Result<PullRequest>;

    /// Fetch a pull request's comments in insertion order
    async fn list_comments(&self, repo: &str, number: u64) -> Result<Vec<Comment>>;

    /// Current head commit of a branch, or `None` if the branch does not
    /// exist
    async fn branch_head(&self, repo: &str, branch: &str) -> Result<Option<String>>;

    /// Post a comment on a pull request
    async fn post_comment(&self, repo: &str, number: u64, body: &str) -> Result<()>;

    /// Close a pull request
    async fn close_pr(&self, repo: &str, number: u64) -> Result<()>;
}
