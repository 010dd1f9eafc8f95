//! Core types for mergebot

use serde::{Deserialize, Serialize};

/// Pull request lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    /// PR is open and can be acted on
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// A pull request snapshot
///
/// Fetched fresh every cycle from the review platform and never persisted.
/// By the time a decision is acted on this may be stale, which is why the
/// merge step re-fetches live state before pushing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// Repository name within the organization
    pub repo: String,
    /// PR number
    pub number: u64,
    /// PR title (may carry a ticket key prefix like `[CA-123]`)
    pub title: String,
    /// PR body (may carry a `Dependencies:` declaration line)
    pub body: Option<String>,
    /// Login of the PR author
    pub author: String,
    /// Target branch name
    pub base_ref: String,
    /// Commit the PR is based on
    pub base_sha: String,
    /// Head commit of the PR
    pub head_sha: String,
    /// Current lifecycle state
    pub state: PrState,
    /// Web URL for the PR
    pub html_url: String,
    /// URL of the PR's patch series (fetched and applied during builds)
    pub patch_url: String,
}

/// A comment on a pull request
///
/// Insertion order within the thread is significant; comment lists are
/// always handled as ordered vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Login of the comment author
    pub author: String,
    /// Comment body text
    pub body: String,
}

impl Comment {
    /// Convenience constructor used heavily in tests
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            body: body.into(),
        }
    }
}

/// An `owner/repo@commit` identity token
///
/// The display form is embedded verbatim in status comments and parsed
/// back out of them to detect ref changes between cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefId {
    /// Owner (organization or PR author)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Commit identifier
    pub sha: String,
}

impl RefId {
    /// Build the ref identity of a pull request: `author/repo@head`
    pub fn for_pr(pr: &PullRequest) -> Self {
        Self {
            owner: pr.author.clone(),
            repo: pr.repo.clone(),
            sha: pr.head_sha.clone(),
        }
    }

    /// Build the ref identity of a branch head: `org/repo@sha`
    pub fn for_branch(org: &str, repo: &str, sha: &str) -> Self {
        Self {
            owner: org.to_string(),
            repo: repo.to_string(),
            sha: sha.to_string(),
        }
    }
}

impl std::fmt::Display for RefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.sha)
    }
}

/// What the comment history says about the last build attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStatus {
    /// Whether the bot's history carries a successful build status
    pub succeeded: bool,
    /// Whether the bot has never commented on this PR
    pub first_attempt: bool,
    /// Whether the PR head or branch head moved since the last status
    pub refs_changed: bool,
}

/// The selector's verdict for one cycle
#[derive(Debug, Clone)]
pub struct BuildDecision {
    /// The single pull request to act on
    pub pr: PullRequest,
    /// Whether the build pipeline must run
    pub rebuild: bool,
    /// Whether an authorized approval asks for a merge
    pub merge: bool,
}

/// One parsed entry of a `Dependencies:` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepRef {
    /// Number of the depended-upon pull request
    pub number: u64,
    /// Short name of the repository it lives in
    pub repo: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pr() -> PullRequest {
        PullRequest {
            repo: "api".to_string(),
            number: 7,
            title: "Fix the frobnicator".to_string(),
            body: None,
            author: "alice".to_string(),
            base_ref: "master".to_string(),
            base_sha: "base00".to_string(),
            head_sha: "abc123".to_string(),
            state: PrState::Open,
            html_url: "https://example.com/org/api/pull/7".to_string(),
            patch_url: "https://example.com/org/api/pull/7.patch".to_string(),
        }
    }

    #[test]
    fn pr_ref_uses_author_and_head() {
        let id = RefId::for_pr(&sample_pr());
        assert_eq!(id.to_string(), "alice/api@abc123");
    }

    #[test]
    fn branch_ref_uses_org() {
        let id = RefId::for_branch("org", "api", "def456");
        assert_eq!(id.to_string(), "org/api@def456");
    }
}
