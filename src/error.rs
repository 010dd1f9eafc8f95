//! Error types for mergebot
//!
//! The variants mirror the fault taxonomy the cycle driver routes on:
//! build failures get a log excerpt in the PR comment, merge races and
//! verification failures get a comment without one, dependency errors are
//! scoped to a single PR, and timeouts trigger a cooldown instead of a
//! comment.

use thiserror::Error;

/// All errors produced by mergebot
#[derive(Debug, Error)]
pub enum Error {
    /// An external build command returned a non-zero exit code
    #[error("failed when executing:\n    {command}")]
    Build {
        /// The command text that failed
        command: String,
    },

    /// State changed between decision and merge; the merge must abort
    #[error("merge race: {0}")]
    MergeRace(String),

    /// A commit claiming to be formatting-only changed normalized sources
    #[error("whitespace verification failed: {0}")]
    Verification(String),

    /// A dependency declaration is malformed or references an unknown repo
    #[error("dependency error: {0}")]
    Dependency(String),

    /// A branch lookup found no such branch
    #[error("branch '{branch}' not found in repository '{repo}'")]
    Lookup {
        /// Repository name
        repo: String,
        /// Branch name
        branch: String,
    },

    /// A cycle phase exceeded its time bound
    #[error("{0} phase timed out")]
    Timeout(&'static str),

    /// GitHub API error
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Ticket tracker error
    #[error("ticket tracker error: {0}")]
    Ticket(String),

    /// Configuration loading or validation error
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<octocrab::Error> for Error {
    fn from(e: octocrab::Error) -> Self {
        Self::GitHubApi(e.to_string())
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
