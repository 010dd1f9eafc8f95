//! Comment-state parser
//!
//! The bot keeps no database: the remote comment thread is its only
//! record of past build attempts. Every status comment the bot posts
//! starts with a line embedding two `owner/repo@sha` tokens (the PR head
//! and the target branch head at the time). Folding over the bot's
//! comment history recovers whether the last attempt succeeded and
//! whether either ref has moved since.

use crate::error::Result;
use crate::platform::PullRequestSource;
use crate::refs::RefCache;
use crate::types::{BuildStatus, Comment, PullRequest, RefId};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Literal marker a successful build status carries
pub const SUCCESS_MARKER: &str = "Build succeeded.";

static REF_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+?@\w+").expect("ref token regex"));

/// Extract the (PR ref, branch ref) tokens from a status line.
///
/// Returns `None` when fewer than two tokens are present; callers treat
/// that as "refs changed" so a malformed historical comment forces a
/// rebuild instead of wedging the PR.
fn status_refs(first_line: &str) -> Option<(String, String)> {
    let mut tokens = REF_TOKEN.find_iter(first_line);
    let pr_ref = tokens.next()?.as_str().to_string();
    let branch_ref = tokens.next()?.as_str().to_string();
    Some((pr_ref, branch_ref))
}

/// Derive build status from a comment thread (pure).
///
/// `current_pr_ref` and `current_branch_ref` are the freshly computed
/// ref identities in display form. Both `succeeded` and `refs_changed`
/// are read off the last bot comment's status line.
pub fn derive_status(
    comments: &[Comment],
    bot_name: &str,
    current_pr_ref: &str,
    current_branch_ref: &str,
) -> BuildStatus {
    let Some(last) = comments.iter().rev().find(|c| c.author == bot_name) else {
        // Never attempted: must rebuild
        return BuildStatus {
            succeeded: false,
            first_attempt: true,
            refs_changed: true,
        };
    };

    // Only the latest attempt counts: an old success must not outlive a
    // newer failure on the same refs
    let first_line = last.body.lines().next().unwrap_or_default();
    let succeeded = first_line.contains(SUCCESS_MARKER);
    let refs_changed = match status_refs(first_line) {
        Some((last_pr_ref, last_branch_ref)) => {
            last_pr_ref != current_pr_ref || last_branch_ref != current_branch_ref
        }
        None => true,
    };

    BuildStatus {
        succeeded,
        first_attempt: false,
        refs_changed,
    }
}

/// Derive build status for a PR, resolving current refs through the cache.
pub async fn build_status(
    platform: &dyn PullRequestSource,
    cache: &mut RefCache,
    org: &str,
    bot_name: &str,
    pr: &PullRequest,
    comments: &[Comment],
) -> Result<BuildStatus> {
    let current_pr_ref = RefId::for_pr(pr).to_string();
    let branch_sha = cache.resolve(platform, &pr.repo, &pr.base_ref).await?;
    let current_branch_ref = RefId::for_branch(org, &pr.repo, &branch_sha).to_string();

    let status = derive_status(comments, bot_name, &current_pr_ref, &current_branch_ref);
    if status.first_attempt {
        debug!(repo = %pr.repo, number = pr.number, "no bot comments yet");
    } else if status.refs_changed {
        debug!(repo = %pr.repo, number = pr.number, "refs changed since last status");
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: &str = "xen-git";
    const PR_REF: &str = "alice/api@abc123";
    const BRANCH_REF: &str = "org/api@def456";

    fn status_comment(text: &str) -> Comment {
        Comment::new(BOT, format!("### {PR_REF} \u{21d2} {BRANCH_REF}: {text}"))
    }

    #[test]
    fn no_bot_comments_means_first_attempt() {
        let comments = vec![Comment::new("alice", "please review")];
        let status = derive_status(&comments, BOT, PR_REF, BRANCH_REF);
        assert!(!status.succeeded);
        assert!(status.first_attempt);
        assert!(status.refs_changed);
    }

    #[test]
    fn matching_refs_are_unchanged() {
        let comments = vec![status_comment("Build succeeded. Can merge.")];
        let status = derive_status(&comments, BOT, PR_REF, BRANCH_REF);
        assert!(status.succeeded);
        assert!(!status.first_attempt);
        assert!(!status.refs_changed);
    }

    #[test]
    fn moved_pr_head_flips_changed() {
        let comments = vec![status_comment("Build succeeded. Can merge.")];
        let status = derive_status(&comments, BOT, "alice/api@fff999", BRANCH_REF);
        assert!(status.refs_changed);
    }

    #[test]
    fn moved_branch_head_flips_changed() {
        let comments = vec![status_comment("Build succeeded. Can merge.")];
        let status = derive_status(&comments, BOT, PR_REF, "org/api@fff999");
        assert!(status.refs_changed);
    }

    #[test]
    fn failure_status_is_not_success() {
        let comments = vec![status_comment("Build failed.")];
        let status = derive_status(&comments, BOT, PR_REF, BRANCH_REF);
        assert!(!status.succeeded);
        assert!(!status.refs_changed);
    }

    #[test]
    fn later_failure_overrides_earlier_success() {
        let comments = vec![
            status_comment("Build succeeded. Can merge."),
            status_comment("Build failed."),
        ];
        let status = derive_status(&comments, BOT, PR_REF, BRANCH_REF);
        assert!(!status.succeeded);
    }

    #[test]
    fn latest_success_counts_despite_earlier_failure() {
        let comments = vec![
            status_comment("Build failed."),
            status_comment("Build succeeded. Can merge."),
        ];
        let status = derive_status(&comments, BOT, PR_REF, BRANCH_REF);
        assert!(status.succeeded);
    }

    #[test]
    fn malformed_status_line_forces_rebuild() {
        let comments = vec![Comment::new(BOT, "### something went sideways")];
        let status = derive_status(&comments, BOT, PR_REF, BRANCH_REF);
        assert!(!status.first_attempt);
        assert!(status.refs_changed);
    }

    #[test]
    fn only_last_bot_comment_drives_ref_comparison() {
        let stale = Comment::new(BOT, "### alice/api@old000 \u{21d2} org/api@old111: Build failed.");
        let comments = vec![stale, status_comment("Build succeeded. Can merge.")];
        let status = derive_status(&comments, BOT, PR_REF, BRANCH_REF);
        assert!(!status.refs_changed);
    }
}
