//! Pull request selector
//!
//! Scans every monitored repository and picks the single pull request to
//! act on this cycle. An approved PR whose last build succeeded or whose
//! refs moved is selected immediately; otherwise any PR with moved refs
//! is remembered as a fallback so reviewers still get a fresh build and
//! status without an approval. At most one PR is returned per cycle.

use crate::commands::{addressed_command, approve_pattern, recheck_pattern};
use crate::config::Config;
use crate::deps::dependencies_merged;
use crate::error::{Error, Result};
use crate::history::build_status;
use crate::platform::PullRequestSource;
use crate::publish::report_fault;
use crate::refs::RefCache;
use crate::types::{BuildDecision, Comment, PullRequest};
use tracing::{debug, info, warn};

/// Whether a PR is admitted into consideration at all.
///
/// Trusted authors targeting a whitelisted branch are admitted directly;
/// anyone else needs an explicit admin recheck command, which lets an
/// admin sponsor an untrusted PR for one cycle.
fn admitted(config: &Config, pr: &PullRequest, comments: &[Comment]) -> bool {
    if config.branch(&pr.base_ref).is_none() {
        debug!(repo = %pr.repo, number = pr.number, branch = %pr.base_ref, "branch not whitelisted");
        return false;
    }
    if config.trusted_authors.iter().any(|a| a == &pr.author) {
        return true;
    }
    let rechecked = addressed_command(
        comments,
        &config.bot_name,
        &config.admins,
        recheck_pattern(),
    )
    .is_some();
    if rechecked {
        info!(repo = %pr.repo, number = pr.number, author = %pr.author, "untrusted PR admitted by recheck");
    }
    rechecked
}

/// Perform a fresh scan and pick the next pull request to process.
///
/// Returns the selected PR together with whether it must be rebuilt and
/// whether an authorized approval asks for it to be merged, or `None`
/// when nothing qualifies.
pub async fn next_pull_request(
    platform: &dyn PullRequestSource,
    cache: &mut RefCache,
    config: &Config,
) -> Result<Option<BuildDecision>> {
    let mut fallback: Option<PullRequest> = None;

    for repo in &config.repos {
        let prs = platform.list_open_prs(&repo.name).await?;

        for pr in prs {
            let comments = platform.list_comments(&pr.repo, pr.number).await?;

            if !admitted(config, &pr, &comments) {
                continue;
            }

            // Dependency problems are terminal for this PR only
            match dependencies_merged(platform, config, pr.body.as_deref()).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(repo = %pr.repo, number = pr.number, "waiting on dependencies");
                    continue;
                }
                Err(e @ Error::Dependency(_)) => {
                    warn!(repo = %pr.repo, number = pr.number, error = %e, "dependency error");
                    if let Err(report_err) =
                        report_fault(platform, cache, config, &pr, &e, None).await
                    {
                        warn!(error = %report_err, "failed to report dependency error");
                    }
                    continue;
                }
                Err(e) => return Err(e),
            }

            let status = build_status(
                platform,
                cache,
                &config.org,
                &config.bot_name,
                &pr,
                &comments,
            )
            .await?;

            // Approval authority is scoped to the target branch
            let approvers = config
                .branch(&pr.base_ref)
                .map(|b| b.approvers.as_slice())
                .unwrap_or_default();
            let approved =
                addressed_command(&comments, &config.bot_name, approvers, approve_pattern())
                    .is_some();

            if approved && (status.succeeded || status.refs_changed) {
                info!(repo = %pr.repo, number = pr.number, "approved, selecting immediately");
                return Ok(Some(BuildDecision {
                    pr,
                    rebuild: status.refs_changed,
                    merge: true,
                }));
            }

            if status.refs_changed {
                // Last one seen wins; keep scanning for an approved PR
                fallback = Some(pr);
            }
        }
    }

    Ok(fallback.map(|pr| {
        info!(repo = %pr.repo, number = pr.number, "no approved PR, building fallback for status");
        BuildDecision {
            pr,
            rebuild: true,
            merge: false,
        }
    }))
}
