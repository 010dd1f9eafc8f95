//! Merge verifier & publisher
//!
//! Acts on a [`BuildDecision`]: runs the build pipeline when a rebuild is
//! required, re-validates live state immediately before the
//! point-of-no-return push when a merge was approved, and writes the
//! outcome back to the review thread as a status comment. The re-check
//! is the system's only concurrency guard: an optimistic compare-and-abort
//! against the identifiers captured at decision time.

use crate::config::{BranchConfig, Config};
use crate::error::{Error, Result};
use crate::pipeline::{
    CommandRunner, RunLog, build_stamp, build_steps, read_build_stamp, run_build,
    write_build_stamp,
};
use crate::platform::PullRequestSource;
use crate::refs::RefCache;
use crate::ticket::{TicketTracker, ticket_key};
use crate::types::{BuildDecision, PrState, PullRequest, RefId};
use crate::verify::verify_whitespace_commits;
use tracing::{info, warn};

/// Number of log lines quoted in a build failure report
const LOG_EXCERPT_LINES: usize = 20;

/// Note appended to a status whose formatting-only commits were verified
const VERIFIED_NOTE: &str = "Whitespace-only changes verified.";

/// Format the leading status line embedded in every bot comment.
///
/// The two ref tokens are load-bearing: the comment-state parser reads
/// them back next cycle to detect ref changes.
pub fn status_line(pr_ref: &str, branch_ref: &str, text: &str) -> String {
    format!("### {pr_ref} \u{21d2} {branch_ref}: {text}")
}

/// Headline and whether to attach a log excerpt for a fault.
fn fault_headline(err: &Error) -> (&'static str, bool) {
    match err {
        Error::Build { .. } => ("Build failed.", true),
        Error::MergeRace(_) => ("Merge aborted.", false),
        Error::Verification(_) => ("Verification failed.", false),
        Error::Dependency(_) => ("Dependency check failed.", false),
        _ => ("Processing failed.", false),
    }
}

/// Resolve the refs for a status header, tolerating lookup failures.
///
/// A fault report must never itself fail because the branch vanished;
/// the header then names the branch with an unknown head.
async fn header_refs(
    platform: &dyn PullRequestSource,
    cache: &mut RefCache,
    config: &Config,
    pr: &PullRequest,
) -> (String, String) {
    let pr_ref = RefId::for_pr(pr).to_string();
    let branch_sha = match cache.resolve(platform, &pr.repo, &pr.base_ref).await {
        Ok(sha) => sha,
        Err(e) => {
            warn!(repo = %pr.repo, branch = %pr.base_ref, error = %e, "branch lookup failed for status header");
            "unknown".to_string()
        }
    };
    let branch_ref = RefId::for_branch(&config.org, &pr.repo, &branch_sha).to_string();
    (pr_ref, branch_ref)
}

/// Report a fault on the affected pull request.
///
/// Build failures quote the last lines of the run log; merge races,
/// verification failures and dependency errors are reported without an
/// excerpt.
pub async fn report_fault(
    platform: &dyn PullRequestSource,
    cache: &mut RefCache,
    config: &Config,
    pr: &PullRequest,
    err: &Error,
    log: Option<&RunLog>,
) -> Result<()> {
    let (headline, show_log) = fault_headline(err);
    let (pr_ref, branch_ref) = header_refs(platform, cache, config, pr).await;

    let mut body = status_line(&pr_ref, &branch_ref, headline);
    body.push('\n');
    body.push_str(&err.to_string());

    if show_log
        && let Some(log) = log
    {
        body.push_str("\nError log:");
        for line in log.tail(LOG_EXCERPT_LINES).await? {
            body.push_str("\n    ");
            body.push_str(&line);
        }
    }

    info!(pr = %pr.html_url, %err, "reporting fault");
    platform.post_comment(&pr.repo, pr.number, &body).await
}

/// Optimistic merge-safety check.
///
/// Re-fetches the branch head, the PR head and the PR lifecycle state,
/// and aborts with [`Error::MergeRace`] if any differs from the values
/// recorded at decision time. Deliberately bypasses the ref cache: the
/// whole point is to observe state newer than the decision snapshot.
async fn check_merge_race(
    platform: &dyn PullRequestSource,
    config: &Config,
    pr: &PullRequest,
    recorded_branch_sha: &str,
) -> Result<()> {
    let fresh_branch_sha = platform
        .branch_head(&pr.repo, &pr.base_ref)
        .await?
        .ok_or_else(|| {
            Error::MergeRace(format!(
                "branch {} of {} no longer exists",
                pr.base_ref, pr.repo
            ))
        })?;

    if fresh_branch_sha != recorded_branch_sha {
        let fresh_ref = RefId::for_branch(&config.org, &pr.repo, &fresh_branch_sha);
        return Err(Error::MergeRace(format!(
            "branch {} updated since to {fresh_ref}",
            pr.base_ref
        )));
    }

    let fresh_pr = platform.get_pr(&pr.repo, pr.number).await?;
    if fresh_pr.state != PrState::Open {
        return Err(Error::MergeRace(format!(
            "pull request {}/{}#{} no longer open ({})",
            config.org, pr.repo, pr.number, fresh_pr.state
        )));
    }

    if fresh_pr.head_sha != pr.head_sha {
        let fresh_ref = RefId::for_pr(&fresh_pr);
        return Err(Error::MergeRace(format!(
            "pull request {}/{}#{} modified since to {fresh_ref}",
            config.org, pr.repo, pr.number
        )));
    }

    Ok(())
}

/// A merge without a rebuild reuses the checkout left by an earlier
/// cycle; refuse to push if the workspace was since rebuilt for a
/// different pull request.
async fn check_workspace(config: &Config, pr: &PullRequest) -> Result<()> {
    let expected = build_stamp(pr);
    match read_build_stamp(config).await {
        Some(ref stamp) if *stamp == expected => Ok(()),
        Some(stamp) => Err(Error::MergeRace(format!(
            "workspace was rebuilt for {stamp} since this pull request's build"
        ))),
        None => Err(Error::MergeRace(format!(
            "no workspace build recorded for {expected}"
        ))),
    }
}

/// Push the merged result from the local checkout to the target branch.
async fn push_merged(
    runner: &dyn CommandRunner,
    log: &RunLog,
    config: &Config,
    pr: &PullRequest,
    branch_cfg: &BranchConfig,
) -> Result<()> {
    let repo_dir = config.repo_checkout(&pr.repo);
    let url = format!("git@github.com:{}/{}.git", config.org, pr.repo);
    let command = format!("git push {url} {}:{}", branch_cfg.build_branch, pr.base_ref);
    let steps = vec![(repo_dir, command)];
    run_build(runner, log, &steps).await
}

/// Act on a build decision: rebuild, verify, merge-check, publish.
///
/// Every fault is returned to the cycle driver, which routes it to the
/// right report shape; on success the posted status comment is the
/// record the next cycle's parser will read back.
pub async fn process_decision(
    platform: &dyn PullRequestSource,
    runner: &dyn CommandRunner,
    tracker: &dyn TicketTracker,
    cache: &mut RefCache,
    config: &Config,
    log: &RunLog,
    decision: &BuildDecision,
) -> Result<()> {
    let pr = &decision.pr;

    if !decision.rebuild && !decision.merge {
        return Err(Error::Internal(format!(
            "decision for {}/{}#{} requires neither rebuild nor merge",
            config.org, pr.repo, pr.number
        )));
    }

    let branch_cfg = config.branch(&pr.base_ref).ok_or_else(|| {
        Error::Internal(format!("branch '{}' not whitelisted", pr.base_ref))
    })?;

    info!(
        pr = %pr.html_url,
        rebuild = decision.rebuild,
        merge = decision.merge,
        "processing pull request"
    );

    // Snapshot the branch head as observed at decision time; the cache
    // still holds the value the selector saw earlier this cycle.
    let branch_sha = cache.resolve(platform, &pr.repo, &pr.base_ref).await?;

    let mut verified = false;
    if decision.rebuild {
        log.clear().await?;
        let steps = build_steps(config, pr, &branch_cfg.build_branch);
        run_build(runner, log, &steps).await?;
        write_build_stamp(config, pr).await?;

        verified = verify_whitespace_commits(
            runner,
            &config.repo_checkout(&pr.repo),
            &config.paths.normalizer,
            &pr.base_sha,
            &pr.head_sha,
        )
        .await?;
    }

    let pr_ref = RefId::for_pr(pr).to_string();
    let branch_ref = RefId::for_branch(&config.org, &pr.repo, &branch_sha).to_string();
    let key = ticket_key(&pr.title);

    if decision.merge {
        check_merge_race(platform, config, pr, &branch_sha).await?;
        if !decision.rebuild {
            check_workspace(config, pr).await?;
        }
        push_merged(runner, log, config, pr, branch_cfg).await?;

        let mut text = "Build succeeded. Merged.".to_string();
        if let Some(ref key) = key {
            text.push_str(&format!(" Resolves {key}."));
        }
        let mut body = status_line(&pr_ref, &branch_ref, &text);
        if verified {
            body.push('\n');
            body.push_str(VERIFIED_NOTE);
        }

        info!(pr = %pr.html_url, "merged, closing");
        platform.post_comment(&pr.repo, pr.number, &body).await?;
        platform.close_pr(&pr.repo, pr.number).await?;

        if branch_cfg.sponsorship
            && let Some(ref key) = key
        {
            tracker
                .resolve(key, &format!("Merged as {branch_ref} via {}", pr.html_url))
                .await?;
        }
    } else {
        let mut body = status_line(&pr_ref, &branch_ref, "Build succeeded. Can merge.");
        if verified {
            body.push('\n');
            body.push_str(VERIFIED_NOTE);
        }

        info!(pr = %pr.html_url, "build succeeded, awaiting approval");
        platform.post_comment(&pr.repo, pr.number, &body).await?;

        if branch_cfg.sponsorship {
            tracker
                .create(
                    &format!("Merge sponsorship needed for {}/{}#{}", config.org, pr.repo, pr.number),
                    &format!("{} builds cleanly against {branch_ref} and awaits a manual merge sponsor.", pr.html_url),
                )
                .await?;
        }
    }

    Ok(())
}
