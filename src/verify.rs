//! Whitespace-change verifier
//!
//! Authors may label a commit as formatting-only ("whitespace" or
//! "indentation" at the start of the message) to signal that no semantic
//! change happened. Before trusting that claim in a status message, the
//! verifier re-derives it: for every touched file the comment-stripped,
//! pretty-printed form before and after the commit must be identical.

use crate::error::{Error, Result};
use crate::pipeline::CommandRunner;
use std::path::Path;
use tracing::{debug, info};

/// Commit message prefixes claiming a formatting-only change
const FORMATTING_MARKERS: [&str; 2] = ["indentation", "whitespace"];

/// Single-quote a path for `sh -c`, escaping embedded quotes
fn quoted(path: &str) -> String {
    format!("'{}'", path.replace('\'', r"'\''"))
}

async fn run_checked(
    runner: &dyn CommandRunner,
    dir: &Path,
    command: &str,
) -> Result<String> {
    let result = runner.run(dir, command).await?;
    if !result.success() {
        return Err(Error::Verification(format!(
            "command failed while verifying: {command}"
        )));
    }
    Ok(result.output)
}

/// Verify every formatting-only commit between `base_sha` and `head_sha`.
///
/// Walks the range in chronological order; for each commit whose message
/// claims a pure formatting change, the normalized representation of
/// every touched file must match before and after the commit. Returns
/// whether at least one commit was checked, so the caller can note the
/// verification in the status message.
pub async fn verify_whitespace_commits(
    runner: &dyn CommandRunner,
    repo_dir: &Path,
    normalizer: &str,
    base_sha: &str,
    head_sha: &str,
) -> Result<bool> {
    let rev_list = run_checked(
        runner,
        repo_dir,
        &format!("git rev-list --reverse {base_sha}..{head_sha}"),
    )
    .await?;

    let mut checked_any = false;

    for sha in rev_list.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let subject = run_checked(runner, repo_dir, &format!("git log -1 --format=%s {sha}"))
            .await?
            .trim()
            .to_lowercase();

        if !FORMATTING_MARKERS.iter().any(|m| subject.starts_with(m)) {
            continue;
        }

        debug!(sha, subject, "verifying formatting-only commit");
        checked_any = true;

        let files = run_checked(
            runner,
            repo_dir,
            &format!("git diff-tree --no-commit-id --name-only -r {sha}"),
        )
        .await?;

        for file in files.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let before = run_checked(
                runner,
                repo_dir,
                &format!("git show {sha}^:{} | {normalizer}", quoted(file)),
            )
            .await?;
            let after = run_checked(
                runner,
                repo_dir,
                &format!("git show {sha}:{} | {normalizer}", quoted(file)),
            )
            .await?;

            if before != after {
                return Err(Error::Verification(format!(
                    "commit {sha} claims a formatting-only change but '{file}' differs semantically"
                )));
            }
        }

        info!(sha, "formatting-only commit verified");
    }

    Ok(checked_any)
}
