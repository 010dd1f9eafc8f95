//! Shared test fixtures

#![allow(dead_code)]

mod mock_platform;
mod script_runner;

pub use mock_platform::{MockPlatform, MockTracker};
pub use script_runner::ScriptedRunner;

use mergebot::config::Config;
use mergebot::types::{PrState, PullRequest};
use std::path::Path;

/// Config for the canonical test scenario: org `org`, repos `X` and `Y`,
/// whitelisted `master`, bot `bot`, trusted author `alice`, admin `admin`.
pub fn test_config(builds_dir: &Path, log_file: &Path) -> Config {
    let toml_text = format!(
        r#"
            bot_name = "bot"
            org = "org"
            trusted_authors = ["alice"]
            admins = ["admin"]
            foundation_component = "x"

            [[repos]]
            name = "X"
            component = "x"

            [[repos]]
            name = "Y"
            component = "y"

            [[branches]]
            name = "master"
            build_branch = "master"
            approvers = ["admin"]

            [[branches]]
            name = "release"
            build_branch = "release"
            approvers = ["admin"]
            sponsorship = true

            [paths]
            builds_dir = "{}"
            build_repo_url = "http://hg/trunk/build.hg"
            log_file = "{}"
        "#,
        builds_dir.display(),
        log_file.display(),
    );
    toml::from_str(&toml_text).unwrap()
}

/// An open PR by alice against `master` of repo `X`
pub fn open_pr(repo: &str, number: u64, head_sha: &str) -> PullRequest {
    PullRequest {
        repo: repo.to_string(),
        number,
        title: format!("PR {number}"),
        body: None,
        author: "alice".to_string(),
        base_ref: "master".to_string(),
        base_sha: "base00".to_string(),
        head_sha: head_sha.to_string(),
        state: PrState::Open,
        html_url: format!("https://example.com/org/{repo}/pull/{number}"),
        patch_url: format!("https://example.com/org/{repo}/pull/{number}.patch"),
    }
}
