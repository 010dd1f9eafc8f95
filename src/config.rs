//! Configuration loading
//!
//! The bot reads a single TOML file at startup: identity, organization,
//! monitored repositories with their build-system component names, the
//! branch whitelist with per-branch approver sets, workspace paths, and
//! timing knobs. The GitHub token is taken from the file or, preferably,
//! from the `MERGEBOT_TOKEN` environment variable.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable consulted when the config file carries no token.
pub const TOKEN_ENV: &str = "MERGEBOT_TOKEN";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Login the bot comments and authenticates as
    pub bot_name: String,
    /// GitHub organization owning the monitored repositories
    pub org: String,
    /// API token; falls back to `MERGEBOT_TOKEN` when absent
    #[serde(default)]
    pub token: Option<String>,
    /// Authors whose PRs are considered without manual sponsorship
    pub trusted_authors: Vec<String>,
    /// Identities allowed to admit untrusted PRs with a recheck command
    pub admins: Vec<String>,
    /// Build-system component name every build must also pass
    /// (cross-component regression safety)
    pub foundation_component: String,
    /// Monitored repositories
    pub repos: Vec<RepoConfig>,
    /// Whitelisted target branches
    pub branches: Vec<BranchConfig>,
    /// Workspace and tool paths
    pub paths: PathsConfig,
    /// Sleep and timeout tuning
    #[serde(default)]
    pub timing: TimingConfig,
}

/// One monitored repository
#[derive(Debug, Clone, Deserialize)]
pub struct RepoConfig {
    /// Repository name within the organization
    pub name: String,
    /// Component name used in build-system make targets
    pub component: String,
}

/// One whitelisted target branch
#[derive(Debug, Clone, Deserialize)]
pub struct BranchConfig {
    /// Branch name on the review platform
    pub name: String,
    /// Branch name inside the build system (checked out before the patch
    /// is applied)
    pub build_branch: String,
    /// Identities whose approval commands authorize merges to this branch
    pub approvers: Vec<String>,
    /// Whether merges to this branch require manual sponsorship; when set,
    /// a "can merge" status also files a tracking ticket
    #[serde(default)]
    pub sponsorship: bool,
}

/// Workspace and external tool paths
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Directory the build workspace is created under
    pub builds_dir: PathBuf,
    /// URL of the build-system repository cloned into the workspace
    pub build_repo_url: String,
    /// Rolling per-run log file
    pub log_file: PathBuf,
    /// Command that reads a source file on stdin and writes its
    /// comment-stripped, pretty-printed form on stdout
    #[serde(default = "default_normalizer")]
    pub normalizer: String,
}

fn default_normalizer() -> String {
    "srcnorm --canonical".to_string()
}

/// Sleep and timeout tuning, all in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Sleep after an idle or completed cycle
    #[serde(default = "default_short_sleep")]
    pub short_sleep_secs: u64,
    /// Sleep after a timeout or unclassified fault
    #[serde(default = "default_long_sleep")]
    pub long_sleep_secs: u64,
    /// Bound on the selection phase
    #[serde(default = "default_selection_timeout")]
    pub selection_timeout_secs: u64,
    /// Bound on the build+merge phase
    #[serde(default = "default_processing_timeout")]
    pub processing_timeout_secs: u64,
}

const fn default_short_sleep() -> u64 {
    60
}

const fn default_long_sleep() -> u64 {
    600
}

const fn default_selection_timeout() -> u64 {
    120
}

const fn default_processing_timeout() -> u64 {
    3600
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            short_sleep_secs: default_short_sleep(),
            long_sleep_secs: default_long_sleep(),
            selection_timeout_secs: default_selection_timeout(),
            processing_timeout_secs: default_processing_timeout(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.repos.is_empty() {
            return Err(Error::Config("no repositories configured".to_string()));
        }
        if self.branches.is_empty() {
            return Err(Error::Config("no branches whitelisted".to_string()));
        }
        for branch in &self.branches {
            if branch.approvers.is_empty() {
                return Err(Error::Config(format!(
                    "branch '{}' has no approvers",
                    branch.name
                )));
            }
        }
        Ok(())
    }

    /// Resolve the API token from the config file or the environment.
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(ref token) = self.token {
            return Ok(token.clone());
        }
        std::env::var(TOKEN_ENV)
            .map_err(|_| Error::Config(format!("no token in config and {TOKEN_ENV} unset")))
    }

    /// Look up the whitelist entry for a target branch, if any.
    pub fn branch(&self, name: &str) -> Option<&BranchConfig> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Look up a monitored repository by name.
    pub fn repo(&self, name: &str) -> Option<&RepoConfig> {
        self.repos.iter().find(|r| r.name == name)
    }

    /// Whether a repository short name is in the known set.
    pub fn knows_repo(&self, name: &str) -> bool {
        self.repo(name).is_some()
    }

    /// Directory name of the per-bot build workspace.
    pub fn build_dir_name(&self) -> String {
        format!("build-{}", self.bot_name)
    }

    /// Absolute path of the build workspace.
    pub fn build_path(&self) -> PathBuf {
        self.paths.builds_dir.join(self.build_dir_name())
    }

    /// Checkout directory of a repository inside the build workspace.
    pub fn repo_checkout(&self, repo: &str) -> PathBuf {
        self.build_path().join("myrepos").join(repo)
    }
}
