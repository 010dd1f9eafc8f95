//! Per-cycle ref identity cache
//!
//! Memoizes branch-head lookups for the duration of one cycle. The cycle
//! driver calls [`RefCache::reset`] at the start of every cycle; a stale
//! cached head would make a moved branch look unchanged, so the cache
//! must never survive a cycle boundary.

use crate::error::{Error, Result};
use crate::platform::PullRequestSource;
use std::collections::HashMap;
use tracing::debug;

/// Cache of (repository, branch) to head commit, valid for one cycle
#[derive(Debug, Default)]
pub struct RefCache {
    heads: HashMap<(String, String), String>,
}

impl RefCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all cached lookups; called by the cycle driver at cycle start
    pub fn reset(&mut self) {
        debug!(entries = self.heads.len(), "resetting ref cache");
        self.heads.clear();
    }

    /// Current head sha of `branch` in `repo`
    ///
    /// The first call per (repo, branch) per cycle performs a remote
    /// lookup; later calls return the cached value. Fails with
    /// [`Error::Lookup`] if the branch does not exist.
    pub async fn resolve(
        &mut self,
        platform: &dyn PullRequestSource,
        repo: &str,
        branch: &str,
    ) -> Result<String> {
        let key = (repo.to_string(), branch.to_string());
        if let Some(sha) = self.heads.get(&key) {
            return Ok(sha.clone());
        }

        let sha = platform
            .branch_head(repo, branch)
            .await?
            .ok_or_else(|| Error::Lookup {
                repo: repo.to_string(),
                branch: branch.to_string(),
            })?;

        debug!(repo, branch, sha = %sha, "cached branch head");
        self.heads.insert(key, sha.clone());
        Ok(sha)
    }
}
