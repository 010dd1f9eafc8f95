//! Dependency resolver
//!
//! A PR body may declare ordered dependencies on other pull requests:
//!
//! ```text
//! Dependencies: 12@xen-api, 4@xen-api-libs
//! ```
//!
//! Every entry must name a known repository and a pull request that has
//! already been merged. A malformed declaration or unknown repository is
//! a terminal error for that PR alone; an unmerged dependency is the
//! expected waiting state and produces no error.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform::PullRequestSource;
use crate::types::{DepRef, PrState};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Dependenc(?:y|ies):\s*(.+)$").expect("dependency declaration regex")
});

static ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)@([\w.-]+)$").expect("dependency entry regex"));

/// Parse the dependency declaration from a PR body, if any.
pub fn parse_dependencies(body: &str) -> Result<Vec<DepRef>> {
    let Some(captures) = DECLARATION.captures(body) else {
        return Ok(Vec::new());
    };

    let mut deps = Vec::new();
    for entry in captures[1].split(',') {
        let entry = entry.trim();
        let parsed = ENTRY
            .captures(entry)
            .ok_or_else(|| Error::Dependency(format!("unparseable entry '{entry}'")))?;
        let number: u64 = parsed[1]
            .parse()
            .map_err(|_| Error::Dependency(format!("bad pull request number in '{entry}'")))?;
        deps.push(DepRef {
            number,
            repo: parsed[2].to_string(),
        });
    }
    Ok(deps)
}

/// Check that every declared dependency of a PR body has been merged.
///
/// Returns `Ok(true)` when the PR is ready (no declaration, or all
/// dependencies merged), `Ok(false)` when some dependency is still
/// unmerged, and [`Error::Dependency`] for malformed declarations or
/// unknown repositories.
pub async fn dependencies_merged(
    platform: &dyn PullRequestSource,
    config: &Config,
    body: Option<&str>,
) -> Result<bool> {
    let deps = parse_dependencies(body.unwrap_or_default())?;

    for dep in &deps {
        if !config.knows_repo(&dep.repo) {
            return Err(Error::Dependency(format!(
                "unknown repository '{}' in dependency {}@{}",
                dep.repo, dep.number, dep.repo
            )));
        }

        let dep_pr = platform.get_pr(&dep.repo, dep.number).await.map_err(|e| {
            Error::Dependency(format!(
                "cannot resolve dependency {}@{}: {e}",
                dep.number, dep.repo
            ))
        })?;

        if dep_pr.state != PrState::Merged {
            debug!(
                number = dep.number,
                repo = %dep.repo,
                state = %dep_pr.state,
                "dependency not merged yet"
            );
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_declaration_is_empty() {
        assert!(parse_dependencies("Just a normal PR body").unwrap().is_empty());
    }

    #[test]
    fn parses_single_entry() {
        let deps = parse_dependencies("Dependency: 12@xen-api").unwrap();
        assert_eq!(
            deps,
            vec![DepRef {
                number: 12,
                repo: "xen-api".to_string()
            }]
        );
    }

    #[test]
    fn parses_multiple_entries_in_order() {
        let body = "Some description.\n\nDependencies: 12@xen-api, 4@xen-api-libs";
        let deps = parse_dependencies(body).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].number, 12);
        assert_eq!(deps[1].repo, "xen-api-libs");
    }

    #[test]
    fn rejects_malformed_entry() {
        let result = parse_dependencies("Dependencies: twelve@xen-api");
        assert!(matches!(result, Err(Error::Dependency(_))));
    }

    #[test]
    fn rejects_entry_without_repo() {
        let result = parse_dependencies("Dependencies: 12");
        assert!(matches!(result, Err(Error::Dependency(_))));
    }
}
