//! Ticket tracker interface
//!
//! Branches requiring manual merge sponsorship get an external tracking
//! ticket when the bot reports "can merge", and a PR title carrying a
//! ticket key prefix gets that ticket referenced and resolved on merge.
//! The tracker itself is an external collaborator; the default
//! implementation only logs.

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

static TICKET_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([A-Z][A-Z0-9]*-\d+)\]").expect("ticket key regex"));

/// Extract a ticket key from a PR title prefix like `[CA-123] Fix ...`.
pub fn ticket_key(title: &str) -> Option<String> {
    TICKET_KEY
        .captures(title.trim())
        .map(|c| c[1].to_string())
}

/// External issue tracker
#[async_trait]
pub trait TicketTracker: Send + Sync {
    /// File a tracking issue
    async fn create(&self, summary: &str, description: &str) -> Result<()>;

    /// Resolve an existing issue with a closing comment
    async fn resolve(&self, key: &str, comment: &str) -> Result<()>;
}

/// Tracker that records intent in the operator log only
pub struct NoopTracker;

#[async_trait]
impl TicketTracker for NoopTracker {
    async fn create(&self, summary: &str, _description: &str) -> Result<()> {
        info!(summary, "would create tracking ticket");
        Ok(())
    }

    async fn resolve(&self, key: &str, comment: &str) -> Result<()> {
        info!(key, comment, "would resolve ticket");
        Ok(())
    }
}
