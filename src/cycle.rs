//! Cycle driver
//!
//! Runs the selection and processing phases under their time bounds,
//! routes faults per the error taxonomy, and decides how long to sleep
//! before the next cycle. No fault terminates the loop: visible faults
//! are reported to the affected PR, everything else is logged and the
//! cycle state is discarded and rebuilt from scratch next time.

use crate::config::Config;
use crate::error::Error;
use crate::pipeline::{CommandRunner, RunLog};
use crate::platform::PullRequestSource;
use crate::publish::{process_decision, report_fault};
use crate::refs::RefCache;
use crate::select::next_pull_request;
use crate::ticket::TicketTracker;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// The merge bot: configuration plus its external collaborators
pub struct Bot {
    config: Config,
    platform: Arc<dyn PullRequestSource>,
    runner: Arc<dyn CommandRunner>,
    tracker: Arc<dyn TicketTracker>,
    cache: RefCache,
    log: RunLog,
}

impl Bot {
    /// Assemble a bot from its collaborators
    pub fn new(
        config: Config,
        platform: Arc<dyn PullRequestSource>,
        runner: Arc<dyn CommandRunner>,
        tracker: Arc<dyn TicketTracker>,
    ) -> Self {
        let log = RunLog::new(config.paths.log_file.clone());
        Self {
            config,
            platform,
            runner,
            tracker,
            cache: RefCache::new(),
            log,
        }
    }

    /// Run one full cycle and return how long to sleep before the next.
    ///
    /// The ref cache is reset first: branch heads may have moved since
    /// the previous cycle and a stale entry would produce a wrong
    /// "unchanged" verdict.
    pub async fn cycle(&mut self) -> Duration {
        self.cache.reset();

        let short = Duration::from_secs(self.config.timing.short_sleep_secs);
        let long = Duration::from_secs(self.config.timing.long_sleep_secs);

        // Phase 1: selection (network-bound)
        let selection_bound = Duration::from_secs(self.config.timing.selection_timeout_secs);
        let selected = match timeout(
            selection_bound,
            next_pull_request(self.platform.as_ref(), &mut self.cache, &self.config),
        )
        .await
        {
            Err(_) => {
                warn!(error = %Error::Timeout("selection"), "cooling down");
                return long;
            }
            Ok(Err(e)) => {
                error!(error = %e, "selection failed, cooling down");
                return long;
            }
            Ok(Ok(None)) => {
                info!("no eligible pull requests");
                return short;
            }
            Ok(Ok(Some(decision))) => decision,
        };

        // Phase 2: build + merge (long-running)
        let processing_bound = Duration::from_secs(self.config.timing.processing_timeout_secs);
        let outcome = timeout(
            processing_bound,
            process_decision(
                self.platform.as_ref(),
                self.runner.as_ref(),
                self.tracker.as_ref(),
                &mut self.cache,
                &self.config,
                &self.log,
                &selected,
            ),
        )
        .await;

        match outcome {
            Err(_) => {
                warn!(error = %Error::Timeout("processing"), "cooling down");
                long
            }
            Ok(Ok(())) => short,
            Ok(Err(e)) => self.route_fault(&selected.pr, e).await,
        }
    }

    /// Route a processing fault per the taxonomy: attributable faults are
    /// surfaced as a comment on the PR, unclassified faults are
    /// operator-visible only and trigger an extended cooldown.
    async fn route_fault(&mut self, pr: &crate::types::PullRequest, e: Error) -> Duration {
        let short = Duration::from_secs(self.config.timing.short_sleep_secs);
        let long = Duration::from_secs(self.config.timing.long_sleep_secs);

        let log = match e {
            Error::Build { .. } => Some(&self.log),
            Error::MergeRace(_) | Error::Verification(_) | Error::Dependency(_) => None,
            _ => {
                error!(error = %e, "unclassified fault, cooling down");
                return long;
            }
        };

        if let Err(report_err) = report_fault(
            self.platform.as_ref(),
            &mut self.cache,
            &self.config,
            pr,
            &e,
            log,
        )
        .await
        {
            warn!(error = %report_err, "failed to report fault");
        }
        short
    }

    /// Run cycles forever, sleeping between them.
    pub async fn run_forever(&mut self) {
        info!(bot = %self.config.bot_name, org = %self.config.org, "starting merge bot");
        loop {
            let pause = self.cycle().await;
            info!(secs = pause.as_secs(), "sleeping");
            tokio::time::sleep(pause).await;
        }
    }
}
