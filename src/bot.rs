//! Poll loop: look for new listings on a schedule and send them out.

use crate::discovery::Discovery;
use crate::error::ScoutError;
use crate::models::ListingId;
use crate::notify::Notifier;
use anyhow::{Context, Result};
use chrono::Local;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

pub struct Bot {
    notifier: Box<dyn Notifier>,
    frequency: Duration,
}

impl Bot {
    pub fn new(notifier: Box<dyn Notifier>, frequency: Duration) -> Self {
        Self { notifier, frequency }
    }

    /// One search for new listings. Returns how many were sent.
    ///
    /// Listings that could not be sent are forgotten again so the next poll
    /// picks them up.
    pub async fn poll(&self, sources: &mut dyn Discovery) -> Result<usize> {
        let found = sources.search_new().context("searching for new listings")?;
        if found.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.notifier.notify(&found).await {
            let ids: Vec<ListingId> = found.keys().cloned().collect();
            warn!(count = ids.len(), error = %format!("{:#}", e), "Notification failed, forgetting listings");
            sources.forget(&ids).context("forgetting unsent listings")?;
            return Err(e);
        }

        info!(count = found.len(), "Sent new listings");
        Ok(found.len())
    }

    /// Poll every `frequency` until Ctrl-C
    pub async fn run(&self, sources: &mut dyn Discovery) -> Result<()> {
        self.run_until(sources, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await
    }

    /// Poll immediately, then every `frequency` until `shutdown` completes
    pub async fn run_until(&self, sources: &mut dyn Discovery, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!(every = ?self.frequency, "Starting bot");
        let mut ticker = interval(self.frequency);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Bot closing down");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.poll(sources).await {
                        if is_fatal(&e) {
                            error!(error = %format!("{:#}", e), "Poll failed, stopping bot");
                            return Err(e);
                        }
                        error!(error = %format!("{:#}", e), "Poll failed");
                    }
                    if let Ok(step) = chrono::Duration::from_std(self.frequency) {
                        info!(next = %(Local::now() + step).format("%H:%M:%S"), "Waiting for next poll");
                    }
                }
            }
        }
    }
}

/// Store failures stop the loop; renderer and delivery failures are retried
/// on the next tick
fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ScoutError>().is_some_and(ScoutError::is_fatal)
}
