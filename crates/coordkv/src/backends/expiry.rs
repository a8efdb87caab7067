//! TTL emulation for stores without native per-key expiration
//!
//! Every write stamps an absolute [`Expiry`] next to the value. The
//! [`ExpirySweeper`] runs in the background, lists the whole key space at a
//! fixed interval and deletes every entry whose expiry has passed.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::consul::ConsulClient;
use crate::error::KvError;

/// When an entry stops being valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The entry never expires
    Never,
    /// The entry expires at this Unix timestamp (seconds)
    At(i64),
}

impl Expiry {
    /// Expiry for a write made at `now` with a TTL of `ttl_secs` (0 = never)
    pub fn from_ttl(ttl_secs: u64, now: i64) -> Self {
        if ttl_secs == 0 {
            return Expiry::Never;
        }
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Expiry::At(now.saturating_add(ttl))
    }

    /// Decode the numeric tag stored on the wire, where 0 means never
    pub fn from_flags(flags: u64) -> Self {
        match flags {
            0 => Expiry::Never,
            ts => Expiry::At(i64::try_from(ts).unwrap_or(i64::MAX)),
        }
    }

    /// Encode as the numeric wire tag.
    ///
    /// Timestamps at or before the epoch are clamped to 1 so they still read
    /// back as already expired instead of as "never".
    pub fn to_flags(self) -> u64 {
        match self {
            Expiry::Never => 0,
            Expiry::At(ts) => u64::try_from(ts.max(1)).unwrap_or(1),
        }
    }

    pub fn is_expired_at(self, now: i64) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(ts) => now >= ts,
        }
    }
}

/// Background task deleting expired entries from a Consul KV store
pub(crate) struct ExpirySweeper {
    client: ConsulClient,
    interval: Duration,
}

impl ExpirySweeper {
    pub(crate) fn new(client: ConsulClient, interval: Duration) -> Self {
        Self { client, interval }
    }

    /// Run until `cancellation_token` fires.
    ///
    /// The first sweep happens one interval after start. Failures are logged
    /// and the loop carries on with the next interval.
    pub(crate) async fn run(self, cancellation_token: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            "Starting expiry sweeper"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancellation_token.cancelled() => {
                    info!("Expiry sweeper received cancellation signal");
                    return;
                }
            }

            let now = chrono::Utc::now().timestamp();

            tokio::select! {
                result = self.sweep_once(now) => {
                    match result {
                        Ok(0) => debug!("Expiry sweep found nothing to delete"),
                        Ok(deleted) => debug!(deleted, "Expiry sweep finished"),
                        Err(e) => warn!("Expiry sweep failed to list keys: {}", e),
                    }
                }
                _ = cancellation_token.cancelled() => {
                    info!("Expiry sweeper received cancellation signal");
                    return;
                }
            }
        }
    }

    /// One pass over the whole key space. Returns how many entries were
    /// deleted; only a failed listing is reported as an error.
    pub(crate) async fn sweep_once(&self, now: i64) -> Result<usize, KvError> {
        let entries = self.client.list("").await?;
        let mut deleted = 0;

        for entry in entries {
            if !entry.expiry().is_expired_at(now) {
                continue;
            }

            info!(key = %entry.key, "Deleting expired key");

            match self.client.delete(&entry.key).await {
                Ok(()) => deleted += 1,
                Err(e) => error!(key = %entry.key, "Failed to delete expired key: {}", e),
            }
        }

        Ok(deleted)
    }
}
