// ============================
// crates/engine/src/ledger.rs
// ============================
//! Login attempt ledger.
//!
//! Append-only log of authentication attempts with windowed counts keyed
//! by user name, session id and ip address, for brute-force detection.
//! Attempts are immutable facts; the store refuses updates.
use crate::error::AuthError;
use crate::metrics as metric_keys;
use crate::provider::Clock;
use crate::storage::{AttemptSelector, Store};
use chrono::Duration;
use gatekeeper_common::LoginAttempt;
use metrics::counter;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

pub struct AttemptLedger {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl AttemptLedger {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Append one attempt, timestamped now. Never updates an existing row;
    /// concurrent callers for the same user/session/ip each get their own.
    pub async fn record(
        &self,
        user_name: &str,
        session_id: &str,
        ip_address: IpAddr,
    ) -> Result<LoginAttempt, AuthError> {
        let mut attempt =
            LoginAttempt::new(user_name, session_id, ip_address, self.clock.now());
        self.store.save_attempt(&mut attempt).await?;

        counter!(metric_keys::ATTEMPT_RECORDED).increment(1);
        debug!(user_name, session_id, %ip_address, "recorded login attempt");
        Ok(attempt)
    }

    /// Attempts for `user_name` within the trailing window.
    pub async fn count_with_same_user(
        &self,
        user_name: &str,
        window_secs: i64,
    ) -> Result<u64, AuthError> {
        self.count(AttemptSelector::UserName(user_name), window_secs)
            .await
    }

    /// Attempts for `session_id` within the trailing window.
    pub async fn count_with_same_session(
        &self,
        session_id: &str,
        window_secs: i64,
    ) -> Result<u64, AuthError> {
        self.count(AttemptSelector::SessionId(session_id), window_secs)
            .await
    }

    /// Attempts for `ip_address` within the trailing window.
    pub async fn count_with_same_ip(
        &self,
        ip_address: IpAddr,
        window_secs: i64,
    ) -> Result<u64, AuthError> {
        self.count(AttemptSelector::Ip(ip_address), window_secs)
            .await
    }

    async fn count(
        &self,
        selector: AttemptSelector<'_>,
        window_secs: i64,
    ) -> Result<u64, AuthError> {
        let since = self.clock.now() - Duration::seconds(window_secs);
        self.store.count_attempts(selector, since).await
    }

    /// Delete attempts older than `max_age_secs`. Returns rows removed.
    ///
    /// A negative age puts the cutoff in the future and purges everything;
    /// that degenerate case is part of the contract, not an error.
    pub async fn purge_older_than(&self, max_age_secs: i64) -> Result<u64, AuthError> {
        let cutoff = self.clock.now() - Duration::seconds(max_age_secs);
        let removed = self.store.delete_attempts_before(cutoff).await?;

        if removed > 0 {
            counter!(metric_keys::ATTEMPT_PURGED).increment(removed);
            debug!(removed, max_age_secs, "purged stale login attempts");
        }
        Ok(removed)
    }
}
