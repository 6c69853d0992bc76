//! Bounded status polling after the user finishes the hosted verification
//! flow.
//!
//! The poller knows nothing about webhook timing. It asks the status source
//! up to `max_attempts` times, `interval` apart, and stops at the first
//! approval. When the budget runs out it settles in
//! [`PollOutcome::PendingReview`], which is a resting state rather than an
//! error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ltc_types::VerificationStatus;

use crate::{ClientError, Session, StatusSource};

/// Default number of status calls before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

/// Default wait between calls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollerConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            interval: POLL_INTERVAL,
        }
    }
}

/// How a polling run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Approval observed; the session was moved to verified.
    Verified,
    /// The provider declined the user.
    Rejected,
    /// Budget exhausted without a decision. Review may still be running.
    PendingReview,
    /// Torn down before a decision.
    Cancelled,
    /// The user is no longer signed in (or has no record).
    SignedOut,
}

pub struct VerificationPoller {
    source: Arc<dyn StatusSource>,
    session: Session,
    config: PollerConfig,
}

impl VerificationPoller {
    pub fn new(source: Arc<dyn StatusSource>, session: Session) -> Self {
        Self::with_config(source, session, PollerConfig::default())
    }

    pub fn with_config(source: Arc<dyn StatusSource>, session: Session, config: PollerConfig) -> Self {
        Self {
            source,
            session,
            config,
        }
    }

    /// Poll until a terminal answer, budget exhaustion, or `cancel` turns
    /// `true`. No call is started once cancellation has been observed.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) -> PollOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if *cancel.borrow() {
                return PollOutcome::Cancelled;
            }
            attempt += 1;
            debug!(attempt, max_attempts, "checking verification status");

            let result = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => return PollOutcome::Cancelled,
                result = self.source.fetch_status() => result,
            };

            match result {
                Ok(snapshot) if snapshot.is_verified_21 => {
                    if self.session.mark_verified() {
                        info!(attempt, "verification approved; content unlocked");
                    }
                    return PollOutcome::Verified;
                }
                Ok(snapshot) if snapshot.status == VerificationStatus::Rejected => {
                    info!(attempt, "verification rejected");
                    return PollOutcome::Rejected;
                }
                Ok(_) => {}
                Err(ClientError::NoSession | ClientError::Unauthorized | ClientError::NotRegistered) => {
                    warn!(attempt, "no usable session; stopping status checks");
                    return PollOutcome::SignedOut;
                }
                Err(e) => warn!(attempt, error = %e, "status check failed"),
            }

            if attempt >= max_attempts {
                info!(attempts = attempt, "verification still pending; stopping status checks");
                return PollOutcome::PendingReview;
            }

            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    /// Run on a background task. Dropping the handle tears the poller down.
    pub fn spawn(self) -> PollHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(async move { self.run(cancel_rx).await });
        PollHandle {
            cancel: cancel_tx,
            task: Some(task),
        }
    }
}

/// Resolves once `rx` holds `true`. A dropped sender never cancels.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Owner of a spawned poller.
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    /// Stop polling. Any pending wait is abandoned and no further call
    /// starts.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the run to end.
    pub async fn outcome(mut self) -> PollOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(PollOutcome::Cancelled),
            None => PollOutcome::Cancelled,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
