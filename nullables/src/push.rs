//! Nullable push sender: records messages instead of delivering them.

use async_trait::async_trait;
use ltc_providers::{ProviderError, PushMessage, PushSender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Captures every message handed to it.
///
/// Delivery in the webhook path is fire-and-forget on a spawned task, so
/// tests use [`NullPushSender::wait_for`] to wait until the expected number
/// of attempts has happened.
pub struct NullPushSender {
    sent: Mutex<Vec<PushMessage>>,
    failing: AtomicBool,
    attempted: Notify,
}

impl NullPushSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            attempted: Notify::new(),
        }
    }

    /// A sender whose every delivery attempt fails.
    pub fn failing() -> Self {
        let sender = Self::new();
        sender.failing.store(true, Ordering::SeqCst);
        sender
    }

    /// All delivery attempts so far, including failed ones.
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until at least `count` attempts were made, or `timeout` passes.
    /// Returns whether the count was reached.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let reached = async {
            loop {
                let notified = self.attempted.notified();
                if self.sent.lock().unwrap().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, reached).await.is_ok()
    }
}

impl Default for NullPushSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushSender for NullPushSender {
    async fn send(&self, message: &PushMessage) -> Result<String, ProviderError> {
        let id = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(message.clone());
            sent.len()
        };
        self.attempted.notify_waiters();
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected {
                status: 404,
                body: "UNREGISTERED".into(),
            });
        }
        Ok(format!("null-message-{id}"))
    }
}
