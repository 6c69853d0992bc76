//! Push notification content and the delivery seam.

use std::collections::BTreeMap;

use async_trait::async_trait;

use ltc_types::{Timestamp, Uid};

use crate::ProviderError;

/// A single notification addressed to one device token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    /// String-only key/value payload delivered to the client app.
    pub data: BTreeMap<String, String>,
    /// Where a click on a web notification should take the user.
    pub link: Option<String>,
}

impl PushMessage {
    /// The message sent when a user's verification is approved.
    pub fn verification_approved(
        token: &str,
        username: Option<&str>,
        uid: &Uid,
        now: Timestamp,
        frontend_url: &str,
    ) -> Self {
        let name = username.filter(|n| !n.trim().is_empty()).unwrap_or("friend");
        let mut data = BTreeMap::new();
        data.insert("type".to_string(), "verification_approved".to_string());
        data.insert("firebaseUid".to_string(), uid.to_string());
        data.insert("timestamp".to_string(), now.as_secs().to_string());
        data.insert("clickAction".to_string(), "/feed".to_string());
        Self {
            token: token.to_string(),
            title: "Welcome to the Community!".to_string(),
            body: format!(
                "Hey {name}! Your verification is complete. Your feed is now unlocked."
            ),
            data,
            link: Some(format!("{}/feed", frontend_url.trim_end_matches('/'))),
        }
    }

    /// A diagnostic message for checking a device's push setup.
    pub fn test_notification(token: &str, frontend_url: &str) -> Self {
        Self {
            token: token.to_string(),
            title: "Test Notification".to_string(),
            body: "If you see this, push notifications are working!".to_string(),
            data: BTreeMap::new(),
            link: Some(format!("{}/dashboard", frontend_url.trim_end_matches('/'))),
        }
    }
}

/// Delivers notifications. Returns the provider's message id.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<String, ProviderError>;
}
