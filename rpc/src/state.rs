//! Shared state handed to every handler.

use std::sync::Arc;

use ltc_providers::{InquiryCreator, PushSender, TokenVerifier};
use ltc_store::VerificationRecordStore;
use ltc_types::{Clock, SystemClock};

use crate::ServiceMetrics;

/// Plain settings for the API, filled in from node configuration.
#[derive(Clone, Debug)]
pub struct ApiSettings {
    /// Shared secret for `Persona-Signature`. When unset every webhook is
    /// rejected.
    pub webhook_secret: Option<String>,
    /// Base URL of the web app; push notifications link into it.
    pub frontend_url: String,
    pub enable_test_notification: bool,
    pub enable_metrics: bool,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            frontend_url: "http://localhost:3000".to_string(),
            enable_test_notification: false,
            enable_metrics: false,
            cors_origins: Vec::new(),
        }
    }
}

/// Collaborators and settings shared by all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VerificationRecordStore>,
    pub identity: Arc<dyn TokenVerifier>,
    pub push: Arc<dyn PushSender>,
    pub inquiries: Arc<dyn InquiryCreator>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<ServiceMetrics>,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn VerificationRecordStore>,
        identity: Arc<dyn TokenVerifier>,
        push: Arc<dyn PushSender>,
        inquiries: Arc<dyn InquiryCreator>,
    ) -> Self {
        Self {
            store,
            identity,
            push,
            inquiries,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(ServiceMetrics::new()),
            settings: Arc::new(ApiSettings::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ServiceMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_settings(mut self, settings: ApiSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }
}
