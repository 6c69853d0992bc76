//! Prometheus metrics for the API.
//!
//! [`ServiceMetrics`] owns a dedicated [`Registry`] that the `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry, Encoder,
    IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Label values for [`ServiceMetrics::webhook_deliveries`].
pub mod outcome {
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const BAD_REQUEST: &str = "bad_request";
    pub const IGNORED: &str = "ignored";
    pub const APPLIED: &str = "applied";
    pub const DUPLICATE: &str = "duplicate";
    pub const UNKNOWN_UID: &str = "unknown_uid";
    pub const STORAGE_ERROR: &str = "storage_error";
}

pub struct ServiceMetrics {
    pub registry: Registry,

    /// Webhook deliveries, labelled by how they were handled.
    pub webhook_deliveries: IntCounterVec,
    /// Records moved to `approved` (first delivery only).
    pub approvals_applied: IntCounter,
    pub push_sent: IntCounter,
    pub push_failed: IntCounter,
    /// Successful `GET /auth/me` lookups.
    pub status_queries: IntCounter,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let webhook_deliveries = register_int_counter_vec_with_registry!(
            Opts::new(
                "ltc_webhook_deliveries_total",
                "Persona webhook deliveries by outcome"
            ),
            &["outcome"],
            registry
        )
        .expect("failed to register webhook_deliveries counter");

        let approvals_applied = register_int_counter_with_registry!(
            Opts::new(
                "ltc_approvals_applied_total",
                "Verification records moved to approved"
            ),
            registry
        )
        .expect("failed to register approvals_applied counter");

        let push_sent = register_int_counter_with_registry!(
            Opts::new("ltc_push_sent_total", "Push notifications delivered"),
            registry
        )
        .expect("failed to register push_sent counter");

        let push_failed = register_int_counter_with_registry!(
            Opts::new(
                "ltc_push_failed_total",
                "Push notifications that failed to deliver"
            ),
            registry
        )
        .expect("failed to register push_failed counter");

        let status_queries = register_int_counter_with_registry!(
            Opts::new("ltc_status_queries_total", "Verification status lookups"),
            registry
        )
        .expect("failed to register status_queries counter");

        Self {
            registry,
            webhook_deliveries,
            approvals_applied,
            push_sent,
            push_failed,
            status_queries,
        }
    }

    /// Count one webhook delivery under `outcome`.
    pub fn webhook(&self, outcome: &str) {
        self.webhook_deliveries.with_label_values(&[outcome]).inc();
    }

    pub fn webhook_count(&self, outcome: &str) -> u64 {
        self.webhook_deliveries.with_label_values(&[outcome]).get()
    }

    /// Encode every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}
