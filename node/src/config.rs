//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use ltc_rpc::ApiSettings;
use ltc_utils::LogFormat;

use crate::NodeError;

/// Which [`VerificationRecordStore`](ltc_store::VerificationRecordStore)
/// backend the node opens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Lmdb,
    /// Records live in process memory and are lost on restart.
    Memory,
}

/// Persona (identity verification provider) settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    /// Inquiry template used for new inquiries.
    #[serde(default)]
    pub template_id: String,
    /// Shared secret for the `Persona-Signature` header. Webhooks are
    /// rejected while this is unset.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

/// Firebase Authentication settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FirebaseConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_identity_base")]
    pub identity_base: String,
}

/// Firebase Cloud Messaging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FcmConfig {
    #[serde(default)]
    pub project_id: String,
    /// OAuth2 bearer token for the FCM HTTP v1 API.
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_fcm_base")]
    pub api_base: String,
}

/// Configuration for a verification sync node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address the API binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// API port.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Data directory for LMDB storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub store_backend: StoreBackend,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub lmdb_map_size: usize,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose the Prometheus `/metrics` endpoint.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Base URL of the web app, used for notification links.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Whether `GET /verify/test-notification/:uid` is served.
    #[serde(default)]
    pub enable_test_notification: bool,

    #[serde(default)]
    pub persona: PersonaConfig,

    #[serde(default)]
    pub firebase: FirebaseConfig,

    #[serde(default)]
    pub fcm: FcmConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./ltc_data")
}

fn default_map_size() -> usize {
    256 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_persona_base() -> String {
    ltc_providers::persona::DEFAULT_PERSONA_BASE.to_string()
}

fn default_identity_base() -> String {
    ltc_providers::firebase::DEFAULT_IDENTITY_BASE.to_string()
}

fn default_fcm_base() -> String {
    ltc_providers::fcm::DEFAULT_FCM_BASE.to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Apply secret overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply secret overrides from `lookup`. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("PERSONA_WEBHOOK_SECRET") {
            self.persona.webhook_secret = Some(v);
        }
        if let Some(v) = get("PERSONA_API_KEY") {
            self.persona.api_key = v;
        }
        if let Some(v) = get("FIREBASE_API_KEY") {
            self.firebase.api_key = v;
        }
        if let Some(v) = get("FCM_ACCESS_TOKEN") {
            self.fcm.access_token = v;
        }
        if let Some(v) = get("FRONTEND_URL") {
            self.frontend_url = v;
        }
    }

    /// Reject settings the node cannot start with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.store_backend == StoreBackend::Lmdb && self.lmdb_map_size == 0 {
            return Err(NodeError::Config("lmdb_map_size must be non-zero".into()));
        }
        tracing_subscriber::EnvFilter::try_new(&self.log_level)
            .map_err(|e| NodeError::Config(format!("invalid log level {:?}: {e}", self.log_level)))?;
        Ok(())
    }

    /// Settings handed to the API layer.
    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            webhook_secret: self
                .persona
                .webhook_secret
                .clone()
                .filter(|s| !s.is_empty()),
            frontend_url: self.frontend_url.clone(),
            enable_test_notification: self.enable_test_notification,
            enable_metrics: self.enable_metrics,
            cors_origins: self.cors_origins.clone(),
        }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            api_base: default_persona_base(),
            api_key: String::new(),
            template_id: String::new(),
            webhook_secret: None,
        }
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            identity_base: default_identity_base(),
        }
    }
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            access_token: String::new(),
            api_base: default_fcm_base(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            api_port: default_api_port(),
            data_dir: default_data_dir(),
            store_backend: StoreBackend::default(),
            lmdb_map_size: default_map_size(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: false,
            frontend_url: default_frontend_url(),
            cors_origins: Vec::new(),
            enable_test_notification: false,
            persona: PersonaConfig::default(),
            firebase: FirebaseConfig::default(),
            fcm: FcmConfig::default(),
        }
    }
}
