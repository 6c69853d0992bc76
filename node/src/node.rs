//! The node: opens storage, wires providers into the API, and runs the
//! API server until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use ltc_providers::{FcmSender, FirebaseTokenVerifier, PersonaClient};
use ltc_rpc::{AppState, RpcServer, ServiceMetrics};
use ltc_store::{MemoryRecordStore, VerificationRecordStore};
use ltc_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment};

use crate::config::StoreBackend;
use crate::{NodeConfig, NodeError, ShutdownController};

/// Maximum time to wait for server tasks to finish during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Named databases in the LMDB environment.
const LMDB_MAX_DBS: u32 = 4;

pub struct LtcNode {
    pub config: NodeConfig,
    store: Arc<dyn VerificationRecordStore>,
    /// Present when the LMDB backend is in use.
    lmdb: Option<LmdbEnvironment>,
    pub metrics: Arc<ServiceMetrics>,
    shutdown: ShutdownController,
    /// Handles for spawned server tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl LtcNode {
    /// Create a node and open its record store.
    ///
    /// For the LMDB backend this checks the data directory, opens the
    /// environment at `config.data_dir` and runs an integrity pass before
    /// anything can write to it. Call [`start`](Self::start) to serve.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;

        let (store, lmdb): (Arc<dyn VerificationRecordStore>, _) = match config.store_backend {
            StoreBackend::Lmdb => {
                check_data_dir(&config.data_dir).map_err(NodeError::Integrity)?;
                let env = LmdbEnvironment::open(
                    &config.data_dir,
                    LMDB_MAX_DBS,
                    config.lmdb_map_size,
                )?;
                let report = check_integrity(env.env())?;
                if !report.is_healthy() {
                    for problem in &report.errors {
                        tracing::error!("integrity: {problem}");
                    }
                    return Err(NodeError::Integrity(format!(
                        "{} problem(s) in {}",
                        report.errors.len(),
                        config.data_dir.display()
                    )));
                }
                tracing::info!(
                    entries = report.total_entries,
                    path = %config.data_dir.display(),
                    "LMDB opened"
                );
                (Arc::new(env.verification_store()), Some(env))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; records are lost on restart");
                (Arc::new(MemoryRecordStore::new()), None)
            }
        };

        if config.persona.webhook_secret.as_deref().unwrap_or("").is_empty() {
            tracing::warn!("no Persona webhook secret configured; every webhook will be rejected");
        }

        Ok(Self {
            config,
            store,
            lmdb,
            metrics: Arc::new(ServiceMetrics::new()),
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        })
    }

    pub fn store(&self) -> Arc<dyn VerificationRecordStore> {
        Arc::clone(&self.store)
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// API state wired to the hosted services named in the config.
    pub fn app_state(&self) -> AppState {
        let config = &self.config;
        let identity = FirebaseTokenVerifier::with_base_url(
            config.firebase.api_key.clone(),
            config.firebase.identity_base.clone(),
        );
        let push = FcmSender::with_base_url(
            config.fcm.project_id.clone(),
            config.fcm.access_token.clone(),
            config.fcm.api_base.clone(),
        );
        let inquiries = PersonaClient::with_base_url(
            config.persona.api_key.clone(),
            config.persona.template_id.clone(),
            config.persona.api_base.clone(),
        );

        AppState::new(
            self.store(),
            Arc::new(identity),
            Arc::new(push),
            Arc::new(inquiries),
        )
        .with_metrics(Arc::clone(&self.metrics))
        .with_settings(config.api_settings())
    }

    fn api_addr(&self) -> Result<SocketAddr, NodeError> {
        format!("{}:{}", self.config.listen_addr, self.config.api_port)
            .parse()
            .map_err(|e| {
                NodeError::Config(format!(
                    "invalid listen address {}:{}: {e}",
                    self.config.listen_addr, self.config.api_port
                ))
            })
    }

    /// Spawn the API server.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        let addr = self.api_addr()?;
        let api = RpcServer::new(addr, self.app_state());
        let api_shutdown = self.shutdown.signalled();
        let api_handle = tokio::spawn(async move {
            match api.start(api_shutdown).await {
                Ok(()) => tracing::info!("API server exited"),
                Err(e) => tracing::error!("API server error: {e}"),
            }
        });
        self.task_handles.push(api_handle);

        tracing::info!(api = %addr, "node started");
        Ok(())
    }

    /// Start, wait for SIGINT/SIGTERM, then stop.
    pub async fn run(&mut self) -> Result<(), NodeError> {
        self.start().await?;
        self.shutdown.wait_for_signal().await;
        self.stop().await
    }

    /// Stop the node gracefully.
    ///
    /// 1. Sends the shutdown signal to the API server.
    /// 2. Waits for it to drain (with timeout).
    /// 3. Flushes LMDB.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("node stopping");
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all)
            .await
            .is_err()
        {
            tracing::warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }

        if let Some(env) = &self.lmdb {
            match env.force_sync() {
                Ok(()) => tracing::info!("LMDB flushed to disk"),
                Err(e) => tracing::warn!("LMDB force_sync failed: {e}"),
            }
        }

        tracing::info!("node stopped");
        Ok(())
    }
}
