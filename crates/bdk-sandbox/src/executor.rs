//! Debounced, coalescing sandbox deploys
//!
//! The executor owns one in-flight slot. The first request starts a worker
//! task; requests arriving while a deploy runs join the pending batch, which
//! the worker deploys once with the latest arguments after the current
//! deploy finishes. Every caller of a batch receives that batch's result;
//! a panic in validation or in the deployer fails only its own batch.

use crate::config::SandboxConfig;
use crate::deployer::{latest_secret_update, BackendDeployer, DeployProps, SecretClient};
use crate::error::SandboxError;
use bdk_platform::BackendIdentifier;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;

type ValidateAppSourcesProvider = Arc<dyn Fn() -> bool + Send + Sync>;
type DeployResult = Result<(), SandboxError>;

struct DeployRequest {
    backend_identifier: BackendIdentifier,
    validate_app_sources_provider: ValidateAppSourcesProvider,
    profile: Option<String>,
}

struct PendingBatch {
    request: DeployRequest,
    waiters: Vec<oneshot::Sender<DeployResult>>,
}

#[derive(Default)]
struct ExecutorState {
    running: bool,
    pending: Option<PendingBatch>,
}

struct Inner {
    deployer: Arc<dyn BackendDeployer>,
    secret_client: Arc<dyn SecretClient>,
    config: SandboxConfig,
    state: Mutex<ExecutorState>,
}

/// Serializes sandbox deploys of one process
#[derive(Clone)]
pub struct SandboxExecutor {
    inner: Arc<Inner>,
}

impl fmt::Debug for SandboxExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SandboxExecutor")
            .field("config", &self.inner.config)
            .field("running", &state.running)
            .field("pending", &state.pending.as_ref().map_or(0, |b| b.waiters.len()))
            .finish()
    }
}

impl SandboxExecutor {
    /// Create an executor deploying immediately
    #[must_use]
    pub fn new(deployer: Arc<dyn BackendDeployer>, secret_client: Arc<dyn SecretClient>) -> Self {
        Self::with_config(deployer, secret_client, SandboxConfig::default())
    }

    /// Create an executor with explicit settings
    #[must_use]
    pub fn with_config(
        deployer: Arc<dyn BackendDeployer>,
        secret_client: Arc<dyn SecretClient>,
        config: SandboxConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                deployer,
                secret_client,
                config,
                state: Mutex::default(),
            }),
        }
    }

    /// Request a deploy and wait for the deploy that covers it
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// The error of the deploy this request was coalesced into.
    pub async fn deploy<F>(
        &self,
        backend_identifier: BackendIdentifier,
        validate_app_sources_provider: F,
        profile: Option<String>,
    ) -> DeployResult
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let request = DeployRequest {
            backend_identifier,
            validate_app_sources_provider: Arc::new(validate_app_sources_provider),
            profile,
        };
        let (tx, rx) = oneshot::channel();

        let start_worker = {
            let mut state = self.inner.state.lock();
            match &mut state.pending {
                Some(batch) => {
                    batch.request = request;
                    batch.waiters.push(tx);
                    tracing::debug!(waiters = batch.waiters.len(), "deploy request coalesced");
                }
                None => {
                    state.pending = Some(PendingBatch {
                        request,
                        waiters: vec![tx],
                    });
                }
            }
            !std::mem::replace(&mut state.running, true)
        };

        if start_worker {
            tokio::spawn(Arc::clone(&self.inner).run());
        }
        rx.await.unwrap_or(Err(SandboxError::ExecutorStopped))
    }

    /// Destroy the backend
    ///
    /// # Errors
    ///
    /// The deployer's error.
    pub async fn destroy(&self, backend_identifier: &BackendIdentifier) -> DeployResult {
        tracing::info!(backend = %backend_identifier, "destroying sandbox");
        self.inner.deployer.destroy(backend_identifier).await?;
        Ok(())
    }

    /// Whether a deploy is running or queued
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.state.lock().running
    }
}

impl Inner {
    async fn run(self: Arc<Self>) {
        loop {
            if let Some(window) = self.config.debounce() {
                tokio::time::sleep(window).await;
            }
            let batch = {
                let mut state = self.state.lock();
                let batch = state.pending.take();
                if batch.is_none() {
                    state.running = false;
                }
                batch
            };
            let Some(batch) = batch else {
                return;
            };

            let result = AssertUnwindSafe(self.deploy_batch(&batch.request))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(%message, "sandbox deployment panicked");
                    Err(SandboxError::DeploymentPanicked(message))
                });
            for waiter in batch.waiters {
                let _ = waiter.send(result.clone());
            }
        }
    }

    #[tracing::instrument(skip_all, fields(backend = %request.backend_identifier))]
    async fn deploy_batch(&self, request: &DeployRequest) -> DeployResult {
        let validate_app_sources = (request.validate_app_sources_provider)();
        let secrets = self.secret_client.list_secrets(&request.backend_identifier).await?;
        let props = DeployProps {
            profile: request.profile.clone(),
            secret_last_updated: latest_secret_update(&secrets),
            validate_app_sources,
        };

        tracing::info!(validate_app_sources, "deploying sandbox");
        match self.deployer.deploy(&request.backend_identifier, props).await {
            Ok(()) => {
                tracing::info!("sandbox deployed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(code = e.code(), error = %e, "sandbox deployment failed");
                Err(e.into())
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
