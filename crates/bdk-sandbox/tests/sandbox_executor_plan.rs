//! Functional tests for the sandbox executor with a gated deployer.
//!
//! The deployer blocks inside `deploy` until the test releases it, so
//! requests can be issued while a deploy is provably in flight.

use bdk_platform::BackendIdentifier;
use bdk_sandbox::{
    BackendDeployer, DeployProps, DeploymentError, SandboxConfig, SandboxExecutor, SecretClient, SecretError,
    SecretListItem,
};
use bdk_test_utils::init_test_tracing;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio_test::{assert_pending, task};

struct GatedDeployer {
    gated: bool,
    gate: Semaphore,
    entered: Notify,
    deploys: Mutex<Vec<DeployProps>>,
}

impl GatedDeployer {
    fn new(gated: bool) -> Arc<Self> {
        Arc::new(Self {
            gated,
            gate: Semaphore::new(0),
            entered: Notify::new(),
            deploys: Mutex::default(),
        })
    }

    fn release(&self, deploys: usize) {
        self.gate.add_permits(deploys);
    }

    fn profiles(&self) -> Vec<Option<String>> {
        self.deploys.lock().iter().map(|p| p.profile.clone()).collect()
    }
}

#[async_trait::async_trait]
impl BackendDeployer for GatedDeployer {
    async fn deploy(&self, _backend_identifier: &BackendIdentifier, props: DeployProps) -> Result<(), DeploymentError> {
        self.deploys.lock().push(props);
        self.entered.notify_one();
        if self.gated {
            self.gate
                .acquire()
                .await
                .map_err(|e| DeploymentError::Failed(e.to_string()))?
                .forget();
        }
        Ok(())
    }

    async fn destroy(&self, _backend_identifier: &BackendIdentifier) -> Result<(), DeploymentError> {
        Ok(())
    }
}

struct NoSecrets;

#[async_trait::async_trait]
impl SecretClient for NoSecrets {
    async fn list_secrets(&self, _backend_identifier: &BackendIdentifier) -> Result<Vec<SecretListItem>, SecretError> {
        Ok(Vec::new())
    }
}

fn sandbox_id() -> BackendIdentifier {
    BackendIdentifier::sandbox("testSandboxId", "testSandboxName")
}

fn counting(counter: &Arc<AtomicUsize>) -> impl Fn() -> bool + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        true
    }
}

/// Tenet: requests issued during a deploy collapse into exactly one
/// follow-up deploy that uses the latest arguments.
#[tokio::test]
async fn requests_during_deploy_collapse_into_one_follow_up() {
    init_test_tracing();
    let deployer = GatedDeployer::new(true);
    let executor = SandboxExecutor::new(deployer.clone(), Arc::new(NoSecrets));
    let validations = Arc::new(AtomicUsize::new(0));

    let mut first = task::spawn(executor.deploy(sandbox_id(), counting(&validations), Some("first".into())));
    assert_pending!(first.poll());
    deployer.entered.notified().await;

    let mut second = task::spawn(executor.deploy(sandbox_id(), counting(&validations), Some("second".into())));
    assert_pending!(second.poll());
    let mut third = task::spawn(executor.deploy(sandbox_id(), counting(&validations), Some("third".into())));
    assert_pending!(third.poll());

    deployer.release(2);
    let (first, second, third) = tokio::join!(first, second, third);

    assert_eq!((first, second, third), (Ok(()), Ok(()), Ok(())));
    assert_eq!(
        deployer.profiles(),
        vec![Some("first".to_string()), Some("third".to_string())]
    );
    assert_eq!(validations.load(Ordering::SeqCst), 2);
    assert!(!executor.is_busy());
}

/// Tenet: once idle, the next request starts a fresh deploy.
#[tokio::test]
async fn sequential_requests_deploy_each_time() {
    let deployer = GatedDeployer::new(false);
    let executor = SandboxExecutor::new(deployer.clone(), Arc::new(NoSecrets));

    executor.deploy(sandbox_id(), || false, None).await.unwrap();
    executor.deploy(sandbox_id(), || true, None).await.unwrap();

    let deploys = deployer.deploys.lock();
    assert_eq!(deploys.len(), 2);
    assert!(!deploys[0].validate_app_sources);
    assert!(deploys[1].validate_app_sources);
}

/// Tenet: within the debounce window requests join one deploy.
#[tokio::test]
async fn debounce_window_absorbs_late_requests() {
    let deployer = GatedDeployer::new(false);
    let config = SandboxConfig::default().with_debounce(Duration::from_millis(100));
    let executor = SandboxExecutor::with_config(deployer.clone(), Arc::new(NoSecrets), config);

    let early = tokio::spawn({
        let executor = executor.clone();
        async move { executor.deploy(sandbox_id(), || true, Some("early".into())).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let late = executor.deploy(sandbox_id(), || true, Some("late".into())).await;

    assert_eq!(early.await.unwrap(), Ok(()));
    assert_eq!(late, Ok(()));
    assert_eq!(deployer.profiles(), vec![Some("late".to_string())]);
}
