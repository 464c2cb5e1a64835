//! Sandbox error types
//!
//! Deploy results are broadcast to every caller whose request was coalesced
//! into one deploy, so all errors here are `Clone`.

/// Named deployment-state failures reported by the deployer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeploymentError {
    /// Another deployment of the same backend is running
    #[error("The deployment is already in progress")]
    DeploymentInProgress,

    /// The backend stack was never deployed or was deleted
    #[error("The stack of this backend does not exist")]
    StackDoesNotExist,

    /// The stack exists but has not published its outputs yet
    #[error("The stack outputs are not populated yet")]
    StackOutputsNotPopulated,

    /// Credentials used for the deployment expired
    #[error("The security token included in the request is expired")]
    ExpiredCredentials,

    /// Credentials lack permissions needed for the deployment
    #[error("Unable to deploy due to insufficient permissions")]
    InsufficientPermissions,

    /// Any other deployment failure
    #[error("Deployment failed: {0}")]
    Failed(String),
}

impl DeploymentError {
    /// Stable name of this error
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeploymentInProgress => "DeploymentInProgressError",
            Self::StackDoesNotExist => "StackDoesNotExistError",
            Self::StackOutputsNotPopulated => "StackOutputsNotPopulatedError",
            Self::ExpiredCredentials => "ExpiredTokenError",
            Self::InsufficientPermissions => "AccessDeniedError",
            Self::Failed(_) => "BackendDeploymentError",
        }
    }

    /// How to fix it
    #[must_use]
    pub fn resolution(&self) -> &'static str {
        match self {
            Self::DeploymentInProgress => "Wait for the current deployment to finish, then try again.",
            Self::StackDoesNotExist => "Ensure the backend identifier and region are correct and the backend was deployed.",
            Self::StackOutputsNotPopulated => "Wait for the deployment to complete, then try again.",
            Self::ExpiredCredentials => "Refresh your credentials and try again.",
            Self::InsufficientPermissions => {
                "Ensure your credentials grant the permissions required to deploy the backend."
            }
            Self::Failed(_) => "See the underlying error message for more details.",
        }
    }
}

/// Secret store failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to list secrets: {message}")]
pub struct SecretError {
    /// What went wrong
    pub message: String,
}

/// Sandbox executor error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    /// The deployer rejected the deployment
    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    /// Secrets could not be listed before the deployment
    #[error(transparent)]
    Secrets(#[from] SecretError),

    /// The executor task stopped before reporting a result
    #[error("sandbox executor stopped before the deployment finished")]
    ExecutorStopped,

    /// Source validation or the deployer panicked during the deployment
    #[error("sandbox deployment panicked: {0}")]
    DeploymentPanicked(String),
}

impl SandboxError {
    /// Stable name of this error
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Deployment(e) => e.code(),
            Self::Secrets(_) => "SecretListError",
            Self::ExecutorStopped => "SandboxExecutorStoppedError",
            Self::DeploymentPanicked(_) => "SandboxDeploymentPanickedError",
        }
    }
}
