//! Deploy error types.

use sitepush_manifest::ManifestError;

/// Errors that end a deploy attempt.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Api(#[from] sitepush_api::Error),

    #[error("nothing to deploy: the folder has no eligible files")]
    EmptyDeploy,

    #[error("required file not found locally: {entry}")]
    MissingFile { entry: String },

    #[error("deploy {deploy_id} failed during processing")]
    DeployFailed {
        deploy_id: String,
        message: Option<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("no access token configured")]
    NoCredential,

    #[error("no folder selected")]
    NoFolderSelected,

    #[error("no site selected")]
    NoSiteSelected,

    #[error("cancelled")]
    Cancelled,

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DeployError {
    /// True when the remote rejected the access token.
    pub fn is_credential_invalid(&self) -> bool {
        matches!(self, Self::Api(sitepush_api::Error::CredentialInvalid))
    }
}
