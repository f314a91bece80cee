//! Host-owned inputs to a deploy: the access token and the selected
//! folder and site.

use std::path::PathBuf;

use sitepush_api::SiteDescriptor;

use crate::error::DeployError;

/// Supplies the bearer token on demand.
pub trait CredentialProvider {
    fn token(&self) -> Option<String>;
}

/// Supplies the currently selected deploy folder and site.
pub trait SelectionStore {
    fn folder(&self) -> Option<PathBuf>;
    fn site(&self) -> Option<SiteDescriptor>;
}

/// Everything a deploy attempt needs from the host, read once.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub token: String,
    pub folder: PathBuf,
    pub site: SiteDescriptor,
}

impl DeployRequest {
    /// Snapshots the collaborators for one attempt.
    ///
    /// Fails before any network activity if the token, folder, or site is
    /// missing.
    pub fn gather(
        credentials: &dyn CredentialProvider,
        selection: &dyn SelectionStore,
    ) -> Result<Self, DeployError> {
        let token = credentials
            .token()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(DeployError::NoCredential)?;
        let folder = selection
            .folder()
            .filter(|f| !f.as_os_str().is_empty())
            .ok_or(DeployError::NoFolderSelected)?;
        let site = selection
            .site()
            .filter(|s| !s.id.is_empty())
            .ok_or(DeployError::NoSiteSelected)?;

        Ok(Self {
            token,
            folder,
            site,
        })
    }
}
