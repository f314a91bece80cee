//! Picking the URL to report for a deploy.

use sitepush_api::{DeployDescriptor, SiteDescriptor};

/// A URL field of a deploy descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    DeploySslUrl,
    DeployUrl,
    SiteSslUrl,
    SiteUrl,
}

impl UrlSource {
    /// Reads this field from `deploy`; empty if absent.
    pub fn extract(self, deploy: &DeployDescriptor) -> &str {
        match self {
            Self::DeploySslUrl => &deploy.deploy_ssl_url,
            Self::DeployUrl => &deploy.deploy_url,
            Self::SiteSslUrl => &deploy.ssl_url,
            Self::SiteUrl => &deploy.url,
        }
    }
}

/// Candidate URL fields, most preferred first.
pub const URL_PREFERENCE: [UrlSource; 4] = [
    UrlSource::DeploySslUrl,
    UrlSource::DeployUrl,
    UrlSource::SiteSslUrl,
    UrlSource::SiteUrl,
];

/// First non-empty URL of `deploy` in [`URL_PREFERENCE`] order.
pub fn preferred_url(deploy: &DeployDescriptor) -> Option<&str> {
    URL_PREFERENCE
        .iter()
        .map(|source| source.extract(deploy))
        .find(|url| !url.is_empty())
}

/// Picks the URL to report.
///
/// `descriptors` are ordered most recent first; the selected site's public
/// URL is the last resort.
pub fn select_url(descriptors: &[&DeployDescriptor], site: &SiteDescriptor) -> Option<String> {
    descriptors
        .iter()
        .find_map(|deploy| preferred_url(deploy))
        .or_else(|| Some(site.public_url()).filter(|url| !url.is_empty()))
        .map(str::to_string)
}
