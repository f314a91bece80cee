//! Remote API seam.
//!
//! `RemoteApi` is implemented for [`sitepush_api::Client`]; tests use
//! scripted mocks. Using a trait keeps the deploy flow decoupled from HTTP.

use std::future::Future;
use std::pin::Pin;

use sitepush_api::{Client, DeployDescriptor, Error, SiteDescriptor};
use sitepush_manifest::Manifest;

/// Boxed future returned by [`RemoteApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// The calls a deploy attempt makes against the hosting API.
pub trait RemoteApi: Send + Sync {
    /// Confirms the site exists.
    fn get_site<'a>(&'a self, site_id: &'a str) -> ApiFuture<'a, SiteDescriptor>;

    /// Creates a deploy from a manifest.
    fn create_deploy<'a>(
        &'a self,
        site_id: &'a str,
        files: &'a Manifest,
    ) -> ApiFuture<'a, DeployDescriptor>;

    /// Uploads one file under its manifest path.
    fn upload_file<'a>(
        &'a self,
        deploy_id: &'a str,
        path: &'a str,
        data: Vec<u8>,
    ) -> ApiFuture<'a, ()>;

    /// Signals that all uploads are done.
    fn finish_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, ()>;

    /// Fetches deploy status.
    fn get_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, DeployDescriptor>;
}

impl RemoteApi for Client {
    fn get_site<'a>(&'a self, site_id: &'a str) -> ApiFuture<'a, SiteDescriptor> {
        Box::pin(Client::get_site(self, site_id))
    }

    fn create_deploy<'a>(
        &'a self,
        site_id: &'a str,
        files: &'a Manifest,
    ) -> ApiFuture<'a, DeployDescriptor> {
        Box::pin(Client::create_deploy(self, site_id, files))
    }

    fn upload_file<'a>(
        &'a self,
        deploy_id: &'a str,
        path: &'a str,
        data: Vec<u8>,
    ) -> ApiFuture<'a, ()> {
        Box::pin(Client::upload_file(self, deploy_id, path, data))
    }

    fn finish_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(Client::finish_deploy(self, deploy_id))
    }

    fn get_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, DeployDescriptor> {
        Box::pin(Client::get_deploy(self, deploy_id))
    }
}
