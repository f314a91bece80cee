//! Static-hosting REST API client.
//!
//! Covers the endpoints a deploy needs (sites, deploys, blob uploads) and
//! normalizes failures into [`Error`], with 401 singled out as
//! [`Error::CredentialInvalid`].

pub mod client;
pub mod error;
pub mod types;

pub use client::{
    Client, DEFAULT_BASE_URL, RequestOptions, Response, encode_file_path, extract_error_detail,
};
pub use error::Error;
pub use types::{CreateDeployRequest, CreateSiteRequest, DeployDescriptor, DeployState, SiteDescriptor};
