//! Hosting API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.
//! [`Client::call`] is the single request path; the typed endpoint helpers
//! are thin wrappers over it.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::Error;
use crate::types::{CreateDeployRequest, CreateSiteRequest, DeployDescriptor, SiteDescriptor};

pub const DEFAULT_BASE_URL: &str = "https://api.netlify.com/api/v1";

const JSON_CONTENT_TYPE: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Per-request options for [`Client::call`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    /// Replaces the default header of the same name.
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Skip parsing the response body on success.
    pub raw_response: bool,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    /// A JSON request with `body` serialized as the payload.
    pub fn json<T: Serialize + ?Sized>(method: Method, body: &T) -> Result<Self, Error> {
        Ok(Self {
            method,
            body: Some(serde_json::to_vec(body)?),
            ..Self::default()
        })
    }

    /// A binary upload; the response body is not parsed.
    pub fn octet_stream(method: Method, data: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
        Self {
            method,
            headers,
            body: Some(data),
            raw_response: true,
        }
    }
}

/// Successful response of [`Client::call`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Returned for `raw_response` requests.
    Empty,
    Json(Value),
}

impl Response {
    /// Deserializes the JSON payload into `T`.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, Error> {
        match self {
            Self::Json(value) => Ok(serde_json::from_value(value)?),
            Self::Empty => Ok(serde_json::from_value(Value::Null)?),
        }
    }
}

/// Hosting API client bound to one access token.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    default_headers: HeaderMap,
}

impl Client {
    /// Creates a new client for the public API endpoint.
    pub fn new(token: &str) -> Result<Self, Error> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Creates a client for a custom API endpoint (self-hosted or tests).
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, Error> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::InvalidToken);
        }

        let mut default_headers = HeaderMap::new();
        let mut auth =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| Error::InvalidToken)?;
        auth.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, auth);
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs an authenticated request against `endpoint`.
    ///
    /// A 401 is always [`Error::CredentialInvalid`]. Other failures carry the
    /// status and the detail extracted from the body.
    pub async fn call(&self, endpoint: &str, options: RequestOptions) -> Result<Response, Error> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut headers = self.default_headers.clone();
        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }

        trace!(method = %options.method, %url, "request");
        let mut req = self.http.request(options.method.clone(), &url).headers(headers);
        if let Some(body) = options.body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            if status.as_u16() == 401 {
                return Err(Error::CredentialInvalid);
            }
            let status_text = reason_phrase(&resp);
            let body = resp.text().await.unwrap_or_default();
            debug!(method = %options.method, %url, status = status.as_u16(), "request failed");
            return Err(Error::Api {
                status: status.as_u16(),
                status_text,
                detail: extract_error_detail(&body),
            });
        }

        if options.raw_response {
            return Ok(Response::Empty);
        }

        let bytes = resp.bytes().await?;
        Ok(Response::Json(serde_json::from_slice(&bytes)?))
    }

    /// Fetches a site; used to confirm the target still exists.
    pub async fn get_site(&self, site_id: &str) -> Result<SiteDescriptor, Error> {
        let endpoint = format!("/sites/{}", encode_segment(site_id));
        self.call(&endpoint, RequestOptions::get()).await?.parse()
    }

    /// Lists the first page of sites visible to the token.
    pub async fn list_sites(&self) -> Result<Vec<SiteDescriptor>, Error> {
        self.call("/sites?per_page=50", RequestOptions::get())
            .await?
            .parse()
    }

    /// Creates a site. Without a name the remote picks one.
    pub async fn create_site(&self, name: Option<&str>) -> Result<SiteDescriptor, Error> {
        let body = CreateSiteRequest { name };
        self.call("/sites", RequestOptions::json(Method::POST, &body)?)
            .await?
            .parse()
    }

    /// Submits a manifest and returns the new deploy with its `required` list.
    pub async fn create_deploy(
        &self,
        site_id: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<DeployDescriptor, Error> {
        let endpoint = format!("/sites/{}/deploys", encode_segment(site_id));
        let body = CreateDeployRequest { files };
        self.call(&endpoint, RequestOptions::json(Method::POST, &body)?)
            .await?
            .parse()
    }

    /// Uploads one file's bytes under its manifest path.
    pub async fn upload_file(&self, deploy_id: &str, path: &str, data: Vec<u8>) -> Result<(), Error> {
        let endpoint = format!(
            "/deploys/{}/files/{}",
            encode_segment(deploy_id),
            encode_file_path(path)
        );
        self.call(&endpoint, RequestOptions::octet_stream(Method::PUT, data))
            .await?;
        Ok(())
    }

    /// Tells the remote all required files have been uploaded.
    pub async fn finish_deploy(&self, deploy_id: &str) -> Result<(), Error> {
        let endpoint = format!("/deploys/{}/finish", encode_segment(deploy_id));
        let options = RequestOptions {
            method: Method::POST,
            body: Some(Vec::new()),
            raw_response: true,
            ..RequestOptions::default()
        };
        self.call(&endpoint, options).await?;
        Ok(())
    }

    /// Fetches the current state of a deploy.
    pub async fn get_deploy(&self, deploy_id: &str) -> Result<DeployDescriptor, Error> {
        let endpoint = format!("/deploys/{}", encode_segment(deploy_id));
        self.call(&endpoint, RequestOptions::get()).await?.parse()
    }
}

/// Reason phrase sent by the server, or the canonical one for the status.
///
/// hyper only records the phrase when it differs from the canonical text.
fn reason_phrase(resp: &reqwest::Response) -> String {
    resp.extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
        .or_else(|| resp.status().canonical_reason())
        .unwrap_or_default()
        .to_string()
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, URI_COMPONENT).to_string()
}

/// Encodes a manifest path for use after `/files/`.
///
/// Each segment is escaped like `encodeURIComponent` and the separators
/// between them stay literal. The leading `/` of a manifest path is part of
/// the file name on the remote side and is sent as `%2F`.
pub fn encode_file_path(path: &str) -> String {
    let (prefix, rest) = match path.strip_prefix('/') {
        Some(rest) => ("%2F", rest),
        None => ("", path),
    };
    let segments: Vec<String> = rest.split('/').map(encode_segment).collect();
    format!("{prefix}{}", segments.join("/"))
}

/// Extracts a human-readable detail from an error response body.
///
/// Prefers a top-level `message`, then a flattened `errors` field (list
/// joined by `, `; map rendered as `key: v1, v2` pairs joined by `; `).
/// Falls back to the raw body.
pub fn extract_error_detail(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    match &parsed {
        Value::Array(items) => join_values(items, ", "),
        Value::Object(map) => {
            if let Some(message) = map.get("message").filter(|v| is_truthy(v)) {
                return value_text(message);
            }
            match map.get("errors") {
                Some(Value::Array(items)) => join_values(items, ", "),
                Some(Value::Object(errors)) => errors
                    .iter()
                    .map(|(key, value)| match value {
                        Value::Array(items) => format!("{key}: {}", join_values(items, ", ")),
                        other => format!("{key}: {}", value_text(other)),
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
                _ => body.to_string(),
            }
        }
        _ => body.to_string(),
    }
}

fn join_values(items: &[Value], sep: &str) -> String {
    items.iter().map(value_text).collect::<Vec<_>>().join(sep)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
