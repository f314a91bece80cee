//! Wire types for the hosting API.
//!
//! The API omits or nulls fields freely, so every string field tolerates
//! both and unknown fields are ignored.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn vec_or_null<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A hosting target as returned by `/sites`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    pub id: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_null", skip_serializing_if = "String::is_empty")]
    pub ssl_url: String,
}

impl SiteDescriptor {
    /// Public URL, preferring HTTPS.
    pub fn public_url(&self) -> &str {
        if self.ssl_url.is_empty() {
            &self.url
        } else {
            &self.ssl_url
        }
    }

    /// Name for display, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Lifecycle state of a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum DeployState {
    Uploading,
    Processing,
    Ready,
    Error,
    /// Any state this client does not distinguish (`new`, `prepared`, ...).
    Other(String),
}

impl DeployState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Other(s) => s,
        }
    }

    /// `ready` and `error` end a deploy; everything else is still in progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

impl Default for DeployState {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<Option<String>> for DeployState {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("uploading") => Self::Uploading,
            Some("processing") => Self::Processing,
            Some("ready") => Self::Ready,
            Some("error") => Self::Error,
            _ => Self::Other(value.unwrap_or_default()),
        }
    }
}

impl From<DeployState> for String {
    fn from(state: DeployState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deploy as returned by `/sites/{id}/deploys` and `/deploys/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployDescriptor {
    pub id: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub site_id: String,
    #[serde(default)]
    pub state: DeployState,
    /// Paths or digests the remote still needs uploaded.
    #[serde(default, deserialize_with = "vec_or_null")]
    pub required: Vec<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub deploy_url: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub deploy_ssl_url: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub ssl_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Body of `POST /sites`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateSiteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

/// Body of `POST /sites/{id}/deploys`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateDeployRequest<'a> {
    pub files: &'a BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_descriptor_tolerates_nulls_and_extras() {
        let json = r#"{
            "id": "d1",
            "site_id": "s1",
            "state": "uploading",
            "required": null,
            "deploy_url": "http://d1--site.example.app",
            "deploy_ssl_url": null,
            "summary": {"status": "pending"}
        }"#;
        let deploy: DeployDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(deploy.id, "d1");
        assert_eq!(deploy.state, DeployState::Uploading);
        assert!(deploy.required.is_empty());
        assert_eq!(deploy.deploy_ssl_url, "");
        assert_eq!(deploy.deploy_url, "http://d1--site.example.app");
        assert_eq!(deploy.error_message, None);
    }

    #[test]
    fn deploy_state_parsing() {
        let parse = |s: &str| -> DeployState {
            serde_json::from_str::<DeployDescriptor>(&format!(r#"{{"id":"d","state":{s}}}"#))
                .unwrap()
                .state
        };
        assert_eq!(parse(r#""ready""#), DeployState::Ready);
        assert_eq!(parse(r#""error""#), DeployState::Error);
        assert_eq!(parse(r#""processing""#), DeployState::Processing);
        assert_eq!(parse(r#""prepared""#), DeployState::Other("prepared".into()));
        assert_eq!(parse("null"), DeployState::Other(String::new()));
        assert!(!parse(r#""prepared""#).is_terminal());
        assert!(parse(r#""ready""#).is_terminal());
    }

    #[test]
    fn deploy_state_serializes_as_string() {
        let json = serde_json::to_string(&DeployState::Processing).unwrap();
        assert_eq!(json, r#""processing""#);
    }

    #[test]
    fn site_public_url_prefers_ssl() {
        let site: SiteDescriptor = serde_json::from_str(
            r#"{"id":"s1","name":"blog","url":"http://blog.example.app","ssl_url":"https://blog.example.app"}"#,
        )
        .unwrap();
        assert_eq!(site.public_url(), "https://blog.example.app");

        let plain = SiteDescriptor {
            id: "s2".into(),
            url: "http://x.example.app".into(),
            ..Default::default()
        };
        assert_eq!(plain.public_url(), "http://x.example.app");
        assert_eq!(plain.display_name(), "s2");
    }

    #[test]
    fn create_site_request_omits_missing_name() {
        let body = serde_json::to_string(&CreateSiteRequest::default()).unwrap();
        assert_eq!(body, "{}");
        let body = serde_json::to_string(&CreateSiteRequest { name: Some("blog") }).unwrap();
        assert_eq!(body, r#"{"name":"blog"}"#);
    }
}
