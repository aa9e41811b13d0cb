//! One-shot presence lookup over the Lanyard REST API.
//!
//! Independent of any running [`crate::PresenceLink`]: the result is handed
//! back to the caller and never touches a link's document.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::PresenceError;
use crate::model::PresenceDocument;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lanyard REST client.
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl RestClient {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, PresenceError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("lanyard-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_url(&self, user_id: &str) -> String {
        format!("{}/users/{}", self.base_url, user_id)
    }

    /// Fetch the current presence document for `user_id`.
    pub async fn fetch_presence(&self, user_id: &str) -> Result<PresenceDocument, PresenceError> {
        let url = self.user_url(user_id);
        debug!(%url, "fetching presence");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match parse_user_response(&body) {
            Err(PresenceError::Decode(e)) if !status.is_success() => Err(PresenceError::Api {
                code: status.as_u16().to_string(),
                message: e.to_string(),
            }),
            other => other,
        }
    }
}

/// Decode a `/users/{id}` response body.
pub fn parse_user_response(body: &str) -> Result<PresenceDocument, PresenceError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if !envelope.success {
        let err = envelope.error.unwrap_or(ApiError {
            code: "unknown_error".into(),
            message: "request failed without an error body".into(),
        });
        return Err(PresenceError::Api {
            code: err.code,
            message: err.message,
        });
    }
    let data = envelope.data.unwrap_or(serde_json::Value::Null);
    Ok(serde_json::from_value(data)?)
}
