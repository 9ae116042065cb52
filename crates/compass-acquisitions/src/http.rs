//! Blocking JSON-over-HTTP helper shared by the CMS and legacy API clients.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("http runtime unavailable: {0}")]
    Runtime(String),
}

/// Owns a tokio runtime so callers stay synchronous.
pub struct JsonClient {
    client: Client,
    runtime: Runtime,
}

impl std::fmt::Debug for JsonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonClient").finish_non_exhaustive()
    }
}

impl JsonClient {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let runtime = Runtime::new().map_err(|err| HttpError::Runtime(err.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("compass-acquisitions/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| HttpError::Runtime(err.to_string()))?;
        Ok(Self { client, runtime })
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> Result<T, HttpError> {
        debug!(%url, "GET");
        let request = self.client.get(url).query(query);
        self.send(url, with_bearer(request, bearer))
    }

    pub fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<T, HttpError> {
        debug!(%url, "POST");
        let request = self.client.post(url).query(query).json(body);
        self.send(url, with_bearer(request, bearer))
    }

    fn send<T: DeserializeOwned>(&self, url: &str, request: RequestBuilder) -> Result<T, HttpError> {
        let transport = |source| HttpError::Transport {
            url: url.to_string(),
            source,
        };

        let (status, body) = self.runtime.block_on(async {
            let response = request.send().await.map_err(transport)?;
            let status = response.status();
            let body = response.text().await.map_err(transport)?;
            Ok::<_, HttpError>((status, body))
        })?;

        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| HttpError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

fn with_bearer(request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
    match bearer {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Pulls a readable message out of an error body. Sanity answers with
/// `{"error": {"description": ...}}`, other services with `{"message": ...}`.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let described = parsed.as_ref().and_then(|value| {
        value
            .pointer("/error/description")
            .or_else(|| value.get("message"))
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    described.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "empty response body".to_string()
        } else {
            trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
        }
    })
}
