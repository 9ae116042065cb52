use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{CmsError, CmsGateway, ACQUISITION_QUERY};
use crate::config::CmsConfig;
use crate::http::JsonClient;
use crate::workflows::acquisitions::RemoteRecord;

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MutationResponse {
    transaction_id: Option<String>,
    results: Vec<MutationResult>,
}

#[derive(Debug, Deserialize)]
struct MutationResult {
    id: String,
}

/// Client for the Sanity HTTP API (query and mutate endpoints).
#[derive(Debug)]
pub struct SanityClient {
    http: JsonClient,
    config: CmsConfig,
}

impl SanityClient {
    pub fn new(config: CmsConfig) -> Result<Self, CmsError> {
        let http = JsonClient::new(config.timeout)?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v{}/data/{}/{}",
            self.config.api_host.trim_end_matches('/'),
            self.config.api_version,
            action,
            self.config.dataset
        )
    }

    pub fn query<T: serde::de::DeserializeOwned>(&self, groq: &str) -> Result<T, CmsError> {
        let url = self.endpoint("query");
        let response: QueryResponse<T> = self.http.get(
            &url,
            &[("query", groq)],
            self.config.write_token.as_deref(),
        )?;
        Ok(response.result)
    }

    fn mutate(&self, mutation: Value) -> Result<String, CmsError> {
        let token = self
            .config
            .write_token
            .as_deref()
            .ok_or(CmsError::MissingToken)?;
        let url = self.endpoint("mutate");
        let body = json!({ "mutations": [mutation] });
        let response: MutationResponse =
            self.http
                .post(&url, &[("returnIds", "true")], Some(token), &body)?;

        debug!(
            transaction = response.transaction_id.as_deref().unwrap_or("-"),
            "mutation committed"
        );
        response
            .results
            .into_iter()
            .next()
            .map(|result| result.id)
            .ok_or_else(|| CmsError::Rejected("mutation returned no document ids".to_string()))
    }
}

impl CmsGateway for SanityClient {
    fn fetch_acquisitions(&self) -> Result<Vec<RemoteRecord>, CmsError> {
        self.query(ACQUISITION_QUERY)
    }

    fn create(&self, document: &Value) -> Result<String, CmsError> {
        self.mutate(json!({ "create": document }))
    }

    fn patch(&self, id: &str, set: &Map<String, Value>) -> Result<(), CmsError> {
        self.mutate(json!({ "patch": { "id": id, "set": set } }))
            .map(|_| ())
    }

    fn create_or_replace(&self, document: &Value) -> Result<String, CmsError> {
        self.mutate(json!({ "createOrReplace": document }))
    }
}
