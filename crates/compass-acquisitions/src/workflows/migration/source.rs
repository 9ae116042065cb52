use serde_json::Value;
use std::fmt::Debug;

use super::{LegacyEntity, MigrationError};
use crate::config::LegacyConfig;
use crate::http::JsonClient;

pub trait LegacySource: Debug {
    fn fetch(&self, entity: LegacyEntity) -> Result<Vec<Value>, MigrationError>;
}

/// Reads entity collections from the legacy app's public API.
#[derive(Debug)]
pub struct LegacyApiClient {
    http: JsonClient,
    base_url: String,
}

impl LegacyApiClient {
    pub fn new(config: &LegacyConfig) -> Result<Self, MigrationError> {
        let http = JsonClient::new(config.timeout).map_err(MigrationError::Client)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl LegacySource for LegacyApiClient {
    fn fetch(&self, entity: LegacyEntity) -> Result<Vec<Value>, MigrationError> {
        let url = format!("{}/{}", self.base_url, entity.api_name());
        self.http
            .get(&url, &[], None)
            .map_err(|source| MigrationError::Fetch { entity, source })
    }
}
