use std::sync::Arc;

use crate::client::PersistClient;
use crate::error::{PersistError, Result};
use crate::store::{PostgrestStore, TableStore};

pub struct PersistClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    schema: Option<String>,
    store: Option<Arc<dyn TableStore>>,
}

impl PersistClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            schema: None,
            store: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Use an existing store instead of connecting over HTTP.
    pub fn store(mut self, store: Arc<dyn TableStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<PersistClient> {
        if let Some(store) = self.store {
            return Ok(PersistClient::new(store));
        }

        let base_url = self
            .base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| PersistError::Config("base_url is required".to_string()))?;
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PersistError::Config("api_key is required".to_string()))?;

        let mut store = PostgrestStore::new(base_url, api_key)?;
        if let Some(schema) = self.schema {
            store = store.with_schema(schema);
        }

        Ok(PersistClient::new(Arc::new(store)))
    }
}

impl Default for PersistClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
