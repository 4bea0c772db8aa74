use std::sync::Arc;

use agora_persist::{PersistClient, Result};

use crate::config::Config;
use crate::services::{MessageService, ParticipantService, ThreadService};

/// Shared application state handed to every request handler.
///
/// Cloning is cheap: the services share one storage client.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: PersistClient,
    pub threads: ThreadService,
    pub messages: MessageService,
    pub participants: ParticipantService,
}

impl AppState {
    pub fn new(config: Config, persist: PersistClient) -> Self {
        Self {
            config: Arc::new(config),
            threads: ThreadService::new(persist.clone()),
            messages: MessageService::new(persist.clone()),
            participants: ParticipantService::new(persist.clone()),
            persist,
        }
    }

    /// Connects to the configured endpoint.
    pub fn connect(config: Config) -> Result<Self> {
        let mut builder = PersistClient::builder()
            .base_url(&config.storage_url)
            .api_key(&config.storage_api_key);
        if let Some(schema) = &config.storage.schema {
            builder = builder.schema(schema);
        }
        let persist = builder.build()?;
        Ok(Self::new(config, persist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoggingConfig, StorageConfig};
    use agora_persist::{MemoryStore, QueryParams};

    fn config() -> Config {
        Config {
            storage: StorageConfig { schema: None },
            logging: LoggingConfig {
                level: "debug".into(),
                format: "pretty".into(),
            },
            storage_url: String::new(),
            storage_api_key: String::new(),
        }
    }

    #[test]
    fn test_connect_requires_storage_url() {
        assert!(AppState::connect(config()).is_err());
    }

    #[test]
    fn test_services_share_the_store() {
        let store = MemoryStore::new();
        let state = AppState::new(config(), PersistClient::new(Arc::new(store.clone())));

        let page = tokio_test::block_on(state.threads.list_threads(QueryParams::default())).unwrap();

        assert!(page.items.is_empty());
        assert!(store
            .recorded_queries()
            .iter()
            .all(|recorded| recorded.table == "threads"));
    }
}
