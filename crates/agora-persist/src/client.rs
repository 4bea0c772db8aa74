use std::sync::Arc;

use crate::builder::PersistClientBuilder;
use crate::error::Result;
use crate::repositories::{MessageRepository, ParticipantRepository, ThreadRepository};
use crate::store::{PostgrestStore, TableStore};

/// Entry point bundling one repository per entity over a shared store.
#[derive(Clone)]
pub struct PersistClient {
    store: Arc<dyn TableStore>,
    thread_repo: ThreadRepository,
    message_repo: MessageRepository,
    participant_repo: ParticipantRepository,
}

impl PersistClient {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            thread_repo: ThreadRepository::new(Arc::clone(&store)),
            message_repo: MessageRepository::new(Arc::clone(&store)),
            participant_repo: ParticipantRepository::new(Arc::clone(&store)),
            store,
        }
    }

    /// Connect to a PostgREST endpoint with a service key.
    pub fn connect(base_url: &str, api_key: &str) -> Result<Self> {
        let store = PostgrestStore::new(base_url, api_key)?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn builder() -> PersistClientBuilder {
        PersistClientBuilder::new()
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    pub fn threads(&self) -> &ThreadRepository {
        &self.thread_repo
    }

    pub fn messages(&self) -> &MessageRepository {
        &self.message_repo
    }

    pub fn participants(&self) -> &ParticipantRepository {
        &self.participant_repo
    }
}
