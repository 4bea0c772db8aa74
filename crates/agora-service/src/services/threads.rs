use agora_persist::{
    ErrorKind, Paginated, Participant, PersistClient, QueryParams, Repository, Thread, ThreadStatus,
    ThreadView,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::Actor;
use crate::error::{Context, ServiceError, ServiceResult};
use crate::validate::{normalize_description, validate_event_id, validate_title};

#[derive(Debug, Clone, Deserialize)]
pub struct NewThread {
    pub event_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial edit; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ThreadStatus>,
}

#[derive(Clone)]
pub struct ThreadService {
    persist: PersistClient,
}

impl ThreadService {
    pub fn new(persist: PersistClient) -> Self {
        Self { persist }
    }

    /// Stores the thread and enrols its creator as the first participant.
    pub async fn create_thread(&self, actor: &Actor, input: NewThread) -> ServiceResult<ThreadView> {
        let event_id = validate_event_id(&input.event_id)?;
        let title = validate_title(&input.title)?;

        let mut thread = Thread::new(event_id, actor.user_id, title);
        thread.description = normalize_description(input.description);

        let thread = self
            .persist
            .threads()
            .create(thread)
            .await
            .context("create_thread")?;
        let id = thread
            .id
            .ok_or_else(|| ServiceError::new(ErrorKind::Database, "stored thread has no id"))?;

        self.persist
            .participants()
            .create(Participant::new(id, actor.user_id).joined_now())
            .await
            .context("create_thread")?;

        tracing::info!(thread_id = %id, creator = %actor.user_id, "Thread created");
        self.get_thread(id).await
    }

    pub async fn get_thread(&self, id: Uuid) -> ServiceResult<ThreadView> {
        self.persist
            .threads()
            .find_by_id(&id)
            .await
            .context("get_thread")
    }

    pub async fn list_threads(&self, params: QueryParams) -> ServiceResult<Paginated<ThreadView>> {
        self.persist
            .threads()
            .paginate(&params.into_options())
            .await
            .context("list_threads")
    }

    pub async fn threads_for_event(
        &self,
        event_id: &str,
        params: QueryParams,
    ) -> ServiceResult<Paginated<ThreadView>> {
        let event_id = validate_event_id(event_id)?;
        let options = params.into_options().equal("event_id", event_id);
        self.persist
            .threads()
            .paginate(&options)
            .await
            .context("threads_for_event")
    }

    pub async fn update_thread(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: ThreadChanges,
    ) -> ServiceResult<Thread> {
        let mut thread = self.owned_thread(actor, id, "update_thread").await?;

        if let Some(title) = changes.title {
            thread.title = validate_title(&title)?;
        }
        if changes.description.is_some() {
            thread.description = normalize_description(changes.description);
        }
        if let Some(status) = changes.status {
            thread.status = status;
        }
        thread.updated_at = Utc::now();

        self.persist
            .threads()
            .update(thread)
            .await
            .context("update_thread")
    }

    pub async fn set_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: ThreadStatus,
    ) -> ServiceResult<Thread> {
        self.owned_thread(actor, id, "set_status").await?;
        self.persist
            .threads()
            .set_status(id, status)
            .await
            .context("set_status")
    }

    /// Messages and memberships go with the thread through storage cascades.
    pub async fn delete_thread(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        self.owned_thread(actor, id, "delete_thread").await?;
        self.persist
            .threads()
            .delete(&id)
            .await
            .context("delete_thread")?;
        tracing::info!(thread_id = %id, by = %actor.user_id, "Thread deleted");
        Ok(())
    }

    async fn owned_thread(&self, actor: &Actor, id: Uuid, operation: &str) -> ServiceResult<Thread> {
        let thread = self
            .persist
            .threads()
            .find_by_id(&id)
            .await
            .context(operation)?;
        if !actor.may_manage(thread.creator_id) {
            return Err(ServiceError::authorization(
                "only the thread creator or an admin may change this thread",
            ));
        }
        Ok(thread.into_record())
    }
}
