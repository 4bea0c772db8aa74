use agora_persist::{Participant, ParticipantKey, ParticipantView, PersistClient, Repository};
use uuid::Uuid;

use super::Actor;
use crate::error::{Context, ServiceError, ServiceResult};

#[derive(Clone)]
pub struct ParticipantService {
    persist: PersistClient,
}

impl ParticipantService {
    pub fn new(persist: PersistClient) -> Self {
        Self { persist }
    }

    /// Joining twice returns the existing membership.
    pub async fn join(&self, actor: &Actor, thread_id: Uuid) -> ServiceResult<Participant> {
        let key = ParticipantKey::new(thread_id, actor.user_id);
        match self.persist.participants().find_by_id(&key).await {
            Ok(existing) => return Ok(existing.into_record()),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(ServiceError::from_persist("join", err)),
        }

        let thread_exists = self
            .persist
            .threads()
            .exists(&thread_id)
            .await
            .context("join")?;
        if !thread_exists {
            return Err(ServiceError::not_found("Thread", thread_id));
        }

        let created = self
            .persist
            .participants()
            .create(Participant::new(thread_id, actor.user_id).joined_now())
            .await;
        match created {
            Ok(participant) => {
                tracing::debug!(%thread_id, user = %actor.user_id, "Joined thread");
                Ok(participant)
            }
            // A concurrent join won the insert.
            Err(err) if err.is_unique_violation() => self
                .persist
                .participants()
                .find_by_id(&key)
                .await
                .map(ParticipantView::into_record)
                .context("join"),
            Err(err) => Err(ServiceError::from_persist("join", err)),
        }
    }

    pub async fn leave(&self, actor: &Actor, thread_id: Uuid) -> ServiceResult<()> {
        self.persist
            .participants()
            .remove(thread_id, actor.user_id)
            .await
            .context("leave")
    }

    /// Removing someone else requires being the thread's creator or an admin.
    pub async fn remove_participant(
        &self,
        actor: &Actor,
        thread_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<()> {
        if user_id != actor.user_id && !actor.is_admin() {
            let thread = self
                .persist
                .threads()
                .find_by_id(&thread_id)
                .await
                .context("remove_participant")?;
            if thread.creator_id != actor.user_id {
                return Err(ServiceError::authorization(
                    "only the thread creator or an admin may remove participants",
                ));
            }
        }

        self.persist
            .participants()
            .remove(thread_id, user_id)
            .await
            .context("remove_participant")
    }

    pub async fn participants(&self, thread_id: Uuid) -> ServiceResult<Vec<ParticipantView>> {
        self.persist
            .participants()
            .find_by_thread(thread_id)
            .await
            .context("participants")
    }
}
