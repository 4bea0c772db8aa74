use agora_persist::{
    Message, MessageType, MessageView, Paginated, PersistClient, QueryParams, Repository,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::Actor;
use crate::error::{Context, ServiceError, ServiceResult};
use crate::validate::validate_content;

#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

#[derive(Clone)]
pub struct MessageService {
    persist: PersistClient,
}

impl MessageService {
    pub fn new(persist: PersistClient) -> Self {
        Self { persist }
    }

    /// Membership is enforced by the storage engine; a missing thread is
    /// reported here as `NotFound`.
    pub async fn post_message(
        &self,
        actor: &Actor,
        thread_id: Uuid,
        input: NewMessage,
    ) -> ServiceResult<Message> {
        let content = validate_content(&input.content)?;

        let thread_exists = self
            .persist
            .threads()
            .exists(&thread_id)
            .await
            .context("post_message")?;
        if !thread_exists {
            return Err(ServiceError::not_found("Thread", thread_id));
        }

        let message = Message::new(thread_id, actor.user_id, content).with_type(input.message_type);
        let message = self
            .persist
            .messages()
            .create(message)
            .await
            .context("post_message")?;

        tracing::debug!(%thread_id, sender = %actor.user_id, "Message posted");
        Ok(message)
    }

    pub async fn get_message(&self, id: Uuid) -> ServiceResult<MessageView> {
        self.persist
            .messages()
            .find_by_id(&id)
            .await
            .context("get_message")
    }

    /// Oldest first unless `params` sorts otherwise.
    pub async fn thread_messages(
        &self,
        thread_id: Uuid,
        params: QueryParams,
    ) -> ServiceResult<Paginated<MessageView>> {
        self.persist
            .messages()
            .find_by_thread_paginated(thread_id, &params.into_options())
            .await
            .context("thread_messages")
    }

    /// Only the sender may edit.
    pub async fn edit_message(&self, actor: &Actor, id: Uuid, content: &str) -> ServiceResult<Message> {
        let content = validate_content(content)?;
        let view = self.get_message(id).await?;
        if view.sender_id != actor.user_id {
            return Err(ServiceError::authorization("only the sender may edit a message"));
        }

        let mut message = view.into_record();
        message.content = content;
        message.updated_at = Utc::now();

        self.persist
            .messages()
            .update(message)
            .await
            .context("edit_message")
    }

    /// The sender, the thread's creator, or an admin may delete.
    pub async fn delete_message(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        let message = self.get_message(id).await?;

        let allowed = if actor.may_manage(message.sender_id) {
            true
        } else {
            let thread = self
                .persist
                .threads()
                .find_by_id(&message.thread_id)
                .await
                .context("delete_message")?;
            thread.creator_id == actor.user_id
        };
        if !allowed {
            return Err(ServiceError::authorization(
                "only the sender, the thread creator or an admin may delete a message",
            ));
        }

        self.persist
            .messages()
            .delete(&id)
            .await
            .context("delete_message")
    }
}
