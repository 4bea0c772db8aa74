use uuid::Uuid;

use crate::error::{OperationContext, Result};
use crate::models::{Message, MessageView};
use crate::pagination::Paginated;
use crate::query::{Filter, QueryOptions};
use crate::repository::{Repository, Schema, TableRepository};
use crate::translate::{Embed, Order, Predicate, RowRange, TableQuery};

pub struct MessageSchema;

impl Schema for MessageSchema {
    type Write = Message;
    type Read = MessageView;
    type Key = Uuid;

    const ENTITY: &'static str = "Message";
    const TABLE: &'static str = "messages";
    const SEARCH_FIELDS: &'static [&'static str] = &["content"];
    const EMBEDS: &'static [Embed] = &[Embed::BelongsTo {
        alias: "sender",
        table: "profiles",
        local_key: "sender_id",
    }];
    const IMMUTABLE: &'static [&'static str] = &["thread_id", "sender_id", "created_at"];

    fn key_of(model: &Message) -> Option<Uuid> {
        model.id
    }

    fn assign_key(model: &mut Message) {
        model.id.get_or_insert_with(Uuid::new_v4);
    }

    fn key_predicates(key: &Uuid) -> Vec<Predicate> {
        vec![Predicate::eq("id", key)]
    }
}

pub type MessageRepository = TableRepository<MessageSchema>;

impl TableRepository<MessageSchema> {
    /// Every message of a thread, oldest first.
    pub async fn find_by_thread(&self, thread_id: Uuid) -> Result<Vec<MessageView>> {
        let query = TableQuery::new()
            .with_predicate(Predicate::eq("thread_id", thread_id))
            .ordered_by(Order::asc("created_at"));
        self.fetch(query).await.during("find_by_thread")
    }

    /// One page of a thread's messages. Oldest first unless the options sort otherwise.
    pub async fn find_by_thread_paginated(
        &self,
        thread_id: Uuid,
        options: &QueryOptions,
    ) -> Result<Paginated<MessageView>> {
        let mut options = options.clone().equal("thread_id", thread_id);
        if options.sort_field().is_none() {
            options = options.sort_by("created_at").ascending();
        }
        self.paginate(&options).await
    }

    pub async fn find_by_sender(&self, sender_id: Uuid) -> Result<Vec<MessageView>> {
        self.find_by_field("sender_id", &sender_id.to_string()).await
    }

    /// The latest `limit` messages of a thread, returned oldest first.
    pub async fn recent_in_thread(&self, thread_id: Uuid, limit: u32) -> Result<Vec<MessageView>> {
        let query = TableQuery::new()
            .with_predicate(Predicate::eq("thread_id", thread_id))
            .ordered_by(Order::desc("created_at"))
            .windowed(RowRange::first(u64::from(limit)));

        let mut messages = self.fetch(query).await.during("recent_in_thread")?;
        messages.reverse();
        Ok(messages)
    }

    pub async fn count_in_thread(&self, thread_id: Uuid) -> Result<u64> {
        self.count(&[Filter::equal("thread_id", thread_id)]).await
    }
}
