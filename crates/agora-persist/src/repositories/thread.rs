use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Thread, ThreadStatus, ThreadView};
use crate::pagination::Paginated;
use crate::query::{Filter, QueryOptions};
use crate::repository::{Repository, Schema, TableRepository};
use crate::translate::{Embed, Predicate};

pub struct ThreadSchema;

impl Schema for ThreadSchema {
    type Write = Thread;
    type Read = ThreadView;
    type Key = Uuid;

    const ENTITY: &'static str = "Thread";
    const TABLE: &'static str = "threads";
    const SEARCH_FIELDS: &'static [&'static str] = &["title", "description"];
    const EMBEDS: &'static [Embed] = &[Embed::HasMany {
        alias: "participants",
        table: "thread_participants",
        foreign_key: "thread_id",
    }];
    const IMMUTABLE: &'static [&'static str] = &["creator_id", "created_at"];

    fn key_of(model: &Thread) -> Option<Uuid> {
        model.id
    }

    fn assign_key(model: &mut Thread) {
        model.id.get_or_insert_with(Uuid::new_v4);
    }

    fn key_predicates(key: &Uuid) -> Vec<Predicate> {
        vec![Predicate::eq("id", key)]
    }
}

pub type ThreadRepository = TableRepository<ThreadSchema>;

impl TableRepository<ThreadSchema> {
    /// Threads attached to one event.
    pub async fn find_by_event(&self, event_id: &str, options: &QueryOptions) -> Result<Vec<ThreadView>> {
        let options = options.clone().equal("event_id", event_id);
        self.list(&options).await
    }

    pub async fn find_active(&self, options: &QueryOptions) -> Result<Vec<ThreadView>> {
        let options = options.clone().equal("status", ThreadStatus::Active);
        self.list(&options).await
    }

    pub async fn find_by_creator(&self, creator_id: Uuid) -> Result<Vec<ThreadView>> {
        self.find_by_field("creator_id", &creator_id.to_string()).await
    }

    /// Title/description search with page metadata.
    pub async fn search_threads(&self, term: &str, options: &QueryOptions) -> Result<Paginated<ThreadView>> {
        let options = options.clone().search(term);
        self.paginate(&options).await
    }

    pub async fn count_by_status(&self, status: ThreadStatus) -> Result<u64> {
        self.count(&[Filter::equal("status", status)]).await
    }

    /// Reads the thread and writes it back with the new status.
    pub async fn set_status(&self, id: Uuid, status: ThreadStatus) -> Result<Thread> {
        let mut thread = self.find_by_id(&id).await?.into_record();
        thread.status = status;
        thread.updated_at = Utc::now();
        self.update(thread).await
    }
}
