use uuid::Uuid;

use crate::error::{OperationContext, Result};
use crate::models::{Participant, ParticipantKey, ParticipantView};
use crate::query::Filter;
use crate::repository::{Repository, Schema, TableRepository};
use crate::translate::{Embed, Order, Predicate, TableQuery};

pub struct ParticipantSchema;

impl Schema for ParticipantSchema {
    type Write = Participant;
    type Read = ParticipantView;
    type Key = ParticipantKey;

    const ENTITY: &'static str = "Participant";
    const TABLE: &'static str = "thread_participants";
    const SEARCH_FIELDS: &'static [&'static str] = &[];
    const DEFAULT_SORT: &'static str = "user_id";
    const EMBEDS: &'static [Embed] = &[Embed::BelongsTo {
        alias: "user",
        table: "profiles",
        local_key: "user_id",
    }];

    fn key_of(model: &Participant) -> Option<ParticipantKey> {
        Some(model.key())
    }

    fn assign_key(_model: &mut Participant) {}

    fn key_predicates(key: &ParticipantKey) -> Vec<Predicate> {
        vec![
            Predicate::eq("thread_id", key.thread_id),
            Predicate::eq("user_id", key.user_id),
        ]
    }
}

pub type ParticipantRepository = TableRepository<ParticipantSchema>;

impl TableRepository<ParticipantSchema> {
    pub async fn find_by_thread(&self, thread_id: Uuid) -> Result<Vec<ParticipantView>> {
        let query = TableQuery::new()
            .with_predicate(Predicate::eq("thread_id", thread_id))
            .ordered_by(Order::asc(ParticipantSchema::DEFAULT_SORT));
        self.fetch(query).await.during("find_by_thread")
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<ParticipantView>> {
        self.find_by_field("user_id", &user_id.to_string()).await
    }

    pub async fn is_participant(&self, thread_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.exists(&ParticipantKey::new(thread_id, user_id)).await
    }

    pub async fn remove(&self, thread_id: Uuid, user_id: Uuid) -> Result<()> {
        self.delete(&ParticipantKey::new(thread_id, user_id)).await
    }

    pub async fn count_in_thread(&self, thread_id: Uuid) -> Result<u64> {
        self.count(&[Filter::equal("thread_id", thread_id)]).await
    }
}
