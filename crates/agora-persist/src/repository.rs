//! The generic repository contract shared by every entity.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{OperationContext, PersistError, Result};
use crate::pagination::{assemble, Paginated};
use crate::query::{Filter, QueryOptions};
use crate::store::TableStore;
use crate::translate::{translate, translate_filters, Embed, Order, Predicate, TableQuery};

/// CRUD and query operations over a write model `W` and a read model `R`.
///
/// `R` may carry joined relations; `W` never does.
#[async_trait]
pub trait Repository<W, R>: Send + Sync
where
    W: Send + 'static,
    R: Send + 'static,
{
    type Key: fmt::Display + Send + Sync;

    /// Persist a new record, assigning an identifier if it has none.
    async fn create(&self, model: W) -> Result<W>;

    /// Exactly one record with its relations, or `NotFound`.
    async fn find_by_id(&self, id: &Self::Key) -> Result<R>;

    /// Replace of the record identified by the model's key. Columns the
    /// schema marks immutable keep their stored values.
    async fn update(&self, model: W) -> Result<W>;

    async fn delete(&self, id: &Self::Key) -> Result<()>;

    /// One page of matching records, without a total.
    async fn list(&self, options: &QueryOptions) -> Result<Vec<R>>;

    /// One page of matching records and the number of matches across all pages.
    async fn search(&self, options: &QueryOptions) -> Result<(Vec<R>, u64)>;

    async fn count(&self, filters: &[Filter]) -> Result<u64>;

    /// Every record whose `field` equals `value`.
    async fn find_by_field(&self, field: &str, value: &str) -> Result<Vec<R>>;

    /// Whether [`find_by_id`](Self::find_by_id) would succeed. A missing
    /// record is `Ok(false)`, not an error.
    async fn exists(&self, id: &Self::Key) -> Result<bool> {
        match self.find_by_id(id).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// [`search`](Self::search) wrapped with page metadata.
    async fn paginate(&self, options: &QueryOptions) -> Result<Paginated<R>> {
        let (rows, total) = self.search(options).await?;
        Ok(assemble(
            rows,
            total,
            options.current_page(),
            options.current_page_size(),
        ))
    }
}

/// How an entity maps onto its table.
pub trait Schema: Send + Sync + 'static {
    type Write: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
    type Read: DeserializeOwned + Send + Sync + 'static;
    type Key: fmt::Display + Send + Sync + 'static;

    /// Human-readable entity name used in errors.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    /// Columns a free-text search term is matched against.
    const SEARCH_FIELDS: &'static [&'static str];
    const DEFAULT_SORT: &'static str = "created_at";
    /// Relations joined into every read-model row.
    const EMBEDS: &'static [Embed] = &[];
    /// Columns fixed at creation. Updates never write them.
    const IMMUTABLE: &'static [&'static str] = &[];

    fn key_of(model: &Self::Write) -> Option<Self::Key>;

    /// Give a new record its identity. No-op for naturally keyed entities.
    fn assign_key(model: &mut Self::Write);

    fn key_predicates(key: &Self::Key) -> Vec<Predicate>;
}

/// [`Repository`] implementation for any [`Schema`] on top of a [`TableStore`].
pub struct TableRepository<S: Schema> {
    store: Arc<dyn TableStore>,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> Clone for TableRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _schema: PhantomData,
        }
    }
}

impl<S: Schema> TableRepository<S> {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            _schema: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(PersistError::from))
            .collect()
    }

    fn query_for(options: &QueryOptions) -> Result<TableQuery> {
        Ok(translate(options, S::DEFAULT_SORT, S::SEARCH_FIELDS)?.embedding(S::EMBEDS))
    }

    /// Runs an arbitrary read with the schema's relations joined in.
    pub(crate) async fn fetch(&self, query: TableQuery) -> Result<Vec<S::Read>> {
        let query = query.embedding(S::EMBEDS);
        tracing::debug!(table = S::TABLE, ?query, "Fetching rows");
        let rows = self.store.select(S::TABLE, &query).await?;
        Self::decode_rows(rows)
    }

    async fn insert_model(&self, mut model: S::Write) -> Result<S::Write> {
        S::assign_key(&mut model);
        let row = serde_json::to_value(&model)?;
        let stored = self.store.insert(S::TABLE, row).await?;
        tracing::debug!(table = S::TABLE, "Created {}", S::ENTITY);
        Ok(serde_json::from_value(stored)?)
    }

    async fn select_one(&self, id: &S::Key) -> Result<S::Read> {
        let query = TableQuery::new()
            .matching(S::key_predicates(id))
            .embedding(S::EMBEDS);
        let row = self
            .store
            .select(S::TABLE, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PersistError::not_found(S::ENTITY, id))?;
        Ok(serde_json::from_value(row)?)
    }

    async fn replace_model(&self, model: S::Write) -> Result<S::Write> {
        let key = S::key_of(&model).ok_or_else(|| {
            PersistError::Validation(format!("{} identifier is required for update", S::ENTITY))
        })?;
        let mut row = serde_json::to_value(&model)?;
        if let Value::Object(columns) = &mut row {
            for column in S::IMMUTABLE {
                columns.remove(*column);
            }
        }
        let stored = self
            .store
            .update(S::TABLE, &S::key_predicates(&key), row)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PersistError::not_found(S::ENTITY, &key))?;
        Ok(serde_json::from_value(stored)?)
    }

    async fn select_page(&self, options: &QueryOptions) -> Result<Vec<S::Read>> {
        let query = Self::query_for(options)?;
        tracing::debug!(table = S::TABLE, ?query, "Listing rows");
        let rows = self.store.select(S::TABLE, &query).await?;
        Self::decode_rows(rows)
    }

    async fn select_page_counted(&self, options: &QueryOptions) -> Result<(Vec<S::Read>, u64)> {
        let query = Self::query_for(options)?;
        tracing::debug!(table = S::TABLE, ?query, "Searching rows");
        let (rows, total) = self.store.select_counted(S::TABLE, &query).await?;
        Ok((Self::decode_rows(rows)?, total))
    }
}

#[async_trait]
impl<S: Schema> Repository<S::Write, S::Read> for TableRepository<S> {
    type Key = S::Key;

    async fn create(&self, model: S::Write) -> Result<S::Write> {
        self.insert_model(model).await.during("create")
    }

    async fn find_by_id(&self, id: &S::Key) -> Result<S::Read> {
        self.select_one(id).await.during("find_by_id")
    }

    async fn update(&self, model: S::Write) -> Result<S::Write> {
        self.replace_model(model).await.during("update")
    }

    async fn delete(&self, id: &S::Key) -> Result<()> {
        tracing::debug!(table = S::TABLE, key = %id, "Deleting {}", S::ENTITY);
        self.store
            .delete(S::TABLE, &S::key_predicates(id))
            .await
            .during("delete")
    }

    async fn list(&self, options: &QueryOptions) -> Result<Vec<S::Read>> {
        self.select_page(options).await.during("list")
    }

    async fn search(&self, options: &QueryOptions) -> Result<(Vec<S::Read>, u64)> {
        self.select_page_counted(options).await.during("search")
    }

    async fn count(&self, filters: &[Filter]) -> Result<u64> {
        let query = TableQuery::new().matching(translate_filters(filters));
        self.store.count(S::TABLE, &query).await.during("count")
    }

    async fn find_by_field(&self, field: &str, value: &str) -> Result<Vec<S::Read>> {
        let query = TableQuery::new()
            .with_predicate(Predicate::eq(field, value))
            .ordered_by(Order::desc(S::DEFAULT_SORT));
        self.fetch(query).await.during("find_by_field")
    }
}
