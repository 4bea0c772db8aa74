pub mod memory;
pub mod postgrest;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::translate::{Predicate, TableQuery};

pub use memory::{MemoryStore, RecordedQuery, StoreOperation};
pub use postgrest::PostgrestStore;

/// Remote relational-table service addressed by table name.
///
/// Every call is one round trip; implementations neither retry nor time out.
/// Dropping a returned future abandons the request.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: Value) -> Result<Value>;

    /// Fetch rows matching the query, honoring order, window and embeds.
    async fn select(&self, table: &str, query: &TableQuery) -> Result<Vec<Value>>;

    /// Fetch rows and the number of rows matching the query before windowing.
    async fn select_counted(&self, table: &str, query: &TableQuery) -> Result<(Vec<Value>, u64)> {
        let rows = self.select(table, query).await?;
        let total = self.count(table, &query.for_count()).await?;
        Ok((rows, total))
    }

    /// Overwrite the given columns of every matching row, returning the rows as stored.
    async fn update(&self, table: &str, predicates: &[Predicate], row: Value) -> Result<Vec<Value>>;

    async fn delete(&self, table: &str, predicates: &[Predicate]) -> Result<()>;

    async fn count(&self, table: &str, query: &TableQuery) -> Result<u64>;
}
