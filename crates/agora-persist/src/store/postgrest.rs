use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;

use super::TableStore;
use crate::error::{PersistError, Result};
use crate::translate::{Embed, Predicate, TableQuery};

/// HTTP client for a PostgREST endpoint.
///
/// `base_url` is the REST root, e.g. `https://project.supabase.co/rest/v1`.
/// Requests carry the service `apikey` and, unless a caller token was set
/// with [`with_access_token`](Self::with_access_token), the same key as bearer.
#[derive(Clone)]
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    schema: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

impl PostgrestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| PersistError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Reuse an existing client (and its connection pool).
    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
            schema: None,
        }
    }

    /// Target a non-default Postgres schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// A copy of this store that acts with the caller's JWT, so row-level
    /// security applies. Shares the connection pool.
    pub fn with_access_token(&self, token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder, writing: bool) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        let request = request.header("apikey", &self.api_key).bearer_auth(token);

        match (&self.schema, writing) {
            (Some(schema), true) => request.header("Content-Profile", schema),
            (Some(schema), false) => request.header("Accept-Profile", schema),
            (None, _) => request,
        }
    }

    async fn check(&self, response: Response, table: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            tracing::debug!(table, %status, "Storage request successful");
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());

        tracing::error!(table, %status, body = %body, "Storage request failed");

        let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();
        let (code, message, details) = match parsed {
            Some(err) => {
                let details = match (err.details, err.hint) {
                    (Some(details), Some(hint)) => Some(format!("{} ({})", details, hint)),
                    (details, hint) => details.or(hint),
                };
                (err.code, err.message.unwrap_or_else(|| body.clone()), details)
            }
            None => (None, body, None),
        };

        Err(PersistError::Api {
            status: status.as_u16(),
            code,
            message,
            details,
        })
    }

    async fn rows(response: Response) -> Result<Vec<Value>> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(&body)? {
            Value::Array(rows) => Ok(rows),
            other => Err(PersistError::InvalidResponse(format!(
                "expected a JSON array of rows, got {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl TableStore for PostgrestStore {
    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);

        let response = self.authorize(request, true).send().await?;
        let response = self.check(response, table).await?;

        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PersistError::InvalidResponse(format!("insert into {} returned no row", table)))
    }

    async fn select(&self, table: &str, query: &TableQuery) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&render_query(query));

        let response = self.authorize(request, false).send().await?;
        let response = self.check(response, table).await?;
        Self::rows(response).await
    }

    /// One round trip: PostgREST reports the unwindowed total in `Content-Range`.
    async fn select_counted(&self, table: &str, query: &TableQuery) -> Result<(Vec<Value>, u64)> {
        let request = self
            .client
            .get(self.table_url(table))
            .header("Prefer", "count=exact")
            .query(&render_query(query));

        let response = self.authorize(request, false).send().await?;
        let response = self.check(response, table).await?;
        let total = parse_total(response.headers())?;
        let rows = Self::rows(response).await?;
        Ok((rows, total))
    }

    async fn update(&self, table: &str, predicates: &[Predicate], row: Value) -> Result<Vec<Value>> {
        let request = self
            .client
            .patch(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&render_predicates(predicates))
            .json(&row);

        let response = self.authorize(request, true).send().await?;
        let response = self.check(response, table).await?;
        Self::rows(response).await
    }

    async fn delete(&self, table: &str, predicates: &[Predicate]) -> Result<()> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&render_predicates(predicates));

        let response = self.authorize(request, true).send().await?;
        self.check(response, table).await?;
        Ok(())
    }

    async fn count(&self, table: &str, query: &TableQuery) -> Result<u64> {
        let request = self
            .client
            .head(self.table_url(table))
            .header("Prefer", "count=exact")
            .query(&render_query(&query.for_count()));

        let response = self.authorize(request, false).send().await?;
        let response = self.check(response, table).await?;
        parse_total(response.headers())
    }
}

/// Reads the total from `Content-Range: 0-9/42` (or `*/0`).
pub(crate) fn parse_total(headers: &HeaderMap) -> Result<u64> {
    let header = headers
        .get(CONTENT_RANGE)
        .ok_or_else(|| PersistError::InvalidResponse("missing Content-Range header".to_string()))?
        .to_str()
        .map_err(|e| PersistError::InvalidResponse(format!("unreadable Content-Range: {}", e)))?;

    header
        .rsplit('/')
        .next()
        .and_then(|total| total.trim().parse().ok())
        .ok_or_else(|| PersistError::InvalidResponse(format!("no exact count in Content-Range: {}", header)))
}

pub(crate) fn render_select(embeds: &[Embed]) -> String {
    let mut select = String::from("*");
    for embed in embeds {
        let rendered = match embed {
            Embed::HasMany {
                alias,
                table,
                foreign_key,
            } => format!(",{}:{}!{}(*)", alias, table, foreign_key),
            Embed::BelongsTo {
                alias,
                table,
                local_key,
            } => format!(",{}:{}!{}(*)", alias, table, local_key),
        };
        select.push_str(&rendered);
    }
    select
}

fn render_condition(predicate: &Predicate) -> String {
    match predicate {
        Predicate::Eq { value, .. } => format!("eq.{}", value),
        Predicate::ILike { pattern, .. } => format!("ilike.{}", pattern),
    }
}

pub(crate) fn render_predicates(predicates: &[Predicate]) -> Vec<(String, String)> {
    predicates
        .iter()
        .map(|p| (p.field().to_string(), render_condition(p)))
        .collect()
}

/// Values inside an `or=(...)` group are quoted when they contain
/// characters PostgREST reserves for its own syntax.
fn quote_in_group(value: &str) -> String {
    const RESERVED: &[char] = &[',', '(', ')', '.', ':', '"', '\\'];
    if value.contains(RESERVED) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

fn render_group(predicates: &[Predicate]) -> String {
    let parts: Vec<String> = predicates
        .iter()
        .map(|p| match p {
            Predicate::Eq { field, value } => format!("{}.eq.{}", field, quote_in_group(value)),
            Predicate::ILike { field, pattern } => {
                format!("{}.ilike.{}", field, quote_in_group(pattern))
            }
        })
        .collect();
    format!("({})", parts.join(","))
}

pub(crate) fn render_query(query: &TableQuery) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), render_select(&query.embeds))];
    pairs.extend(render_predicates(&query.predicates));

    if !query.any_of.is_empty() {
        pairs.push(("or".to_string(), render_group(&query.any_of)));
    }
    if let Some(order) = &query.order {
        pairs.push(("order".to_string(), format!("{}.{}", order.field, order.direction)));
    }
    if let Some(range) = query.range {
        pairs.push(("offset".to_string(), range.start.to_string()));
        pairs.push(("limit".to_string(), range.len().to_string()));
    }
    pairs
}
