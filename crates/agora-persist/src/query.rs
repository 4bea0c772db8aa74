//! Storage-agnostic description of what a caller wants back from a listing:
//! filters, sort, page window and free-text search.
//!
//! All defaulting of caller input happens here, once, so repositories never
//! see a non-positive page or page size.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PersistError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(PersistError::Validation(format!(
                "unknown sort direction: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    #[serde(alias = "eq")]
    Equal,
    #[serde(alias = "like")]
    Contains,
}

/// A single field-scoped restriction. Filters in a list are ANDed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Filter {
    pub fn equal(field: impl Into<String>, value: impl ToString) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Equal,
            value: value.to_string(),
        }
    }

    /// Case-insensitive substring match.
    pub fn contains(field: impl Into<String>, value: impl ToString) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Contains,
            value: value.to_string(),
        }
    }
}

/// Validated listing options.
///
/// Fields are private so the page window invariants (`page >= 1`,
/// `1 <= page_size <= MAX_PAGE_SIZE`) hold for every value in circulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOptions {
    page: u32,
    page_size: u32,
    sort_by: Option<String>,
    sort_order: SortDirection,
    filters: Vec<Filter>,
    search: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_order: SortDirection::default(),
            filters: Vec::new(),
            search: None,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-positive pages fall back to the first page.
    pub fn page(mut self, page: i64) -> Self {
        self.page = coerce_page(Some(page));
        self
    }

    /// Non-positive sizes fall back to the default, oversized ones are capped.
    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = coerce_page_size(Some(page_size));
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.sort_by = if field.trim().is_empty() {
            None
        } else {
            Some(field)
        };
        self
    }

    pub fn sort_order(mut self, direction: SortDirection) -> Self {
        self.sort_order = direction;
        self
    }

    pub fn ascending(self) -> Self {
        self.sort_order(SortDirection::Asc)
    }

    pub fn descending(self) -> Self {
        self.sort_order(SortDirection::Desc)
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn equal(self, field: impl Into<String>, value: impl ToString) -> Self {
        self.filter(Filter::equal(field, value))
    }

    pub fn contains(self, field: impl Into<String>, value: impl ToString) -> Self {
        self.filter(Filter::contains(field, value))
    }

    /// Blank terms are treated as no search at all.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        let trimmed = term.trim();
        self.search = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn current_page(&self) -> u32 {
        self.page
    }

    pub fn current_page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort_field(&self) -> Option<&str> {
        self.sort_by.as_deref()
    }

    pub fn direction(&self) -> SortDirection {
        self.sort_order
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Index of the first row on the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

fn coerce_page(page: Option<i64>) -> u32 {
    match page {
        Some(page) if page >= 1 => u32::try_from(page).unwrap_or(u32::MAX),
        _ => DEFAULT_PAGE,
    }
}

fn coerce_page_size(page_size: Option<i64>) -> u32 {
    match page_size {
        Some(size) if size >= 1 => u32::try_from(size)
            .unwrap_or(MAX_PAGE_SIZE)
            .min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    }
}

/// Raw listing parameters as a caller sends them (query string or JSON).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub search: Option<String>,
}

impl QueryParams {
    pub fn into_options(self) -> QueryOptions {
        let sort_order = self
            .sort_order
            .as_deref()
            .and_then(|order| order.parse().ok())
            .unwrap_or_default();

        let mut options = QueryOptions {
            page: coerce_page(self.page),
            page_size: coerce_page_size(self.page_size),
            sort_by: None,
            sort_order,
            filters: self.filters,
            search: None,
        };
        if let Some(field) = self.sort_by {
            options = options.sort_by(field);
        }
        if let Some(term) = self.search {
            options = options.search(term);
        }
        options
    }
}

impl From<QueryParams> for QueryOptions {
    fn from(params: QueryParams) -> Self {
        params.into_options()
    }
}
