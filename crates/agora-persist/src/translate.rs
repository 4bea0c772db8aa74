//! Translation of [`QueryOptions`] into storage-engine requests.

use crate::error::{PersistError, Result};
use crate::query::{Filter, FilterOperator, QueryOptions, SortDirection};

/// A single row predicate understood by every [`TableStore`](crate::store::TableStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Exact match on the textual value of a column.
    Eq { field: String, value: String },
    /// Case-insensitive pattern match, `*` matching any run of characters.
    ILike { field: String, pattern: String },
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl ToString) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Substring match: the value is wrapped in wildcards on both sides.
    pub fn contains(field: impl Into<String>, value: &str) -> Self {
        Predicate::ILike {
            field: field.into(),
            pattern: format!("*{}*", value),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Predicate::Eq { field, .. } | Predicate::ILike { field, .. } => field,
        }
    }
}

impl From<&Filter> for Predicate {
    fn from(filter: &Filter) -> Self {
        match filter.operator {
            FilterOperator::Equal => Predicate::eq(&filter.field, &filter.value),
            FilterOperator::Contains => Predicate::contains(&filter.field, &filter.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: SortDirection,
}

impl Order {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Half-open row window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: u64,
    pub end: u64,
}

impl RowRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn for_page(page: u32, page_size: u32) -> Self {
        let size = u64::from(page_size);
        let start = u64::from(page.saturating_sub(1)) * size;
        Self::new(start, start + size)
    }

    pub fn first(count: u64) -> Self {
        Self::new(0, count)
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A relation joined into read-model rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Embed {
    /// Rows of `table` whose `foreign_key` equals this row's `id`, as an array.
    HasMany {
        alias: &'static str,
        table: &'static str,
        foreign_key: &'static str,
    },
    /// The row of `table` whose `id` equals this row's `local_key`, or null.
    BelongsTo {
        alias: &'static str,
        table: &'static str,
        local_key: &'static str,
    },
}

impl Embed {
    pub fn alias(&self) -> &'static str {
        match self {
            Embed::HasMany { alias, .. } | Embed::BelongsTo { alias, .. } => alias,
        }
    }
}

/// Everything a store needs to answer one read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    /// ANDed predicates.
    pub predicates: Vec<Predicate>,
    /// ORed predicates; an empty group places no restriction.
    pub any_of: Vec<Predicate>,
    pub order: Option<Order>,
    pub range: Option<RowRange>,
    pub embeds: Vec<Embed>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn any_of(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.any_of.extend(predicates);
        self
    }

    pub fn ordered_by(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn windowed(mut self, range: RowRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn embedding(mut self, embeds: &[Embed]) -> Self {
        self.embeds.extend_from_slice(embeds);
        self
    }

    /// The same restriction with no order, window or joins.
    pub fn for_count(&self) -> TableQuery {
        TableQuery {
            predicates: self.predicates.clone(),
            any_of: self.any_of.clone(),
            order: None,
            range: None,
            embeds: Vec::new(),
        }
    }
}

pub fn translate_filters(filters: &[Filter]) -> Vec<Predicate> {
    filters.iter().map(Predicate::from).collect()
}

/// Compiles options for a table whose default ordering column is
/// `default_sort` and whose free-text search spans `search_fields`.
///
/// A search term on a table without searchable columns is rejected.
pub fn translate(
    options: &QueryOptions,
    default_sort: &str,
    search_fields: &[&str],
) -> Result<TableQuery> {
    let mut query = TableQuery::new().matching(translate_filters(options.filters()));

    if let Some(term) = options.search_term() {
        if search_fields.is_empty() {
            return Err(PersistError::Validation(format!(
                "search is not supported here (term: {:?})",
                term
            )));
        }
        query = query.any_of(
            search_fields
                .iter()
                .map(|field| Predicate::contains(*field, term)),
        );
    }

    let field = options.sort_field().unwrap_or(default_sort);
    Ok(query
        .ordered_by(Order::new(field, options.direction()))
        .windowed(RowRange::for_page(
            options.current_page(),
            options.current_page_size(),
        )))
}
