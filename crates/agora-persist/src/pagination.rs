use serde::{Deserialize, Serialize};

/// Page metadata derived from a total match count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub has_next: bool,
}

impl Pagination {
    /// A zero page size yields no pages rather than a division by zero.
    pub fn compute(total: u64, page: u32, page_size: u32) -> Self {
        let size = u64::from(page_size);
        let total_pages = if size == 0 { 0 } else { total.div_ceil(size) };
        let offset = u64::from(page.saturating_sub(1)) * size;
        let has_next = size != 0 && offset + size < total;

        Self {
            total,
            page,
            page_size,
            total_pages,
            has_next,
        }
    }
}

/// A page of rows together with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

pub fn assemble<T>(rows: Vec<T>, total: u64, page: u32, page_size: u32) -> Paginated<T> {
    Paginated {
        items: rows,
        pagination: Pagination::compute(total, page, page_size),
    }
}
